const TAB_STOP: usize = 8;

fn is_space_artifact(ch: char) -> bool {
    matches!(ch, '\u{00A0}' | '\u{2007}' | '\u{202F}')
}

fn is_invisible(ch: char) -> bool {
    matches!(ch, '\r' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
}

fn clean_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut width = 0_usize;

    for ch in line.chars() {
        if is_invisible(ch) {
            continue;
        }

        if ch == '\t' {
            let pad = TAB_STOP - width % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            width += pad;
            continue;
        }

        out.push(if is_space_artifact(ch) { ' ' } else { ch });
        width += 1;
    }

    out.truncate(out.trim_end().len());
    out
}

/// Splits raw OCR text into right-trimmed, non-blank lines.
#[must_use]
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect()
}
