use std::sync::LazyLock;

use regex::Regex;

use crate::boundary::Segment;
use crate::model::{Annotation, ColumnSpec, MarkerKind, RawRow};
use crate::warning::{ExtractWarning, WarningCode};

const MARKER_GLYPHS: &[(&str, MarkerKind)] = &[
    ("[ ]", MarkerKind::Unchecked),
    ("[]", MarkerKind::Unchecked),
    ("☐", MarkerKind::Unchecked),
    ("[x]", MarkerKind::Checked),
    ("[X]", MarkerKind::Checked),
    ("[✓]", MarkerKind::Checked),
    ("[✔]", MarkerKind::Checked),
    ("☑", MarkerKind::Checked),
    ("☒", MarkerKind::Checked),
];

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = MARKER_GLYPHS
        .iter()
        .map(|(glyph, _)| regex::escape(glyph))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).expect("marker glyphs form a valid pattern")
});

fn marker_kind(glyph: &str) -> Option<MarkerKind> {
    MARKER_GLYPHS
        .iter()
        .find(|(candidate, _)| *candidate == glyph)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StrippedCell {
    pub text: String,
    pub marker: Option<MarkerKind>,
    /// Marker-like glyphs left in `text` after the annotation was taken.
    pub literal_markers: usize,
}

/// Removes a marker that opens or closes the cell. The leftmost such marker
/// wins; any other marker glyphs stay in the text untouched.
pub(crate) fn strip_marker(cell: &str) -> StrippedCell {
    let matches = MARKER_RE.find_iter(cell).collect::<Vec<_>>();
    let chosen = matches
        .iter()
        .find(|found| found.start() == 0 || found.end() == cell.len());

    let Some(found) = chosen else {
        return StrippedCell {
            text: cell.to_string(),
            marker: None,
            literal_markers: 0,
        };
    };

    let text = if found.start() == 0 {
        cell[found.end()..].trim_start()
    } else {
        cell[..found.start()].trim_end()
    };

    StrippedCell {
        text: text.to_string(),
        marker: marker_kind(found.as_str()),
        literal_markers: matches.len() - 1,
    }
}

/// Cuts a data-line segment in front of every marker that follows whitespace
/// and is followed by more text, so `Action [ ] Advised` becomes `Action` and
/// `[ ] Advised`. Markers at either edge of the segment are left in place.
pub(crate) fn split_at_markers(segment: Segment) -> Vec<Segment> {
    let text = segment.text.as_str();
    let cuts = MARKER_RE
        .find_iter(text)
        .filter(|found| {
            found.end() < text.len() && text[..found.start()].ends_with(char::is_whitespace)
        })
        .map(|found| found.start())
        .collect::<Vec<_>>();

    if cuts.is_empty() {
        return vec![segment];
    }

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0_usize;
    for to in cuts.into_iter().chain(std::iter::once(text.len())) {
        let piece = text[from..to].trim_end();
        let start = segment.start + text[..from].chars().count();
        pieces.push(Segment {
            start,
            end: start + piece.chars().count(),
            text: piece.to_string(),
        });
        from = to;
    }
    pieces
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRows {
    pub rows: Vec<RawRow>,
    pub annotations: Vec<Annotation>,
}

pub(crate) fn extract_annotations_with_warnings(
    spec: &ColumnSpec,
    rows: &[RawRow],
    warnings: &mut Vec<ExtractWarning>,
) -> AnnotatedRows {
    let mut annotations = Vec::new();
    let mut stripped_rows = Vec::with_capacity(rows.len());

    for (row_index, row) in rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(row.cells().len());
        for (column, cell) in spec.columns().iter().zip(row.cells()) {
            let stripped = strip_marker(cell);
            if let Some(marker) = stripped.marker {
                annotations.push(Annotation {
                    row_index,
                    column: column.name.clone(),
                    marker,
                });
            }
            if stripped.literal_markers > 0 {
                tracing::warn!(row = row_index, column = %column.name, "cell holds more than one marker");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::MultipleMarkers,
                        "cell holds more than one marker; only the first was taken as a flag",
                    )
                    .with_row(row_index)
                    .with_column(column.name.clone()),
                );
            }
            cells.push(stripped.text);
        }
        stripped_rows.push(RawRow::new(row.line_number, cells));
    }

    AnnotatedRows {
        rows: stripped_rows,
        annotations,
    }
}

/// Detects and strips inline checkbox markers, returning new rows and one
/// annotation per flagged cell.
#[must_use]
pub fn extract_annotations(spec: &ColumnSpec, rows: &[RawRow]) -> AnnotatedRows {
    let mut warnings = Vec::new();
    extract_annotations_with_warnings(spec, rows, &mut warnings)
}
