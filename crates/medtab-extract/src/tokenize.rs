use crate::annotate::split_at_markers;
use crate::boundary::{Segment, split_segments};
use crate::model::{Column, ColumnSpec, RawRow};
use crate::options::TokenizeMode;
use crate::warning::{ExtractWarning, WarningCode};

/// Segments past this count on one data line are folded into the last one kept.
const MAX_SEGMENTS_PER_LINE: usize = 512;

fn slice_chars(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect::<String>().trim().to_string()
}

fn tokenize_fixed(spec: &ColumnSpec, chars: &[char]) -> (Vec<String>, bool) {
    let cells = spec
        .columns()
        .iter()
        .map(|column| slice_chars(chars, column.start, column.end.unwrap_or(chars.len())))
        .collect::<Vec<_>>();

    let last_start = spec.columns().last().map_or(0, |column| column.start);
    (cells, chars.len() <= last_start)
}

fn placement_cost(segment: &Segment, column: &Column) -> usize {
    let label_end = column.start + column.name.chars().count();
    let left = segment.start.abs_diff(column.start);
    let right = segment.end.abs_diff(label_end);
    left.min(right)
}

/// Order-preserving placement of segments under columns, minimising how far
/// each segment's left or right edge sits from its column label. Several
/// segments may share a column; columns may stay empty.
fn place_segments(segments: &[Segment], columns: &[Column]) -> Vec<usize> {
    let width = columns.len();
    let mut previous = columns
        .iter()
        .map(|column| placement_cost(&segments[0], column))
        .collect::<Vec<_>>();
    let mut current = vec![usize::MAX; width];
    let mut from = vec![0_usize; segments.len() * width];

    for (segment_index, segment) in segments.iter().enumerate().skip(1) {
        let mut best_previous = (usize::MAX, 0_usize);
        for (column_index, column) in columns.iter().enumerate() {
            if previous[column_index] < best_previous.0 {
                best_previous = (previous[column_index], column_index);
            }
            current[column_index] = best_previous
                .0
                .saturating_add(placement_cost(segment, column));
            from[segment_index * width + column_index] = best_previous.1;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let mut column_index = (0..width)
        .min_by_key(|&index| (previous[index], index))
        .unwrap_or(0);

    let mut placement = vec![0_usize; segments.len()];
    for segment_index in (0..segments.len()).rev() {
        placement[segment_index] = column_index;
        column_index = from[segment_index * width + column_index];
    }
    placement
}

fn data_segments(chars: &[char], line: &str, width: usize) -> Vec<Segment> {
    let mut segments = split_segments(line)
        .into_iter()
        .flat_map(split_at_markers)
        .collect::<Vec<_>>();

    let limit = MAX_SEGMENTS_PER_LINE.max(width);
    if segments.len() > limit {
        let tail = segments.split_off(limit - 1);
        if let (Some(first), Some(last)) = (tail.first(), tail.last()) {
            tracing::debug!(folded = tail.len(), "folded trailing segments of a long line");
            segments.push(Segment {
                start: first.start,
                end: last.end,
                text: chars[first.start..last.end].iter().collect(),
            });
        }
    }
    segments
}

/// Segments line up with the header when each one shares at least one offset
/// with the column at the same position.
fn aligned_in_order(segments: &[Segment], columns: &[Column]) -> bool {
    segments.len() == columns.len()
        && segments
            .iter()
            .zip(columns)
            .all(|(segment, column)| column.overlaps(segment.start, segment.end))
}

fn tokenize_aligned(spec: &ColumnSpec, chars: &[char], line: &str) -> (Vec<String>, bool) {
    let width = spec.len();
    let segments = data_segments(chars, line, width);

    if aligned_in_order(&segments, spec.columns()) {
        let cells = segments.into_iter().map(|segment| segment.text).collect();
        return (cells, false);
    }

    let mut cells = vec![String::new(); width];
    if segments.is_empty() {
        return (cells, true);
    }

    let placement = place_segments(&segments, spec.columns());
    let mut span_per_column: Vec<Option<(usize, usize)>> = vec![None; width];
    for (segment, &column_index) in segments.iter().zip(&placement) {
        let span = span_per_column[column_index].get_or_insert((segment.start, segment.end));
        span.1 = segment.end;
    }

    let filled = span_per_column.iter().filter(|span| span.is_some()).count();
    for (cell, span) in cells.iter_mut().zip(span_per_column) {
        if let Some((start, end)) = span {
            *cell = slice_chars(chars, start, end);
        }
    }

    (cells, filled < width)
}

fn tokenize_with_flag(
    spec: &ColumnSpec,
    line: &str,
    line_number: usize,
    mode: TokenizeMode,
) -> (RawRow, bool) {
    let chars = line.chars().collect::<Vec<_>>();
    let first_start = spec.columns().first().map_or(0, |column| column.start);

    if chars.len() <= first_start || line.trim().is_empty() {
        return (RawRow::new(line_number, vec![String::new(); spec.len()]), true);
    }

    let (cells, padded) = match mode {
        TokenizeMode::Fixed => tokenize_fixed(spec, &chars),
        TokenizeMode::Aligned => tokenize_aligned(spec, &chars, line),
    };
    (RawRow::new(line_number, cells), padded)
}

/// Cuts one data line into exactly `spec.len()` trimmed cells. Never fails:
/// short or blank lines come back padded with empty cells.
#[must_use]
pub fn tokenize_line(
    spec: &ColumnSpec,
    line: &str,
    line_number: usize,
    mode: TokenizeMode,
) -> RawRow {
    tokenize_with_flag(spec, line, line_number, mode).0
}

pub(crate) fn tokenize_lines(
    spec: &ColumnSpec,
    lines: &[String],
    first_line_number: usize,
    mode: TokenizeMode,
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<RawRow> {
    lines
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let (row, padded) = tokenize_with_flag(spec, line, first_line_number + offset, mode);
            if padded {
                tracing::debug!(line = row.line_number, "padded short data line");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::RowPadded,
                        "data line has fewer cells than the header; missing cells left empty",
                    )
                    .with_row(offset),
                );
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize_line;
    use crate::boundary::detect_columns;
    use crate::options::{ExtractOptions, TokenizeMode};

    const HEADER: &str = "Category  Parameter  Value  Reference Range  Remarks";

    fn spec() -> crate::model::ColumnSpec {
        detect_columns(HEADER, &ExtractOptions::default()).expect("header should parse")
    }

    #[test]
    fn assigns_segments_in_order_when_counts_match() {
        let row = tokenize_line(
            &spec(),
            "Blood Test  Hemoglobin  14.2 g/dl  13.8-17.2 g/dL  Normal",
            1,
            TokenizeMode::Aligned,
        );
        assert_eq!(
            row.cells(),
            ["Blood Test", "Hemoglobin", "14.2 g/dl", "13.8-17.2 g/dL", "Normal"]
        );
        assert_eq!(row.line_number, 1);
    }

    #[test]
    fn places_segments_under_aligned_columns_when_cells_are_missing() {
        let header = "Test          Result    Unit    Flag";
        let line = "Glucose       105                 H";
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");
        let row = tokenize_line(&spec, line, 1, TokenizeMode::Aligned);
        assert_eq!(row.cells(), ["Glucose", "105", "", "H"]);
    }

    #[test]
    fn merges_extra_segments_into_one_column_verbatim() {
        let header = "Test          Result    Comment";
        let line = "Glucose       105       fasting   repeat  advised";
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");
        let row = tokenize_line(&spec, line, 1, TokenizeMode::Aligned);
        assert_eq!(row.cells(), ["Glucose", "105", "fasting   repeat  advised"]);
    }

    #[test]
    fn blank_leading_cell_keeps_later_cells_under_their_columns() {
        let header = "Test          Result    Comment";
        let line = "              105       fasting   repeat";
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");

        let aligned = tokenize_line(&spec, line, 1, TokenizeMode::Aligned);
        let fixed = tokenize_line(&spec, line, 1, TokenizeMode::Fixed);
        assert_eq!(aligned.cells(), ["", "105", "fasting   repeat"]);
        assert_eq!(aligned.cells(), fixed.cells());
    }

    #[test]
    fn marker_after_a_single_space_starts_its_own_cell() {
        let row = tokenize_line(
            &spec(),
            "Recommended Action [ ] Lifestyle Changes Advised",
            2,
            TokenizeMode::Aligned,
        );
        assert_eq!(
            row.cells(),
            ["Recommended Action", "", "[ ] Lifestyle Changes Advised", "", ""]
        );
    }

    #[test]
    fn long_lines_fold_trailing_segments_into_the_last_cell() {
        let header = "Test          Result    Comment";
        let line = vec!["a"; 2_000].join("  ");
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");
        let row = tokenize_line(&spec, &line, 1, TokenizeMode::Aligned);

        assert_eq!(row.cells().len(), 3);
        assert_eq!(row.cells()[0], "a  a  a");
        assert_eq!(row.cells()[1], "a  a  a  a  a");
        assert_eq!(row.cells()[2], &line[24..]);
    }

    #[test]
    fn fixed_mode_slices_at_header_offsets() {
        let header = "Name      Age   City";
        let line = "Ann Lee   34    Rome";
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");
        let row = tokenize_line(&spec, line, 3, TokenizeMode::Fixed);
        assert_eq!(row.cells(), ["Ann Lee", "34", "Rome"]);
    }

    #[test]
    fn fixed_mode_pads_short_lines() {
        let header = "Name      Age   City";
        let spec = detect_columns(header, &ExtractOptions::default()).expect("header");
        let row = tokenize_line(&spec, "Ann", 1, TokenizeMode::Fixed);
        assert_eq!(row.cells(), ["Ann", "", ""]);
    }

    #[test]
    fn blank_line_yields_all_empty_row() {
        let row = tokenize_line(&spec(), "   ", 4, TokenizeMode::Aligned);
        assert_eq!(row.cells().len(), 5);
        assert!(row.is_blank());
    }
}
