use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::boundary::unique_names;
use crate::dataset::{Cell, CellValue, TypedDataset, TypedRow};
use crate::error::ExtractError;

const NUMBER: &str = r"[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|[+-]?\.\d+";
const UNIT: &str = r"[^\s\d+\-.,:][^\s]*";

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<value>{NUMBER})\s*(?P<unit>{UNIT})?$"))
        .expect("number pattern is valid")
});

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<low>{NUMBER})\s*(?P<low_unit>{UNIT})?\s*(?:-|–|—|:|\bto\b)\s*(?P<high>{NUMBER})\s*(?P<unit>{UNIT})?$"
    ))
    .expect("range pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', "").parse::<f64>().ok()
}

fn capture_number(captures: &Captures<'_>, name: &str) -> Option<f64> {
    captures.name(name).and_then(|found| parse_number(found.as_str()))
}

fn capture_unit(captures: &Captures<'_>, name: &str) -> Option<String> {
    captures.name(name).map(|found| found.as_str().to_string())
}

fn infer_range(text: &str) -> Option<CellValue> {
    let captures = RANGE_RE.captures(text)?;
    let low = capture_number(&captures, "low")?;
    let high = capture_number(&captures, "high")?;
    let low_unit = capture_unit(&captures, "low_unit");
    let unit = capture_unit(&captures, "unit");

    if low_unit.is_some() && low_unit != unit {
        return None;
    }

    Some(CellValue::Range { low, high, unit })
}

fn infer_number(text: &str) -> Option<CellValue> {
    let captures = NUMBER_RE.captures(text)?;
    Some(CellValue::Number {
        value: capture_number(&captures, "value")?,
        unit: capture_unit(&captures, "unit"),
    })
}

/// Classifies cell text as a range, a number, empty, or free text.
///
/// Ranges accept `-`, `:` (a common OCR misread of the dash) and `to` between
/// the bounds; a unit may follow the high bound, or both bounds when they
/// match. Anything that does not parse cleanly stays text.
#[must_use]
pub fn infer_value(text: &str) -> CellValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    infer_range(trimmed)
        .or_else(|| infer_number(trimmed))
        .unwrap_or_else(|| CellValue::Text(trimmed.to_string()))
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("```") && !trimmed.contains('|')
}

fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed
            .chars()
            .all(|ch| matches!(ch, '-' | ':' | '|' | ' '))
}

fn split_cells(line: &str, outer_pipes: bool) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.peek() {
                Some(&next @ ('\\' | '|')) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(ch),
            },
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);

    let mut cells = cells
        .into_iter()
        .map(|cell| cell.trim().to_string())
        .collect::<Vec<_>>();

    if outer_pipes {
        if cells.first().is_some_and(String::is_empty) {
            cells.remove(0);
        }
        if cells.len() > 1 && cells.last().is_some_and(String::is_empty) {
            cells.pop();
        }
    }

    cells
}

/// Parses pipe-delimited table text back into column names and cell texts.
///
/// Accepts the renderer's own output as well as GitHub-style tables with
/// outer pipes, code fences and a missing separator line.
pub fn parse_normalized_table(text: &str) -> Result<ParsedTable, ExtractError> {
    let lines = text
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_fence(line))
        .collect::<Vec<_>>();

    let Some((header, rest)) = lines.split_first() else {
        return Ok(ParsedTable::default());
    };

    let outer_pipes = header.trim_start().starts_with('|');
    let columns = unique_names(
        split_cells(header, outer_pipes)
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                if name.is_empty() {
                    format!("col_{}", index + 1)
                } else {
                    name
                }
            }),
    );

    let body = match rest.split_first() {
        Some((first, tail)) if is_separator_line(first) => tail,
        _ => rest,
    };

    let mut rows = Vec::with_capacity(body.len());
    for (row, line) in body.iter().enumerate() {
        let cells = split_cells(line, outer_pipes);
        if cells.len() != columns.len() {
            return Err(ExtractError::Schema {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
        rows.push(cells);
    }

    Ok(ParsedTable { columns, rows })
}

/// Builds a typed dataset from pipe-delimited table text.
pub fn build_dataset(text: &str) -> Result<TypedDataset, ExtractError> {
    let parsed = parse_normalized_table(text)?;
    let rows = parsed
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, cells)| {
            let cells = cells
                .into_iter()
                .map(|text| {
                    let value = infer_value(&text);
                    Cell::new(text, value)
                })
                .collect();
            TypedRow::new(index, cells)
        })
        .collect();

    Ok(TypedDataset::from_parts(parsed.columns, rows))
}

#[cfg(test)]
mod tests {
    use super::{build_dataset, infer_value, parse_normalized_table};
    use crate::dataset::{CellValue, ValueKind};
    use crate::error::ExtractError;

    fn range(low: f64, high: f64, unit: Option<&str>) -> CellValue {
        CellValue::Range {
            low,
            high,
            unit: unit.map(str::to_string),
        }
    }

    #[test]
    fn infers_dash_range_with_unit() {
        assert_eq!(
            infer_value("13.8-17.2 g/dL"),
            range(13.8, 17.2, Some("g/dL"))
        );
    }

    #[test]
    fn treats_colon_as_misread_dash() {
        assert_eq!(infer_value("10:40 U/L"), range(10.0, 40.0, Some("U/L")));
    }

    #[test]
    fn accepts_word_separator_and_repeated_matching_units() {
        assert_eq!(infer_value("4.5 to 11"), range(4.5, 11.0, None));
        assert_eq!(
            infer_value("13.8 g/dL - 17.2 g/dL"),
            range(13.8, 17.2, Some("g/dL"))
        );
    }

    #[test]
    fn mismatched_range_units_fall_back_to_text() {
        assert_eq!(
            infer_value("13.8 g/dL-17.2 mg/dL"),
            CellValue::Text("13.8 g/dL-17.2 mg/dL".to_string())
        );
    }

    #[test]
    fn infers_numbers_with_optional_unit() {
        assert_eq!(
            infer_value("14.2 g/dl"),
            CellValue::Number {
                value: 14.2,
                unit: Some("g/dl".to_string()),
            }
        );
        assert_eq!(
            infer_value("-0.5"),
            CellValue::Number {
                value: -0.5,
                unit: None,
            }
        );
        assert_eq!(
            infer_value("1,250 /uL"),
            CellValue::Number {
                value: 1250.0,
                unit: Some("/uL".to_string()),
            }
        );
    }

    #[test]
    fn classifies_text_and_empty_cells() {
        assert_eq!(infer_value("   "), CellValue::Empty);
        assert_eq!(infer_value("< 200 mg/dL").kind(), ValueKind::Text);
        assert_eq!(infer_value("Normal").kind(), ValueKind::Text);
        assert_eq!(infer_value("12 mg per day").kind(), ValueKind::Text);
    }

    #[test]
    fn parses_renderer_output() {
        let parsed = parse_normalized_table("A | B\n--- | ---\n1 |  \nx\\|y | \n")
            .expect("table should parse");
        assert_eq!(parsed.columns, vec!["A", "B"]);
        assert_eq!(parsed.rows, vec![vec!["1", ""], vec!["x|y", ""]]);
    }

    #[test]
    fn parses_fenced_markdown_with_outer_pipes() {
        let text = "```\n| Test | Result |\n|:-----|-------:|\n| Na | 140 |\n|  | 4.1 |\n```\n";
        let parsed = parse_normalized_table(text).expect("table should parse");
        assert_eq!(parsed.columns, vec!["Test", "Result"]);
        assert_eq!(parsed.rows, vec![vec!["Na", "140"], vec!["", "4.1"]]);
    }

    #[test]
    fn missing_separator_line_keeps_second_line_as_data() {
        let parsed = parse_normalized_table("A | B\n1 | 2\n").expect("table should parse");
        assert_eq!(parsed.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn rejects_rows_with_wrong_cell_count() {
        let err = parse_normalized_table("A | B\n--- | ---\n1 | 2 | 3\n")
            .expect_err("ragged row should fail");
        assert!(matches!(
            err,
            ExtractError::Schema {
                row: 0,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn builds_typed_rows_in_order() {
        let dataset = build_dataset("Parameter | Value\n--- | ---\nHb | 14.2 g/dl\nNote | \n")
            .expect("dataset should build");
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(
            dataset.cell(0, "Value").map(|cell| cell.value().numeric()),
            Some(Some(14.2))
        );
        assert_eq!(
            dataset.cell(1, "Value").map(|cell| cell.kind()),
            Some(ValueKind::Empty)
        );
        assert_eq!(dataset.row(1).map(|row| row.source_index()), Some(1));
    }

    #[test]
    fn empty_text_builds_empty_dataset() {
        let dataset = build_dataset("").expect("empty text is not an error");
        assert_eq!(dataset.column_count(), 0);
        assert_eq!(dataset.row_count(), 0);
    }
}
