use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::model::{Annotation, MarkerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Range,
    Text,
    Empty,
}

impl ValueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Range => "range",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number {
        value: f64,
        unit: Option<String>,
    },
    Range {
        low: f64,
        high: f64,
        unit: Option<String>,
    },
    Text(String),
    Empty,
}

impl CellValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number { .. } => ValueKind::Number,
            Self::Range { .. } => ValueKind::Range,
            Self::Text(_) => ValueKind::Text,
            Self::Empty => ValueKind::Empty,
        }
    }

    /// The number itself, or the midpoint of a range.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number { value, .. } => Some(*value),
            Self::Range { low, high, .. } => Some(f64::midpoint(*low, *high)),
            Self::Text(_) | Self::Empty => None,
        }
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Number { unit, .. } | Self::Range { unit, .. } => unit.as_deref(),
            Self::Text(_) | Self::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    text: String,
    value: CellValue,
}

impl Cell {
    pub(crate) fn new(text: String, value: CellValue) -> Self {
        Self { text, value }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFlag {
    pub column: usize,
    pub marker: MarkerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    source_index: usize,
    cells: Vec<Cell>,
    flags: Vec<CellFlag>,
}

impl TypedRow {
    pub(crate) fn new(source_index: usize, cells: Vec<Cell>) -> Self {
        Self {
            source_index,
            cells,
            flags: Vec::new(),
        }
    }

    /// Position of this row in the extracted table, kept across filter/sort.
    #[must_use]
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn get(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    #[must_use]
    pub fn flags(&self) -> &[CellFlag] {
        &self.flags
    }
}

/// Immutable typed table. Views returned by filter/sort share row storage
/// with the dataset they came from but never alter it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDataset {
    columns: Arc<[String]>,
    rows: Vec<Arc<TypedRow>>,
}

impl TypedDataset {
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<TypedRow>) -> Self {
        Self {
            columns: columns.into(),
            rows: rows.into_iter().map(Arc::new).collect(),
        }
    }

    pub(crate) fn view(&self, rows: Vec<Arc<TypedRow>>) -> Self {
        Self {
            columns: Arc::clone(&self.columns),
            rows,
        }
    }

    pub(crate) fn shared_rows(&self) -> &[Arc<TypedRow>] {
        &self.rows
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &TypedRow> {
        self.rows.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&TypedRow> {
        self.rows.get(index).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let column = self.column_index(column)?;
        self.row(row).and_then(|row| row.get(column))
    }

    /// Attaches marker flags to the rows they were extracted from. Annotations
    /// naming an unknown row or column are ignored.
    #[must_use]
    pub fn with_annotations(mut self, annotations: &[Annotation]) -> Self {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect::<HashMap<_, _>>();
        let positions = self
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| (row.source_index, position))
            .collect::<HashMap<_, _>>();

        for annotation in annotations {
            let (Some(&column), Some(&position)) = (
                columns.get(annotation.column.as_str()),
                positions.get(&annotation.row_index),
            ) else {
                continue;
            };
            Arc::make_mut(&mut self.rows[position]).flags.push(CellFlag {
                column,
                marker: annotation.marker,
            });
        }
        self
    }

    #[must_use]
    pub fn annotations(&self) -> Vec<Annotation> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.flags.iter().map(|flag| Annotation {
                    row_index: row.source_index,
                    column: self.columns[flag.column].clone(),
                    marker: flag.marker,
                })
            })
            .collect()
    }
}

fn write_padded_row<'a>(
    f: &mut Formatter<'_>,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> std::fmt::Result {
    let padded = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>();
    writeln!(f, "| {} |", padded.join(" | "))
}

impl Display for TypedDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.columns.is_empty() {
            return Ok(());
        }

        let mut widths = self
            .columns
            .iter()
            .map(|column| column.chars().count())
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.text.chars().count());
            }
        }

        write_padded_row(f, self.columns.iter().map(String::as_str), &widths)?;
        let rule = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>();
        writeln!(f, "| {} |", rule.join(" | "))?;
        for row in &self.rows {
            write_padded_row(f, row.cells.iter().map(Cell::text), &widths)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, CellValue, TypedDataset, TypedRow, ValueKind};
    use crate::model::{Annotation, MarkerKind};

    fn text_cell(text: &str) -> Cell {
        Cell::new(text.to_string(), CellValue::Text(text.to_string()))
    }

    fn sample() -> TypedDataset {
        TypedDataset::from_parts(
            vec!["Parameter".to_string(), "Value".to_string()],
            vec![
                TypedRow::new(
                    0,
                    vec![
                        text_cell("Hemoglobin"),
                        Cell::new(
                            "14.2".to_string(),
                            CellValue::Number {
                                value: 14.2,
                                unit: None,
                            },
                        ),
                    ],
                ),
                TypedRow::new(
                    1,
                    vec![text_cell("WBC"), Cell::new(String::new(), CellValue::Empty)],
                ),
            ],
        )
    }

    #[test]
    fn range_midpoint_is_its_numeric_value() {
        let value = CellValue::Range {
            low: 10.0,
            high: 40.0,
            unit: Some("U/L".to_string()),
        };
        assert_eq!(value.numeric(), Some(25.0));
        assert_eq!(value.unit(), Some("U/L"));
        assert_eq!(value.kind(), ValueKind::Range);
    }

    #[test]
    fn looks_up_cells_by_row_and_column_name() {
        let dataset = sample();
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.column_count(), 2);
        assert_eq!(
            dataset.cell(0, "Value").map(Cell::kind),
            Some(ValueKind::Number)
        );
        assert_eq!(dataset.cell(1, "Value").map(Cell::kind), Some(ValueKind::Empty));
        assert!(dataset.cell(0, "Unit").is_none());
        assert!(dataset.cell(5, "Value").is_none());
    }

    #[test]
    fn attaching_annotations_does_not_touch_earlier_clones() {
        let original = sample();
        let flagged = original.clone().with_annotations(&[Annotation {
            row_index: 1,
            column: "Value".to_string(),
            marker: MarkerKind::Checked,
        }]);

        assert!(original.annotations().is_empty());
        let annotations = flagged.annotations();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].row_index, 1);
        assert_eq!(annotations[0].column, "Value");
    }

    #[test]
    fn annotations_follow_source_rows_in_a_reordered_view() {
        let dataset = sample();
        let reversed = dataset.view(dataset.shared_rows().iter().rev().cloned().collect());
        let flagged = reversed.with_annotations(&[
            Annotation {
                row_index: 0,
                column: "Parameter".to_string(),
                marker: MarkerKind::Unchecked,
            },
            Annotation {
                row_index: 7,
                column: "Value".to_string(),
                marker: MarkerKind::Checked,
            },
        ]);

        let first = flagged.row(0).expect("row present");
        let second = flagged.row(1).expect("row present");
        assert_eq!(first.source_index(), 1);
        assert!(first.flags().is_empty());
        assert_eq!(second.source_index(), 0);
        assert_eq!(second.flags().len(), 1);
        assert_eq!(second.flags()[0].column, 0);
        assert_eq!(second.flags()[0].marker, MarkerKind::Unchecked);
        assert!(dataset.annotations().is_empty());
    }

    #[test]
    fn displays_as_padded_text_table() {
        let rendered = sample().to_string();
        assert_eq!(
            rendered,
            "| Parameter  | Value |\n\
             | ---------- | ----- |\n\
             | Hemoglobin | 14.2  |\n\
             | WBC        |       |\n"
        );
    }
}
