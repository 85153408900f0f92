use crate::dataset::{Cell, TypedDataset};
use crate::model::{ColumnSpec, NormalizedTable, RawRow};

pub(crate) const CELL_SEPARATOR: &str = " | ";
const SEPARATOR_CELL: &str = "---";

pub(crate) fn escape_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || ch == '|' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(escape_cell)
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
}

fn render_lines<'a, R, C>(
    names: impl Iterator<Item = &'a str>,
    width: usize,
    rows: R,
) -> NormalizedTable
where
    R: Iterator<Item = C>,
    C: Iterator<Item = &'a str>,
{
    let mut out = String::new();

    out.push_str(&render_line(names));
    out.push('\n');
    out.push_str(&vec![SEPARATOR_CELL; width].join(CELL_SEPARATOR));
    out.push('\n');

    for cells in rows {
        out.push_str(&render_line(cells));
        out.push('\n');
    }

    NormalizedTable::new(out)
}

/// Serializes rows as `a | b | c` lines under a header and a `--- | ---`
/// separator. Rows and columns keep their order; the output only depends on
/// the column names and the cell texts.
#[must_use]
pub fn render_table(spec: &ColumnSpec, rows: &[RawRow]) -> NormalizedTable {
    render_lines(
        spec.names(),
        spec.len(),
        rows.iter().map(|row| row.cells().iter().map(String::as_str)),
    )
}

/// Same text format for a dataset or a filtered/sorted view of one.
#[must_use]
pub fn render_dataset(dataset: &TypedDataset) -> NormalizedTable {
    if dataset.column_count() == 0 {
        return NormalizedTable::new(String::new());
    }

    render_lines(
        dataset.column_names().iter().map(String::as_str),
        dataset.column_count(),
        dataset.rows().map(|row| row.cells().iter().map(Cell::text)),
    )
}
