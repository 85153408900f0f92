use std::fmt::{Display, Formatter};

/// One header column. Offsets count characters, not bytes; `end` is `None`
/// for the last column, which runs to the end of every line.
///
/// The separator gap after a name belongs to the column on its left, so `end`
/// is the next column's `start` rather than the start of the gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub start: usize,
    pub end: Option<usize>,
}

impl Column {
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && self.end.is_none_or(|end| offset < end)
    }

    /// Whether the half-open character span `start..end` shares any offset
    /// with this column.
    #[must_use]
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < end
            && end > self.start
            && self.end.is_none_or(|column_end| start < column_end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<Column>,
}

impl ColumnSpec {
    pub(crate) fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

/// Trimmed cell text for one source line, one entry per header column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line_number: usize,
    cells: Vec<String>,
}

impl RawRow {
    #[must_use]
    pub fn new(line_number: usize, cells: Vec<String>) -> Self {
        Self { line_number, cells }
    }

    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    #[must_use]
    pub fn cell<'a>(&'a self, spec: &ColumnSpec, name: &str) -> Option<&'a str> {
        spec.index_of(name)
            .and_then(|index| self.cells.get(index))
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(String::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Unchecked,
    Checked,
}

impl MarkerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Checked => "checked",
        }
    }
}

impl Display for MarkerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub row_index: usize,
    pub column: String,
    pub marker: MarkerKind,
}

/// Canonical pipe-delimited rendering of a tokenized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable(String);

impl NormalizedTable {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for NormalizedTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
