#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    RowPadded,
    MultipleMarkers,
    LinesTruncated,
    NoTableLines,
    NoDataRows,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RowPadded => "row_padded",
            Self::MultipleMarkers => "multiple_markers",
            Self::LinesTruncated => "lines_truncated",
            Self::NoTableLines => "no_table_lines",
            Self::NoDataRows => "no_data_rows",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub row: Option<usize>,
    pub column: Option<String>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}
