use medtab_extract::{
    Annotation, Cell, CellValue, ExtractWarning, MarkerKind, TypedDataset, TypedRow,
};
use serde::{Deserialize, Serialize};

pub const TABLE_CACHE_KEY_PREFIX: &str = "table:v1:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Unchecked,
    Checked,
}

impl From<MarkerKind> for Marker {
    fn from(kind: MarkerKind) -> Self {
        match kind {
            MarkerKind::Unchecked => Self::Unchecked,
            MarkerKind::Checked => Self::Checked,
        }
    }
}

impl From<Marker> for MarkerKind {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::Unchecked => Self::Unchecked,
            Marker::Checked => Self::Checked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredAnnotation {
    pub row_index: usize,
    pub column: String,
    pub marker: Marker,
}

impl From<&Annotation> for StoredAnnotation {
    fn from(annotation: &Annotation) -> Self {
        Self {
            row_index: annotation.row_index,
            column: annotation.column.clone(),
            marker: annotation.marker.into(),
        }
    }
}

impl From<&StoredAnnotation> for Annotation {
    fn from(stored: &StoredAnnotation) -> Self {
        Self {
            row_index: stored.row_index,
            column: stored.column.clone(),
            marker: stored.marker.into(),
        }
    }
}

/// Cache payload for one document: the normalized table text plus the
/// annotations stripped out of it. The typed dataset is rebuilt on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedTable {
    pub normalized: String,
    pub annotations: Vec<StoredAnnotation>,
    pub extracted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellPayload {
    pub text: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl From<&Cell> for CellPayload {
    fn from(cell: &Cell) -> Self {
        let (low, high) = match cell.value() {
            CellValue::Range { low, high, .. } => (Some(*low), Some(*high)),
            _ => (None, None),
        };

        Self {
            text: cell.text().to_string(),
            kind: cell.kind().as_str().to_string(),
            value: cell.value().numeric(),
            low,
            high,
            unit: cell.value().unit().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagPayload {
    pub column: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowPayload {
    pub source_index: usize,
    pub cells: Vec<CellPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub flags: Vec<FlagPayload>,
}

impl RowPayload {
    fn from_row(row: &TypedRow, columns: &[String]) -> Self {
        Self {
            source_index: row.source_index(),
            cells: row.cells().iter().map(CellPayload::from).collect(),
            flags: row
                .flags()
                .iter()
                .filter_map(|flag| {
                    columns.get(flag.column).map(|column| FlagPayload {
                        column: column.clone(),
                        marker: flag.marker.into(),
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningPayload {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl From<&ExtractWarning> for WarningPayload {
    fn from(warning: &ExtractWarning) -> Self {
        Self {
            code: warning.code.as_str().to_string(),
            message: warning.message.clone(),
            row: warning.row,
            column: warning.column.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub rows: Vec<RowPayload>,
    pub warnings: Vec<WarningPayload>,
    pub extracted_at: String,
    pub cached: bool,
}

impl DatasetResponse {
    pub fn from_dataset(
        dataset: &TypedDataset,
        warnings: &[ExtractWarning],
        document_id: Option<String>,
        extracted_at: String,
        cached: bool,
    ) -> Self {
        let columns = dataset.column_names().to_vec();
        Self {
            document_id,
            row_count: dataset.row_count(),
            rows: dataset
                .rows()
                .map(|row| RowPayload::from_row(row, &columns))
                .collect(),
            columns,
            warnings: warnings.iter().map(WarningPayload::from).collect(),
            extracted_at,
            cached,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
