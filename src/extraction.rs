use std::str::FromStr;

use medtab_extract::{
    Annotation, ExtractOptions, ExtractWarning, Extraction, QuerySpec, TypedDataset,
    build_dataset, extract_table, render_dataset, write_csv_to_string,
};

use crate::error::ApiError;
use crate::models::{CachedTable, DatasetResponse, StoredAnnotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Csv,
    Markdown,
}

impl ResponseFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(ApiError::BadRequest(format!(
                "format must be json, csv or markdown, got '{other}'"
            ))),
        }
    }
}

/// Result of an extract or cache lookup, before the query is applied.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub dataset: TypedDataset,
    pub warnings: Vec<ExtractWarning>,
    pub extracted_at: String,
    pub cached: bool,
}

pub fn extract_document(text: &str, options: &ExtractOptions) -> Result<Extraction, ApiError> {
    let extraction = extract_table(text, options)?;

    worker::console_log!(
        "table extraction completed: rows={}, columns={}, annotations={}, warnings={}",
        extraction.report.row_count,
        extraction.report.column_count,
        extraction.report.annotation_count,
        extraction.report.warnings.len()
    );

    Ok(extraction)
}

pub fn cached_table_for(extraction: &Extraction, extracted_at: &str) -> CachedTable {
    CachedTable {
        normalized: extraction.normalized.as_str().to_string(),
        annotations: extraction
            .dataset
            .annotations()
            .iter()
            .map(StoredAnnotation::from)
            .collect(),
        extracted_at: extracted_at.to_string(),
    }
}

/// Rebuilds the typed dataset from cached normalized text and reattaches the
/// annotations that were stripped from it.
pub fn dataset_from_cache(table: &CachedTable) -> Result<TypedDataset, ApiError> {
    let annotations = table
        .annotations
        .iter()
        .map(Annotation::from)
        .collect::<Vec<_>>();
    Ok(build_dataset(&table.normalized)?.with_annotations(&annotations))
}

/// Applies the query and serializes the view in the requested format.
pub fn render_body(
    loaded: &LoadedTable,
    query: &QuerySpec,
    format: ResponseFormat,
    document_id: Option<&str>,
) -> Result<String, ApiError> {
    let view = query.apply(&loaded.dataset)?;

    match format {
        ResponseFormat::Json => {
            let payload = DatasetResponse::from_dataset(
                &view,
                &loaded.warnings,
                document_id.map(str::to_string),
                loaded.extracted_at.clone(),
                loaded.cached,
            );
            Ok(serde_json::to_string(&payload)?)
        }
        ResponseFormat::Csv => Ok(write_csv_to_string(&view, b',')?),
        ResponseFormat::Markdown => Ok(render_dataset(&view).into_string()),
    }
}
