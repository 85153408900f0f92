mod annotate;
mod boundary;
mod csv_out;
mod dataset;
mod error;
mod model;
mod normalize;
mod options;
mod query;
mod render;
mod schema;
mod text_reader;
mod tokenize;
mod warning;

use std::path::Path;

use crate::annotate::extract_annotations_with_warnings;
use crate::tokenize::tokenize_lines;

pub use annotate::{AnnotatedRows, extract_annotations};
pub use boundary::detect_columns;
pub use csv_out::{write_csv, write_csv_to_string};
pub use dataset::{Cell, CellFlag, CellValue, TypedDataset, TypedRow, ValueKind};
pub use error::ExtractError;
pub use model::{Annotation, Column, ColumnSpec, MarkerKind, NormalizedTable, RawRow};
pub use normalize::normalize_lines;
pub use options::{
    DEFAULT_MAX_COLUMNS, DEFAULT_MAX_LINES, ExtractOptions, OverflowMode, TokenizeMode,
};
pub use query::{CompareOp, Condition, FilterSpec, QuerySpec, SortSpec, filter, sort};
pub use render::{render_dataset, render_table};
pub use schema::{ParsedTable, build_dataset, infer_value, parse_normalized_table};
pub use text_reader::{decode_text_bytes, read_text_file};
pub use tokenize::tokenize_line;
pub use warning::{ExtractWarning, WarningCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub column_count: usize,
    pub annotation_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

/// Everything one extraction call produces. Nothing here borrows the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub column_spec: Option<ColumnSpec>,
    pub normalized: NormalizedTable,
    pub dataset: TypedDataset,
    pub report: ExtractionReport,
}

fn apply_line_limit(
    mut lines: Vec<String>,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<String>, ExtractError> {
    if lines.len() <= options.max_lines {
        return Ok(lines);
    }

    match options.overflow {
        OverflowMode::Strict => Err(ExtractError::LimitExceeded {
            lines: lines.len(),
            limit: options.max_lines,
        }),
        OverflowMode::Truncate => {
            tracing::warn!(
                lines = lines.len(),
                limit = options.max_lines,
                "truncating table input"
            );
            warnings.push(ExtractWarning::new(
                WarningCode::LinesTruncated,
                format!(
                    "input has {} lines; only the first {} were used",
                    lines.len(),
                    options.max_lines
                ),
            ));
            lines.truncate(options.max_lines);
            Ok(lines)
        }
    }
}

fn report_for(dataset: &TypedDataset, warnings: Vec<ExtractWarning>) -> ExtractionReport {
    ExtractionReport {
        row_count: dataset.row_count(),
        column_count: dataset.column_count(),
        annotation_count: dataset.rows().map(|row| row.flags().len()).sum(),
        warnings,
    }
}

/// Runs the whole pipeline over OCR text already scoped to one table: the
/// first non-blank line is the header, every following line is a data row.
pub fn extract_table(text: &str, options: &ExtractOptions) -> Result<Extraction, ExtractError> {
    options.validate()?;

    let mut warnings = Vec::new();
    let lines = apply_line_limit(normalize_lines(text), options, &mut warnings)?;

    let Some((header, data_lines)) = lines.split_first() else {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTableLines,
            "input has no non-blank lines",
        ));
        let dataset = TypedDataset::empty();
        return Ok(Extraction {
            column_spec: None,
            normalized: NormalizedTable::new(String::new()),
            report: report_for(&dataset, warnings),
            dataset,
        });
    };

    let spec = detect_columns(header, options)?;
    let raw_rows = tokenize_lines(&spec, data_lines, 1, options.tokenize_mode, &mut warnings);
    let annotated = extract_annotations_with_warnings(&spec, &raw_rows, &mut warnings);
    let normalized = render_table(&spec, &annotated.rows);

    let dataset = build_dataset(normalized.as_str())?.with_annotations(&annotated.annotations);
    if dataset.column_count() != spec.len() {
        return Err(ExtractError::Schema {
            row: 0,
            expected: spec.len(),
            found: dataset.column_count(),
        });
    }

    if dataset.is_empty() {
        warnings.push(ExtractWarning::new(
            WarningCode::NoDataRows,
            "table has a header but no data rows",
        ));
    }

    tracing::debug!(
        columns = dataset.column_count(),
        rows = dataset.row_count(),
        annotations = annotated.annotations.len(),
        warnings = warnings.len(),
        "table extraction completed"
    );

    Ok(Extraction {
        column_spec: Some(spec),
        normalized,
        report: report_for(&dataset, warnings),
        dataset,
    })
}

pub fn extract_text_to_csv(
    input: &Path,
    output: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let text = read_text_file(input)?;
    let extraction = extract_table(&text, options)?;
    write_csv(output, &extraction.dataset, options.delimiter)?;
    Ok(extraction.report)
}

pub fn extract_text_to_csv_string(
    text: &str,
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    let extraction = extract_table(text, options)?;
    let csv = write_csv_to_string(&extraction.dataset, options.delimiter)?;
    Ok((csv, extraction.report))
}
