use std::collections::HashMap;

use medtab_extract::{
    CompareOp, Condition, ExtractError, ExtractOptions, QuerySpec, SortSpec, extract_table,
};
use medtab_worker::config::{DEFAULT_CACHE_TTL_SECONDS, WorkerConfig};
use medtab_worker::error::ApiError;
use medtab_worker::extraction::{
    LoadedTable, ResponseFormat, cached_table_for, dataset_from_cache, render_body,
};
use medtab_worker::models::{DatasetResponse, Marker};
use medtab_worker::routes::{
    parse_bool_flag, parse_document_id, parse_format, parse_query_pairs, parse_query_spec,
};
use pretty_assertions::assert_eq;
use url::Url;

const REPORT: &str = "\
Parameter         Value        Reference Range    Remarks
Hemoglobin        14.2 g/dl    13.8-17.2 g/dL     Normal
ALT               32 U/L       10:40 U/L          Normal
LDL Cholesterol   see note     < 100 mg/dL        [x] Borderline
";

fn query(url: &str) -> HashMap<String, String> {
    parse_query_pairs(&Url::parse(url).expect("valid url"))
}

fn loaded(text: &str) -> LoadedTable {
    let extraction = extract_table(text, &ExtractOptions::default()).expect("report extracts");
    LoadedTable {
        dataset: extraction.dataset,
        warnings: extraction.report.warnings,
        extracted_at: "2026-01-01T00:00:00Z".to_string(),
        cached: false,
    }
}

#[test]
fn parses_filter_and_sort_from_query_string() {
    let query = query(
        "https://host/api/v1/extract?filter_column=Value&condition=%3E%3D%2010&sort_column=Value&ascending=false",
    );
    let spec = parse_query_spec(&query).expect("query should parse");

    let filter = spec.filter.expect("filter present");
    assert_eq!(filter.column, "Value");
    assert_eq!(filter.condition, Condition::Numeric(CompareOp::Ge, 10.0));
    assert_eq!(
        spec.sort,
        Some(SortSpec {
            column: "Value".to_string(),
            ascending: false,
        })
    );
}

#[test]
fn empty_query_string_means_no_query() {
    let spec = parse_query_spec(&query("https://host/api/v1/extract")).expect("empty query");
    assert_eq!(spec, QuerySpec::default());
    assert!(spec.is_empty());
}

#[test]
fn filter_column_without_condition_is_rejected() {
    let error = parse_query_spec(&query("https://host/x?filter_column=Value"))
        .expect_err("condition is missing");
    assert_eq!(error.status_code(), 400);
}

#[test]
fn bad_condition_and_ascending_values_are_bad_requests() {
    let error = parse_query_spec(&query("https://host/x?filter_column=A&condition=~5"))
        .expect_err("unknown operator");
    assert_eq!(error.code(), "bad_request");

    let error = parse_query_spec(&query("https://host/x?sort_column=A&ascending=maybe"))
        .expect_err("bad bool");
    assert_eq!(error.status_code(), 400);
}

#[test]
fn bool_flags_accept_common_spellings() {
    assert_eq!(parse_bool_flag("TRUE"), Some(true));
    assert_eq!(parse_bool_flag(" yes "), Some(true));
    assert_eq!(parse_bool_flag("0"), Some(false));
    assert_eq!(parse_bool_flag("sometimes"), None);
}

#[test]
fn formats_default_to_json() {
    assert_eq!(
        parse_format(&query("https://host/x")).expect("default"),
        ResponseFormat::Json
    );
    assert_eq!(
        parse_format(&query("https://host/x?format=CSV")).expect("csv"),
        ResponseFormat::Csv
    );
    assert_eq!(
        parse_format(&query("https://host/x?format=md")).expect("markdown alias"),
        ResponseFormat::Markdown
    );
    assert!(parse_format(&query("https://host/x?format=xml")).is_err());
}

#[test]
fn document_ids_are_validated() {
    assert_eq!(
        parse_document_id(&query("https://host/x?document_id=lab-2026.03")).expect("valid id"),
        Some("lab-2026.03".to_string())
    );
    assert_eq!(parse_document_id(&query("https://host/x")).expect("absent"), None);
    assert!(parse_document_id(&query("https://host/x?document_id=a%2Fb")).is_err());
    assert!(parse_document_id(&query("https://host/x?document_id=")).is_err());
}

#[test]
fn worker_config_reads_overrides_and_defaults() {
    let config = WorkerConfig::from_vars(Some("500"), None, Some("60")).expect("valid vars");
    assert_eq!(config.options.max_lines, 500);
    assert_eq!(
        config.options.max_columns,
        ExtractOptions::default().max_columns
    );
    assert_eq!(config.cache_ttl_seconds, 60);

    let defaults = WorkerConfig::from_vars(None, Some("  "), None).expect("blank is default");
    assert_eq!(defaults.cache_ttl_seconds, DEFAULT_CACHE_TTL_SECONDS);

    assert!(WorkerConfig::from_vars(Some("many"), None, None).is_err());
    assert!(WorkerConfig::from_vars(Some("0"), None, None).is_err());
}

#[test]
fn extract_errors_map_to_http_statuses() {
    let structural = ApiError::from(ExtractError::MalformedHeader {
        header: "Name Value".to_string(),
    });
    assert_eq!(structural.status_code(), 422);

    let query = ApiError::from(ExtractError::UnknownColumn("Unit".to_string()));
    assert_eq!(query.status_code(), 400);
    assert_eq!(query.to_error_response().message, "unknown column: 'Unit'");
}

#[test]
fn json_payload_carries_types_and_flags() {
    let table = loaded(REPORT);
    let payload = DatasetResponse::from_dataset(
        &table.dataset,
        &table.warnings,
        Some("doc-1".to_string()),
        table.extracted_at.clone(),
        false,
    );

    assert_eq!(
        payload.columns,
        vec!["Parameter", "Value", "Reference Range", "Remarks"]
    );
    assert_eq!(payload.row_count, 3);

    let range = &payload.rows[0].cells[2];
    assert_eq!(range.kind, "range");
    assert_eq!((range.low, range.high), (Some(13.8), Some(17.2)));
    assert_eq!(range.unit.as_deref(), Some("g/dL"));

    let flagged = &payload.rows[2];
    assert_eq!(flagged.cells[3].text, "Borderline");
    assert_eq!(flagged.flags.len(), 1);
    assert_eq!(flagged.flags[0].column, "Remarks");
    assert_eq!(flagged.flags[0].marker, Marker::Checked);
}

#[test]
fn renders_filtered_views_in_each_format() {
    let table = loaded(REPORT);
    let spec = parse_query_spec(&query(
        "https://host/x?filter_column=Remarks&condition=contains%20Normal",
    ))
    .expect("query should parse");

    let csv = render_body(&table, &spec, ResponseFormat::Csv, None).expect("csv body");
    assert_eq!(
        csv,
        "Parameter,Value,Reference Range,Remarks\n\
         Hemoglobin,14.2 g/dl,13.8-17.2 g/dL,Normal\n\
         ALT,32 U/L,10:40 U/L,Normal\n"
    );

    let markdown =
        render_body(&table, &spec, ResponseFormat::Markdown, None).expect("markdown body");
    assert!(markdown.starts_with("Parameter | Value | Reference Range | Remarks\n--- |"));
    assert_eq!(markdown.lines().count(), 4);

    let json = render_body(&table, &spec, ResponseFormat::Json, Some("doc-1")).expect("json");
    let parsed: DatasetResponse = serde_json::from_str(&json).expect("json round trip");
    assert_eq!(parsed.row_count, 2);
    assert_eq!(parsed.document_id.as_deref(), Some("doc-1"));
}

#[test]
fn unknown_query_column_is_a_bad_request() {
    let table = loaded(REPORT);
    let spec = parse_query_spec(&query("https://host/x?sort_column=Unit")).expect("parses");
    let error =
        render_body(&table, &spec, ResponseFormat::Json, None).expect_err("unknown column");
    assert_eq!(error.status_code(), 400);
}

#[test]
fn cached_table_rebuilds_the_same_dataset() {
    let extraction = extract_table(REPORT, &ExtractOptions::default()).expect("report extracts");
    let cached = cached_table_for(&extraction, "2026-01-01T00:00:00Z");
    assert_eq!(cached.annotations.len(), 1);

    let text = serde_json::to_string(&cached).expect("serializes");
    let restored = serde_json::from_str(&text).expect("deserializes");
    let rebuilt = dataset_from_cache(&restored).expect("cached text parses");

    assert_eq!(rebuilt, extraction.dataset);
}
