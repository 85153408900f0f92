use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use medtab_extract::{Condition, FilterSpec, QuerySpec, SortSpec};
use regex::Regex;
use url::Url;
use worker::{Context, Env, Request, Response, Result, RouteContext, Router};

use crate::cache;
use crate::config::WorkerConfig;
use crate::error::ApiError;
use crate::extraction::{
    LoadedTable, ResponseFormat, cached_table_for, dataset_from_cache, extract_document,
    render_body,
};

static DOCUMENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:-]{0,127}$").expect("document id pattern is valid")
});

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: WorkerConfig,
}

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = match WorkerConfig::from_env(&env) {
        Ok(config) => config,
        Err(error) => {
            worker::console_error!("invalid worker config: {error}");
            return error.into_response();
        }
    };

    Router::with_data(AppState { config })
        .post_async("/api/v1/extract", extract_route)
        .get_async("/api/v1/dataset", dataset_route)
        .run(req, env)
        .await
}

async fn extract_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match extract_response(&mut req, &ctx.data.config).await {
        Ok(response) => Ok(response),
        Err(error) => error.into_response(),
    }
}

async fn dataset_route(req: Request, _ctx: RouteContext<AppState>) -> Result<Response> {
    match dataset_response(&req).await {
        Ok(response) => Ok(response),
        Err(error) => error.into_response(),
    }
}

async fn extract_response(req: &mut Request, config: &WorkerConfig) -> Result<Response, ApiError> {
    let query = parse_query_pairs(&req.url()?);
    let document_id = parse_document_id(&query)?;
    let spec = parse_query_spec(&query)?;
    let format = parse_format(&query)?;

    let text = req.text().await?;
    let extraction = extract_document(&text, &config.options)?;
    let extracted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    if let Some(id) = &document_id
        && extraction.column_spec.is_some()
    {
        let table = cached_table_for(&extraction, &extracted_at);
        cache::store_table(id, &table, config.cache_ttl_seconds).await?;
    }

    let loaded = LoadedTable {
        dataset: extraction.dataset,
        warnings: extraction.report.warnings,
        extracted_at,
        cached: false,
    };
    let body = render_body(&loaded, &spec, format, document_id.as_deref())?;
    body_response(body, format, document_id.as_deref())
}

async fn dataset_response(req: &Request) -> Result<Response, ApiError> {
    let query = parse_query_pairs(&req.url()?);
    let document_id = parse_document_id(&query)?
        .ok_or_else(|| ApiError::BadRequest("document_id is required".to_string()))?;
    let spec = parse_query_spec(&query)?;
    let format = parse_format(&query)?;

    let table = cache::load_table(&document_id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("no extracted table cached for '{document_id}'"))
    })?;

    let loaded = LoadedTable {
        dataset: dataset_from_cache(&table)?,
        warnings: Vec::new(),
        extracted_at: table.extracted_at,
        cached: true,
    };
    let body = render_body(&loaded, &spec, format, Some(&document_id))?;
    body_response(body, format, Some(&document_id))
}

fn body_response(
    body: String,
    format: ResponseFormat,
    document_id: Option<&str>,
) -> Result<Response, ApiError> {
    let mut response = Response::ok(body)?;
    response
        .headers_mut()
        .set("Content-Type", format.content_type())?;
    if format == ResponseFormat::Csv {
        response.headers_mut().set(
            "Content-Disposition",
            &format!(
                "inline; filename=\"{}.csv\"",
                document_id.unwrap_or("table")
            ),
        )?;
    }
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

pub fn parse_query_pairs(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

pub fn parse_document_id(query: &HashMap<String, String>) -> Result<Option<String>, ApiError> {
    let Some(raw) = query.get("document_id") else {
        return Ok(None);
    };

    let id = raw.trim();
    if !DOCUMENT_ID_RE.is_match(id) {
        return Err(ApiError::BadRequest(
            "document_id must be 1-128 characters of letters, digits, '.', '_', ':' or '-'"
                .to_string(),
        ));
    }
    Ok(Some(id.to_string()))
}

pub fn parse_format(query: &HashMap<String, String>) -> Result<ResponseFormat, ApiError> {
    query
        .get("format")
        .map_or(Ok(ResponseFormat::default()), |value| {
            ResponseFormat::from_str(value)
        })
}

/// Reads `filter_column` + `condition` and `sort_column` + `ascending`.
pub fn parse_query_spec(query: &HashMap<String, String>) -> Result<QuerySpec, ApiError> {
    let filter = match (query.get("filter_column"), query.get("condition")) {
        (Some(column), Some(condition)) => Some(FilterSpec {
            column: column.clone(),
            condition: Condition::from_str(condition)?,
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "filter_column and condition must be given together".to_string(),
            ));
        }
    };

    let ascending = match query.get("ascending") {
        Some(raw) => parse_bool_flag(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("ascending must be true or false, got '{raw}'"))
        })?,
        None => true,
    };

    let sort = query.get("sort_column").map(|column| SortSpec {
        column: column.clone(),
        ascending,
    });

    Ok(QuerySpec { filter, sort })
}
