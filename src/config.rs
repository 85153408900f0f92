use medtab_extract::ExtractOptions;
use worker::Env;

use crate::error::ApiError;

pub const MAX_LINES_VAR: &str = "MAX_LINES";
pub const MAX_COLUMNS_VAR: &str = "MAX_COLUMNS";
pub const CACHE_TTL_SECONDS_VAR: &str = "CACHE_TTL_SECONDS";
pub const DEFAULT_CACHE_TTL_SECONDS: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub options: ExtractOptions,
    pub cache_ttl_seconds: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            options: ExtractOptions::default(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ApiError::Internal(format!("{name} must be a positive integer, got '{raw}'")))
}

impl WorkerConfig {
    /// Builds the config from raw variable values; `None` keeps the default.
    pub fn from_vars(
        max_lines: Option<&str>,
        max_columns: Option<&str>,
        cache_ttl_seconds: Option<&str>,
    ) -> Result<Self, ApiError> {
        let defaults = Self::default();
        let options = ExtractOptions {
            max_lines: parse_var(MAX_LINES_VAR, max_lines)?.unwrap_or(defaults.options.max_lines),
            max_columns: parse_var(MAX_COLUMNS_VAR, max_columns)?
                .unwrap_or(defaults.options.max_columns),
            ..defaults.options
        };
        options
            .validate()
            .map_err(|error| ApiError::Internal(format!("invalid worker config: {error}")))?;

        Ok(Self {
            options,
            cache_ttl_seconds: parse_var(CACHE_TTL_SECONDS_VAR, cache_ttl_seconds)?
                .unwrap_or(defaults.cache_ttl_seconds),
        })
    }

    pub fn from_env(env: &Env) -> Result<Self, ApiError> {
        let read = |name: &str| env.var(name).ok().map(|value| value.to_string());
        let max_lines = read(MAX_LINES_VAR);
        let max_columns = read(MAX_COLUMNS_VAR);
        let cache_ttl_seconds = read(CACHE_TTL_SECONDS_VAR);

        Self::from_vars(
            max_lines.as_deref(),
            max_columns.as_deref(),
            cache_ttl_seconds.as_deref(),
        )
    }
}
