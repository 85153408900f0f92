use std::fmt::{Display, Formatter};

use medtab_extract::ExtractError;
use worker::{Response, Result};

use crate::models::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Unprocessable(_) => "unprocessable_table",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Unprocessable(message)
            | Self::Internal(message) => message,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unprocessable(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message().to_string(),
        }
    }

    pub fn into_response(self) -> Result<Response> {
        let mut response = Response::from_json(&self.to_error_response())?;
        response.headers_mut().set("Cache-Control", "no-store")?;
        Ok(response.with_status(self.status_code()))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::MalformedHeader { .. }
            | ExtractError::Schema { .. }
            | ExtractError::TooManyColumns { .. }
            | ExtractError::LimitExceeded { .. } => Self::Unprocessable(error.to_string()),
            ExtractError::UnknownColumn(_)
            | ExtractError::InvalidCondition(_)
            | ExtractError::InvalidOption(_) => Self::BadRequest(error.to_string()),
            ExtractError::Io(_) | ExtractError::Csv(_) => Self::Internal(error.to_string()),
        }
    }
}

impl From<worker::Error> for ApiError {
    fn from(error: worker::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(error.to_string())
    }
}
