//! Request-level error taxonomy and its HTTP mapping.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::fetch::FetchError;
use crate::interval::TimestampError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no query found by uuid {0}")]
    NotFound(String),
    #[error("wrong format of start and/or finish")]
    DateFormat(#[from] TimestampError),
    #[error("unable to connect to craigslist")]
    Unavailable(#[source] FetchError),
    #[error("region does not form a valid listing url")]
    InvalidRegion(#[source] FetchError),
    #[error("amount must be between 1 and 120")]
    InvalidAmount,
    #[error("sort must be either 'date' or 'rel'")]
    InvalidSort,
    #[error("{0}")]
    InvalidParams(String),
    #[error("registry unavailable")]
    Registry(#[from] RegistryError),
}

impl From<FetchError> for ServiceError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidUrl { .. } => ServiceError::InvalidRegion(e),
            FetchError::Timeout { .. } | FetchError::Transport { .. } => {
                ServiceError::Unavailable(e)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::DateFormat(_)
            | ServiceError::InvalidRegion(_)
            | ServiceError::InvalidAmount
            | ServiceError::InvalidSort
            | ServiceError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ServiceError::Registry(e) = self {
            error!(error = %e, "registry failure");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}
