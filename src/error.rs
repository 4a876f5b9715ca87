use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::dashboard::DashboardError;
use crate::engagement::EngagementError;
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("validation failed")] Validation(Vec<String>),
    #[error("not found")] NotFound,
    #[error("unauthorized")] Unauthorized,
    #[error("forbidden")] Forbidden,
    #[error("too many requests")] TooManyRequests,
    #[error("{0}")] Internal(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::Validation(vec![msg.into()])
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            // uniqueness violations surface as validation failures
            RepoError::Conflict(msg) => ApiError::Validation(vec![msg]),
            RepoError::Internal(msg) => {
                log::error!("store failure: {msg}");
                ApiError::Internal(msg)
            }
        }
    }
}

impl From<EngagementError> for ApiError {
    fn from(e: EngagementError) -> Self {
        match e {
            EngagementError::Invalid(msg) => ApiError::Validation(vec![msg]),
            EngagementError::Repo(e) => e.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::NotFound => ApiError::NotFound,
            DashboardError::Failed(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let (status, messages) = match self {
            ApiError::Validation(msgs) => (StatusCode::BAD_REQUEST, msgs.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, Vec::new()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, Vec::new()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, Vec::new()),
            ApiError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, Vec::new()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()),
        };
        // release builds never leak internal messages
        let error = match self {
            ApiError::Internal(_) if !cfg!(debug_assertions) => "internal error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ApiErrorBody { error, messages })
    }
}
