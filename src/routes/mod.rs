// Route exports
pub mod conversations;
pub mod matches;
pub mod users;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use std::sync::Arc;

use crate::core::MatchEngine;
use crate::models::ErrorResponse;
use crate::services::{StoreError, TokenVerifier};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
    pub tokens: Arc<TokenVerifier>,
    /// Whether registering profiles requires the admin claim
    pub admin_required: bool,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(conversations::configure)
            .configure(users::configure),
    );
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::DuplicateLike | StoreError::DuplicateHandle(_) => StatusCode::CONFLICT,
            StoreError::SelfReference | StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::SqlxError(_) | StoreError::MigrateError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let error = match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Forbidden(_) => "forbidden",
            StoreError::DuplicateLike => "duplicate_like",
            StoreError::SelfReference => "self_reference",
            StoreError::DuplicateHandle(_) => "duplicate_handle",
            StoreError::InvalidInput(_) => "invalid_input",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::SqlxError(_) | StoreError::MigrateError(_) => "internal",
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut response = HttpResponse::build(status);
        if self.is_transient() {
            response.insert_header(("Retry-After", "1"));
        }

        response.json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// 400 response for request bodies failing `validator` checks
pub(crate) fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
