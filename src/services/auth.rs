use actix_web::{dev::Payload, http::StatusCode, web, FromRequest, HttpRequest, HttpResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ErrorResponse;
use crate::routes::AppState;

/// Errors from bearer token verification
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Administrator privileges required")]
    AdminRequired,

    #[error("Authentication is not configured")]
    NotConfigured,
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let error = match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::AdminRequired => "admin_required",
            AuthError::NotConfigured => "internal",
        };

        if status.is_server_error() {
            tracing::error!("Authentication failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: Uuid,
    pub handle: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

/// HS256 verifier for access tokens
///
/// Tokens are issued by the identity service; this service only needs
/// `verify`. `issue` exists for tests and local tooling.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        handle: &str,
        is_admin: bool,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            handle: handle.to_string(),
            is_admin,
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Authenticated caller, extracted from `Authorization: Bearer <jwt>`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub handle: String,
    pub is_admin: bool,
}

impl CurrentUser {
    fn from_request_sync(req: &HttpRequest) -> Result<Self, AuthError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or(AuthError::NotConfigured)?;

        let token = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        let claims = state.tokens.verify(token)?;

        Ok(Self {
            user_id: claims.sub,
            handle: claims.handle,
            is_admin: claims.is_admin,
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_request_sync(req))
    }
}

/// Authenticated caller holding the admin claim
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequest for AdminUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_request_sync(req).and_then(|user| {
            if user.is_admin {
                Ok(AdminUser(user))
            } else {
                Err(AuthError::AdminRequired)
            }
        }))
    }
}
