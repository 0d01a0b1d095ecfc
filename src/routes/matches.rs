use actix_web::{web, HttpResponse, Responder};

use crate::models::{CandidateResponse, HealthResponse, LikeRequest, LikeResponse};
use crate::routes::AppState;
use crate::services::{CurrentUser, StoreError};

/// Configure candidate and like routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/candidate", web::get().to(next_candidate))
        .route("/likes", web::post().to(record_like));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.engine.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        cache: state.engine.cache_stats(),
    })
}

/// Next candidate endpoint
///
/// GET /api/v1/candidate
///
/// Responds 200 with either:
/// ```json
/// { "status": "available", "profile": { "userId": "...", "handle": "..." } }
/// { "status": "exhausted" }
/// ```
async fn next_candidate(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, StoreError> {
    let candidate = state.engine.next_candidate(user.user_id).await?;

    Ok(HttpResponse::Ok().json(CandidateResponse::from(candidate)))
}

/// Like endpoint
///
/// POST /api/v1/likes
///
/// Request body:
/// ```json
/// { "likeeId": "uuid" }
/// ```
///
/// Response: `{ "matched": false }` or `{ "matched": true, "conversationId": "uuid" }`.
/// Liking the same user twice is rejected with 409.
async fn record_like(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<LikeRequest>,
) -> Result<HttpResponse, StoreError> {
    tracing::info!("User {} likes {}", user.user_id, req.likee_id);

    let outcome = state.engine.record_like(user.user_id, req.likee_id).await?;

    Ok(HttpResponse::Ok().json(LikeResponse::from(outcome)))
}
