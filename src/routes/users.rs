use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateProfileRequest, DeleteUserResponse, NewProfile, UserRef};
use crate::routes::{validation_failed, AppState};
use crate::services::{AdminUser, AuthError, CurrentUser, StoreError};

/// Configure directory and administrative routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/users", web::post().to(create_profile))
        .route("/users/by-handle/{handle}", web::get().to(get_user_by_handle))
        .route("/users/{id}", web::get().to(get_user))
        .route("/admin/users", web::get().to(list_profiles))
        .route("/admin/users/{id}/activity", web::get().to(user_activity))
        .route("/admin/users/{id}", web::delete().to(delete_user));
}

/// Register profile endpoint
///
/// POST /api/v1/users
///
/// Request body:
/// ```json
/// { "handle": "alice", "bio": "string", "avatarRef": "string" }
/// ```
async fn create_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<CreateProfileRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    if state.admin_required && !user.is_admin {
        return Err(AuthError::AdminRequired.into());
    }

    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let req = req.into_inner();
    let profile = state
        .engine
        .create_profile(NewProfile {
            handle: req.handle,
            bio: req.bio,
            avatar_ref: req.avatar_ref,
        })
        .await?;

    Ok(HttpResponse::Created().json(profile))
}

/// GET /api/v1/users/{id}
async fn get_user(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, StoreError> {
    let profile = state
        .engine
        .resolve_user(&UserRef::Id(path.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/users/by-handle/{handle}
async fn get_user_by_handle(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let profile = state
        .engine
        .resolve_user(&UserRef::Handle(path.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/admin/users
async fn list_profiles(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, StoreError> {
    let profiles = state.engine.list_profiles().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "profiles": profiles,
        "count": profiles.len(),
    })))
}

/// GET /api/v1/admin/users/{id}/activity
async fn user_activity(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, StoreError> {
    let activity = state.engine.user_activity(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(activity))
}

/// Delete user endpoint
///
/// DELETE /api/v1/admin/users/{id}
///
/// Removes the user together with every like and conversation that
/// references them.
async fn delete_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, StoreError> {
    let user_id = path.into_inner();
    tracing::info!("Admin {} deleting user {}", admin.0.user_id, user_id);

    let report = state.engine.delete_user(user_id).await?;

    Ok(HttpResponse::Ok().json(DeleteUserResponse { user_id, report }))
}
