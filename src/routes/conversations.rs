use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    ConversationsResponse, MessageCursor, MessagesQuery, MessagesResponse, SendMessageRequest,
};
use crate::routes::{validation_failed, AppState};
use crate::services::{CurrentUser, StoreError};

/// Configure conversation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/conversations", web::get().to(list_conversations))
        .route("/conversations/{id}/messages", web::post().to(send_message))
        .route("/conversations/{id}/messages", web::get().to(get_messages));
}

/// GET /api/v1/conversations
async fn list_conversations(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, StoreError> {
    let conversations = state.engine.list_conversations(user.user_id).await?;

    Ok(HttpResponse::Ok().json(ConversationsResponse { conversations }))
}

/// Send message endpoint
///
/// POST /api/v1/conversations/{id}/messages
///
/// Request body:
/// ```json
/// { "content": "hi" }
/// ```
///
/// The sender is the authenticated user; non-participants get 403.
async fn send_message(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, StoreError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let conversation_id = path.into_inner();
    let message = state
        .engine
        .append_message(conversation_id, user.user_id, &req.content)
        .await?;

    Ok(HttpResponse::Created().json(message))
}

/// Read messages endpoint
///
/// GET /api/v1/conversations/{id}/messages?after={seq}&limit={n}
///
/// Messages come back oldest first. Without `after` or `limit` the whole
/// history is returned; otherwise at most `limit` (capped by the page limit)
/// and `hasMore` says whether newer messages remain. `nextCursor` is the `seq`
/// of the last returned message (or the incoming `after` when nothing new
/// arrived), so clients poll by passing it back as `after`.
async fn get_messages(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, StoreError> {
    let conversation_id = path.into_inner();
    let cursor = match (query.after, query.limit) {
        (None, None) => MessageCursor::all(),
        (after, limit) => {
            MessageCursor::page(after, limit.unwrap_or(state.engine.limits().page_limit))
        }
    };

    let page = if user.is_admin {
        state.engine.get_message_page(conversation_id, cursor).await?
    } else {
        state
            .engine
            .get_message_page_for(user.user_id, conversation_id, cursor)
            .await?
    };

    let next_cursor = page.messages.last().map(|m| m.seq).or(query.after);

    Ok(HttpResponse::Ok().json(MessagesResponse {
        conversation_id,
        messages: page.messages,
        next_cursor,
        has_more: page.has_more,
    }))
}
