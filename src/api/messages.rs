use crate::api::AppState;
use crate::api::schemas::messaging::{
    ListMessagesQuery, ListMessagesResponse, MessageView, SendMessageRequest, SendMessageResponse,
};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Lists stored messages, optionally filtered by `?status=sent|read`.
///
/// # Errors
/// Returns `AppError::BadRequest` if the status filter is not recognized.
/// Returns `AppError::Database` if the messages cannot be loaded.
pub async fn list_messages(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListMessagesQuery>, QueryRejection>,
) -> Result<Json<ListMessagesResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let status = query.status().map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let messages = state.message_service.list(status).await?;

    Ok(Json(ListMessagesResponse { messages: messages.into_iter().map(MessageView::from).collect() }))
}

/// Accepts a message for asynchronous storage.
///
/// The text comes from a JSON body `{"text": ...}` or, when there is no usable body,
/// from a `?text=` query parameter. Responds `202 Accepted` as soon as the submission
/// is queued; the message is not guaranteed to be stored yet.
///
/// # Errors
/// Returns `AppError::BadRequest` if the body is malformed or the text is missing or invalid.
/// Returns `AppError::DispatchFailure` if the submission cannot be queued.
pub async fn send_message(
    State(state): State<AppState>,
    query: std::result::Result<Query<SendMessageRequest>, QueryRejection>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = match (payload, query.text) {
        (Ok(Json(body)), query_text) => body.text.or(query_text),
        (Err(_), Some(query_text)) => Some(query_text),
        (Err(e), None) => return Err(AppError::BadRequest(format!("Invalid request body: {}", e.body_text()))),
    };
    let text = text.ok_or_else(|| AppError::BadRequest("Text is required".to_string()))?;

    let submission_id = state.message_service.submit(text)?;

    Ok((StatusCode::ACCEPTED, Json(SendMessageResponse { status: "accepted".to_string(), submission_id })))
}

/// Marks a stored message as read.
///
/// # Errors
/// Returns `AppError::BadRequest` for a malformed uuid and `AppError::NotFound` for an unknown one.
pub async fn mark_read(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageView>> {
    let Path(uuid) = path.map_err(|_| AppError::BadRequest("Invalid message uuid".to_string()))?;

    let message = state.message_service.mark_read(uuid).await?;

    Ok(Json(message.into()))
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
