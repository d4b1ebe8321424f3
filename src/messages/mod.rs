mod accept;
mod inbox;
mod send;

use axum::{
    Router,
    routing::{delete, get, post},
};
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::AppState;

/// An anonymous message. Immutable once appended; only the owning account may
/// delete it. Nothing ties it back to its sender.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(skip_serializing)]
    pub account_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-message", post(send::send_message))
        .route("/get-messages", get(inbox::get_messages))
        .route("/delete-message/{id}", delete(inbox::delete_message))
        .route(
            "/accept-messages",
            get(accept::get_accepting).post(accept::set_accepting),
        )
}
