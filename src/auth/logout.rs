use axum::{Json, debug_handler, response::IntoResponse};
use serde_json::json;
use tower_sessions::Session;

use crate::appresult::ApiResult;

#[debug_handler]
pub(crate) async fn sign_out(session: Session) -> ApiResult<impl IntoResponse> {
    session.clear().await;

    Ok(Json(json!({
        "success": true,
        "message": "Signed out",
    })))
}
