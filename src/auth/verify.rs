use axum::{Json, debug_handler, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{accounts, appresult::ApiResult};

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyBody {
    username: String,
    code: String,
}

#[debug_handler]
pub(crate) async fn verify_code(
    State(db_pool): State<SqlitePool>,
    Json(VerifyBody { username, code }): Json<VerifyBody>,
) -> ApiResult<impl IntoResponse> {
    accounts::verify(&db_pool, username.trim(), code.trim()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Account verified successfully",
    })))
}
