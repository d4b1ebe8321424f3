use axum::{Json, debug_handler, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    accounts,
    appresult::{ApiError, ApiResult},
    session,
};

use super::password;

const BAD_CREDENTIALS: &str = "Incorrect username/email or password";

#[derive(Debug, Deserialize)]
pub(crate) struct SignInBody {
    identifier: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn sign_in(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(SignInBody { identifier, password }): Json<SignInBody>,
) -> ApiResult<impl IntoResponse> {
    let Some(account) = accounts::find_by_identifier(&db_pool, identifier.trim()).await? else {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_owned()));
    };

    if !password::verify(&password, &account.password_hash) {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_owned()));
    }

    if !account.is_verified {
        return Err(ApiError::Forbidden(
            "Please verify your account before signing in".to_owned(),
        ));
    }

    session.insert(session::ACCOUNT_ID, account.id.clone()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Signed in",
        "user": account,
    })))
}
