use axum::{Json, debug_handler, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    AppState, accounts,
    appresult::{ApiError, ApiResult},
    email::Mailer,
};

use super::password;

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpBody {
    username: String,
    email: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn sign_up(
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    Json(SignUpBody { username, email, password }): Json<SignUpBody>,
) -> ApiResult<impl IntoResponse> {
    let username = username.trim().to_owned();
    let email = email.trim().to_lowercase();
    validate(&username, &email, &password)?;

    let password_hash = password::hash(&password)?;
    let code = accounts::register(&db_pool, &username, &email, &password_hash).await?;

    // The record is already persisted at this point; a failed dispatch still
    // fails the registration, and re-registering issues a fresh code.
    if let Err(err) = mailer.send_verification(&email, &username, &code).await {
        tracing::error!("verification email to {email} failed: {err:#}");
        return Err(ApiError::EmailDispatch(
            "Failed to send verification email, please try again".to_owned(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account registered, check your email for a verification code",
        })),
    ))
}

fn validate(username: &str, email: &str, password: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(2..=20).contains(&len) {
        return Err(ApiError::BadRequest(
            "Username must be between 2 and 20 characters".to_owned(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ApiError::BadRequest(
            "Username may only contain letters, numbers, dots and underscores".to_owned(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::BadRequest("Invalid email address".to_owned()));
    }
    if password.chars().count() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_owned(),
        ));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
}
