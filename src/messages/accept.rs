use axum::{Json, debug_handler, extract::State, response::IntoResponse};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    accounts,
    appresult::{ApiError, ApiResult},
    session,
};

#[debug_handler]
pub(crate) async fn get_accepting(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> ApiResult<impl IntoResponse> {
    let principal = session::principal(&session).await?;

    let account = accounts::find_by_id(&db_pool, &principal.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))?;

    Ok(Json(json!({
        "success": true,
        "isAcceptingMessages": account.is_accepting_messages,
    })))
}

#[debug_handler]
pub(crate) async fn set_accepting(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let principal = session::principal(&session).await?;
    let accepting = parse_accept_flag(&body)?;

    let account = accounts::set_accepting(&db_pool, &principal.account_id, accepting).await?;

    let message = if accepting {
        "You are now accepting messages"
    } else {
        "You are no longer accepting messages"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "user": account,
    })))
}

/// Strictly a boolean; "yes", 1 and friends are rejected.
fn parse_accept_flag(body: &Value) -> ApiResult<bool> {
    body.get("acceptMessages")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::BadRequest("'acceptMessages' must be a boolean".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{register_verified, test_pool};
    use serde_json::json;

    #[test]
    fn only_real_booleans_pass() {
        for bad in [
            json!({ "acceptMessages": "yes" }),
            json!({ "acceptMessages": 1 }),
            json!({ "acceptMessages": null }),
            json!({ "acceptMessages": [true] }),
            json!({}),
        ] {
            let err = parse_accept_flag(&bad).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        assert!(parse_accept_flag(&json!({ "acceptMessages": true })).unwrap());
        assert!(!parse_accept_flag(&json!({ "acceptMessages": false })).unwrap());
    }

    #[tokio::test]
    async fn rejected_toggle_leaves_flag_unchanged() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;

        // Same sequence the handler runs: the update only happens once the
        // flag has parsed as a real boolean.
        let err = parse_accept_flag(&json!({ "acceptMessages": "yes" })).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let account = accounts::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert!(account.is_accepting_messages);
    }
}
