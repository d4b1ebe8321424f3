use axum::{Json, debug_handler, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use uuid::Uuid;

use crate::appresult::{ApiError, ApiResult};

// RFC 3339 with the fractional part forced to full width. The plain formatter
// drops ".0" entirely, and a whole-second stamp would then sort after a
// fractional one from the same second ('.' < 'Z').
const CREATED_AT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageBody {
    username: String,
    content: String,
}

#[debug_handler]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    Json(SendMessageBody { username, content }): Json<SendMessageBody>,
) -> ApiResult<impl IntoResponse> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest(
            "Message content must not be empty".to_owned(),
        ));
    }

    append(&db_pool, username.trim(), content).await?;

    // Nothing about the stored message is echoed back to the sender.
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Message sent" })),
    ))
}

/// The ingestion gate. The append happens in a single conditional insert:
/// a row lands only if the target exists, is verified and is accepting.
/// Unverified accounts are not valid targets and are not revealed to exist.
pub(crate) async fn append(pool: &SqlitePool, username: &str, content: &str) -> ApiResult<()> {
    let appended = sqlx::query(
        "INSERT INTO messages (id, account_id, content, created_at)
         SELECT ?, id, ?, ? FROM accounts
         WHERE username = ? AND is_verified = 1 AND is_accepting_messages = 1",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(content)
    .bind(OffsetDateTime::now_utc().format(CREATED_AT_FORMAT)?)
    .bind(username)
    .execute(pool)
    .await?;

    if appended.rows_affected() == 1 {
        return Ok(());
    }

    let target: Option<(bool,)> = sqlx::query_as(
        "SELECT is_accepting_messages FROM accounts WHERE username = ? AND is_verified = 1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match target {
        None => Err(ApiError::NotFound("User not found".to_owned())),
        Some(_) => Err(ApiError::Forbidden(
            "User is not accepting messages".to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accounts, messages::inbox, testutil::{register_verified, test_pool}};

    #[tokio::test]
    async fn appends_to_verified_accepting_account() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;

        append(&pool, "abc", "hi there").await.unwrap();

        let messages = inbox::list(&pool, &id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi there");
    }

    #[tokio::test]
    async fn unknown_recipient_is_not_found() {
        let pool = test_pool().await;
        let err = append(&pool, "ghost", "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn unverified_recipient_is_not_targetable() {
        let pool = test_pool().await;
        accounts::register(&pool, "abc", "a@x.com", "hash").await.unwrap();

        // Reported identically to a missing account.
        let err = append(&pool, "abc", "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn closed_gate_rejects_and_appends_nothing() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;
        accounts::set_accepting(&pool, &id, false).await.unwrap();

        let err = append(&pool, "abc", "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(inbox::list(&pool, &id).await.unwrap().is_empty());
    }

    #[test]
    fn stored_timestamps_sort_lexicographically() {
        use time::macros::datetime;

        let whole = datetime!(2026-08-26 12:00:00 UTC);
        let fractional = datetime!(2026-08-26 12:00:00.5 UTC);

        let a = whole.format(CREATED_AT_FORMAT).unwrap();
        let b = fractional.format(CREATED_AT_FORMAT).unwrap();
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[tokio::test]
    async fn reopened_gate_accepts_again() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;

        accounts::set_accepting(&pool, &id, false).await.unwrap();
        append(&pool, "abc", "dropped").await.unwrap_err();

        accounts::set_accepting(&pool, &id, true).await.unwrap();
        append(&pool, "abc", "kept").await.unwrap();

        let messages = inbox::list(&pool, &id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "kept");
    }
}
