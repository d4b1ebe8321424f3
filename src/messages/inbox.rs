use axum::{
    Json, debug_handler,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    appresult::{ApiError, ApiResult},
    session,
};

use super::Message;

#[debug_handler]
pub(crate) async fn get_messages(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> ApiResult<impl IntoResponse> {
    let principal = session::principal(&session).await?;

    // An empty inbox is a perfectly fine inbox, not an error.
    let messages = list(&db_pool, &principal.account_id).await?;

    Ok(Json(json!({ "success": true, "messages": messages })))
}

#[debug_handler]
pub(crate) async fn delete_message(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(message_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let principal = session::principal(&session).await?;
    delete(&db_pool, &principal.account_id, &message_id).await?;

    Ok(Json(json!({ "success": true, "message": "Message deleted" })))
}

pub(crate) async fn list(pool: &SqlitePool, account_id: &str) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(
        "SELECT id, account_id, content, created_at FROM messages
         WHERE account_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
}

/// Owner predicate in the statement itself: someone else's message id deletes
/// zero rows, same as an unknown or already-deleted id.
pub(crate) async fn delete(
    pool: &SqlitePool,
    account_id: &str,
    message_id: &str,
) -> ApiResult<()> {
    let deleted = sqlx::query("DELETE FROM messages WHERE id = ? AND account_id = ?")
        .bind(message_id)
        .bind(account_id)
        .execute(pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound(
            "Message not found or already deleted".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        messages::send::append,
        testutil::{register_verified, test_pool},
    };

    #[tokio::test]
    async fn empty_inbox_lists_successfully() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;

        assert!(list(&pool, &id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;

        for content in ["first", "second", "third"] {
            append(&pool, "abc", content).await.unwrap();
        }

        let messages = list(&pool, &id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["third", "second", "first"]);
        assert!(messages.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;
        append(&pool, "abc", "one").await.unwrap();
        append(&pool, "abc", "two").await.unwrap();

        let messages = list(&pool, &id).await.unwrap();
        delete(&pool, &id, &messages[0].id).await.unwrap();

        let remaining = list(&pool, &id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "one");

        // Second delete of the same id reports not-found.
        let err = delete(&pool, &id, &messages[0].id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_without_side_effect() {
        let pool = test_pool().await;
        let id = register_verified(&pool, "abc", "a@x.com").await;
        append(&pool, "abc", "keep me").await.unwrap();

        let err = delete(&pool, &id, "no-such-id").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(list(&pool, &id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cannot_delete_someone_elses_message() {
        let pool = test_pool().await;
        let owner = register_verified(&pool, "abc", "a@x.com").await;
        let intruder = register_verified(&pool, "xyz", "b@x.com").await;
        append(&pool, "abc", "private").await.unwrap();

        let target = &list(&pool, &owner).await.unwrap()[0];
        let err = delete(&pool, &intruder, &target.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(list(&pool, &owner).await.unwrap().len(), 1);
    }
}
