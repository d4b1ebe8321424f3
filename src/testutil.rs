use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

/// Fresh in-memory database per test. One connection, so every query sees the
/// same memory store.
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::init(&pool).await.unwrap();
    pool
}

/// Register and verify an account, returning its id.
pub(crate) async fn register_verified(pool: &SqlitePool, username: &str, email: &str) -> String {
    let code = crate::accounts::register(pool, username, email, "hash")
        .await
        .unwrap();
    crate::accounts::verify(pool, username, &code).await.unwrap();

    crate::accounts::find_by_username(pool, username)
        .await
        .unwrap()
        .unwrap()
        .id
}
