pub mod accounts;
pub mod appresult;
pub mod auth;
pub mod db;
pub mod email;
pub mod messages;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::email::Mailer;

pub use appresult::{ApiError, ApiResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub mailer: Mailer,
}
