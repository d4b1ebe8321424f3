use tower_sessions::Session;

use crate::appresult::{ApiError, ApiResult};

pub const ACCOUNT_ID: &str = "account_id";

/// The authenticated identity behind a request. Handlers resolve it once from
/// the session and pass it into whatever they touch; nothing below the
/// handler layer reads ambient session state.
pub struct Principal {
    pub account_id: String,
}

pub async fn principal(session: &Session) -> ApiResult<Principal> {
    match session.get::<String>(ACCOUNT_ID).await? {
        Some(account_id) => Ok(Principal { account_id }),
        None => Err(ApiError::not_authenticated()),
    }
}
