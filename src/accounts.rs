use rand::Rng;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::appresult::{ApiError, ApiResult};

pub const CODE_TTL: Duration = Duration::hours(1);

const TAKEN: &str = "Username is already taken";
const EMAIL_TAKEN: &str = "An account with this email already exists";

/// One registered user. Credential material and the pending verification code
/// never leave the server, so they are skipped when the record is serialized
/// into a response.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verify_code: Option<String>,
    #[serde(skip_serializing)]
    pub verify_code_expiry: Option<OffsetDateTime>,
    pub is_accepting_messages: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, username, email, password_hash, is_verified, \
     verify_code, verify_code_expiry, is_accepting_messages, created_at";

pub fn issue_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM accounts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM accounts WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Several unverified registrations may share a username; the verified holder
/// wins, otherwise the newest pending claim (its code is the one last mailed).
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM accounts WHERE username = ?
         ORDER BY is_verified DESC, created_at DESC LIMIT 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Sign-in lookup: the identifier may be an email or a username. Emails are
/// stored lowercased, so the email comparison folds case; usernames stay
/// case-sensitive.
pub async fn find_by_identifier(
    pool: &SqlitePool,
    identifier: &str,
) -> sqlx::Result<Option<Account>> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM accounts WHERE email = ? OR username = ?
         ORDER BY is_verified DESC, created_at DESC LIMIT 1"
    ))
    .bind(identifier.to_lowercase())
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

/// First half of the verification state machine: create or refresh an
/// unverified account and issue a fresh code. Returns the code so the caller
/// can mail it. The account stays unverified until `verify` succeeds.
pub async fn register(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> ApiResult<String> {
    let held: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM accounts WHERE username = ? AND is_verified = 1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    if held.is_some() {
        return Err(ApiError::BadRequest(TAKEN.to_owned()));
    }

    let code = issue_code();
    let expiry = OffsetDateTime::now_utc() + CODE_TTL;

    match find_by_email(pool, email).await? {
        Some(existing) if existing.is_verified => {
            Err(ApiError::BadRequest(EMAIL_TAKEN.to_owned()))
        }
        Some(existing) => {
            // Re-registration before verification replaces the pending claim
            // in place; the account keeps its identity.
            let updated = sqlx::query(
                "UPDATE accounts
                 SET username = ?, password_hash = ?, verify_code = ?, verify_code_expiry = ?
                 WHERE id = ? AND is_verified = 0",
            )
            .bind(username)
            .bind(password_hash)
            .bind(&code)
            .bind(expiry)
            .bind(&existing.id)
            .execute(pool)
            .await?;

            if updated.rows_affected() == 0 {
                // Verified out from under us between the read and the update.
                return Err(ApiError::BadRequest(EMAIL_TAKEN.to_owned()));
            }
            Ok(code)
        }
        None => {
            let insert = sqlx::query(
                "INSERT INTO accounts
                 (id, username, email, password_hash, is_verified,
                  verify_code, verify_code_expiry, is_accepting_messages, created_at)
                 VALUES (?, ?, ?, ?, 0, ?, ?, 1, ?)",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(&code)
            .bind(expiry)
            .bind(OffsetDateTime::now_utc())
            .execute(pool)
            .await;

            match insert {
                Ok(_) => Ok(code),
                Err(err) if is_unique_violation(&err) => {
                    Err(ApiError::BadRequest(EMAIL_TAKEN.to_owned()))
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Second half of the state machine. Verification is terminal: a verified
/// account stays verified, and a repeated verify is a no-op success.
pub async fn verify(pool: &SqlitePool, username: &str, code: &str) -> ApiResult<()> {
    let Some(account) = find_by_username(pool, username).await? else {
        return Err(ApiError::NotFound(
            "No account found with this username".to_owned(),
        ));
    };

    if account.is_verified {
        return Ok(());
    }

    let (Some(stored), Some(expiry)) = (account.verify_code.as_deref(), account.verify_code_expiry)
    else {
        return Err(ApiError::BadRequest(
            "No verification code has been issued, please sign up again".to_owned(),
        ));
    };

    if OffsetDateTime::now_utc() > expiry {
        return Err(ApiError::BadRequest(
            "Verification code has expired, please sign up again to receive a new one".to_owned(),
        ));
    }

    if code != stored {
        return Err(ApiError::BadRequest(
            "Incorrect verification code".to_owned(),
        ));
    }

    // Guarded on the stored code so a stale verify cannot race a
    // re-registration that has already issued a new code.
    let updated = sqlx::query(
        "UPDATE accounts
         SET is_verified = 1, verify_code = NULL, verify_code_expiry = NULL
         WHERE id = ? AND verify_code = ?",
    )
    .bind(&account.id)
    .bind(stored)
    .execute(pool)
    .await;

    match updated {
        Ok(result) if result.rows_affected() == 1 => Ok(()),
        Ok(_) => {
            // Lost a race: either a concurrent verify already flipped the
            // flag (fine) or a re-registration rotated the code.
            match find_by_id(pool, &account.id).await? {
                Some(current) if current.is_verified => Ok(()),
                _ => Err(ApiError::BadRequest(
                    "Incorrect verification code".to_owned(),
                )),
            }
        }
        // Another pending claim on the same username verified first.
        Err(err) if is_unique_violation(&err) => Err(ApiError::BadRequest(TAKEN.to_owned())),
        Err(err) => Err(err.into()),
    }
}

/// Flip the acceptance flag and hand back the updated record in one statement.
pub async fn set_accepting(
    pool: &SqlitePool,
    id: &str,
    accepting: bool,
) -> ApiResult<Account> {
    sqlx::query_as(&format!(
        "UPDATE accounts SET is_accepting_messages = ? WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(accepting)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
