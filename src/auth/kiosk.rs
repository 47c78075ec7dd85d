use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::auth::password::verify_password;
use crate::core::ledger::PunchRejection;
use crate::utils::user_cache::{self, KioskUser};
use crate::utils::username_filter;

pub enum KioskAuthError {
    Rejected(PunchRejection),
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for KioskAuthError {
    fn from(e: sqlx::Error) -> Self {
        KioskAuthError::Storage(e)
    }
}

async fn fetch_user(pool: &MySqlPool, username: &str) -> Result<Option<KioskUser>, sqlx::Error> {
    sqlx::query_as::<_, KioskUser>(
        r#"
        SELECT id, username, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Credential check for anonymous kiosk punches, before any state-machine
/// evaluation. Order: cuckoo-filter fast negative, moka cache, database.
/// A cache hit whose hash no longer verifies is refetched once in case the
/// password changed inside the cache TTL.
pub async fn verify_punch_credentials(
    username: &str,
    password: &str,
    pool: &MySqlPool,
) -> Result<KioskUser, KioskAuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(KioskAuthError::Rejected(PunchRejection::MissingCredentials));
    }

    if !username_filter::might_exist(username) {
        debug!(username, "Kiosk username bounced by filter");
        return Err(KioskAuthError::Rejected(PunchRejection::InvalidCredentials));
    }

    let mut from_cache = true;
    let user = match user_cache::get(username).await {
        Some(user) => user,
        None => {
            from_cache = false;
            match fetch_user(pool, username).await? {
                Some(user) => {
                    username_filter::insert(&user.username);
                    user_cache::put(user.clone()).await;
                    user
                }
                None => {
                    info!(username, "Kiosk auth failed: user not found");
                    return Err(KioskAuthError::Rejected(PunchRejection::InvalidCredentials));
                }
            }
        }
    };

    let user = if verify_password(password, &user.password).is_ok() {
        user
    } else if from_cache {
        // Stale hash? Retry against the database once.
        user_cache::invalidate(username).await;
        match fetch_user(pool, username).await? {
            Some(fresh) if verify_password(password, &fresh.password).is_ok() => {
                user_cache::put(fresh.clone()).await;
                fresh
            }
            _ => {
                info!(username, "Kiosk auth failed: password mismatch");
                return Err(KioskAuthError::Rejected(PunchRejection::InvalidCredentials));
            }
        }
    } else {
        info!(username, "Kiosk auth failed: password mismatch");
        return Err(KioskAuthError::Rejected(PunchRejection::InvalidCredentials));
    };

    if user.employee_id.is_none() {
        return Err(KioskAuthError::Rejected(PunchRejection::UserNotEligible));
    }

    debug!(user_id = user.id, role_id = user.role_id, "Kiosk credentials verified");
    Ok(user)
}
