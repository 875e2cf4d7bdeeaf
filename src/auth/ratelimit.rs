use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::RateLimitConfig;

/// Action class for per-IP throttling; login and register carry separate
/// ceilings over the same sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Login,
    Register,
}

/// Sliding-window check for one source IP. Stale audit rows are purged on
/// every call, so the table self-trims without a background sweeper; the purge
/// races safely across concurrent requests.
///
/// Half-open window: a row exactly at the window start is excluded (strict `>`).
pub async fn check_rate_limit(
    db: &PgPool,
    config: &RateLimitConfig,
    ip: &str,
    kind: AttemptKind,
) -> anyhow::Result<bool> {
    let window_start = OffsetDateTime::now_utc() - Duration::seconds(config.window_secs);

    sqlx::query("DELETE FROM login_attempts WHERE attempt_time < $1")
        .bind(window_start)
        .execute(db)
        .await?;

    let limit = match kind {
        AttemptKind::Login => config.max_login,
        AttemptKind::Register => config.max_register,
    };

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM login_attempts
        WHERE ip_address = $1 AND attempt_time > $2
        "#,
    )
    .bind(ip)
    .bind(window_start)
    .fetch_one(db)
    .await?;

    debug!(ip, kind = ?kind, count, limit, "rate limit checked");
    Ok(count < limit)
}

/// Append one audit row. Called on every register/login attempt regardless of
/// outcome; these rows feed the next window's count.
pub async fn record_attempt(
    db: &PgPool,
    ip: &str,
    username: Option<&str>,
    success: bool,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO login_attempts (ip_address, username, success)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(ip)
    .bind(username)
    .bind(success)
    .execute(db)
    .await?;
    Ok(())
}
