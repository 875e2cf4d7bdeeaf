use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;

/// SHA-256 digest of a raw refresh token; the raw value never touches the
/// database, only the digest is stored and looked up.
pub fn token_digest(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// One outstanding refresh credential. Rows are never deleted, only flagged
/// revoked, to keep the audit trail.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRow {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub revoked: bool,
}

/// Revoke every prior non-revoked token for the user and insert the new
/// digest in one transaction: at most one active refresh session per account.
pub async fn persist_refresh_token(
    db: &PgPool,
    user_id: i64,
    token: &str,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;

    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE user_id = $1 AND revoked = FALSE
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(token_digest(token))
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!(user_id, superseded = revoked, "refresh token persisted");
    Ok(())
}

/// Stateful half of refresh validation: the digest must match a non-revoked,
/// unexpired row. This is what makes logout and rotation actually effective.
pub async fn find_active(db: &PgPool, token: &str) -> anyhow::Result<Option<RefreshTokenRow>> {
    let row = sqlx::query_as::<_, RefreshTokenRow>(
        r#"
        SELECT id, user_id, token_hash, created_at, expires_at, revoked
        FROM refresh_tokens
        WHERE token_hash = $1 AND revoked = FALSE AND expires_at > now()
        "#,
    )
    .bind(token_digest(token))
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Flag every refresh token for the user revoked (logout).
pub async fn revoke_all(db: &PgPool, user_id: i64) -> anyhow::Result<u64> {
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE user_id = $1 AND revoked = FALSE
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();
    debug!(user_id, revoked, "refresh tokens revoked");
    Ok(revoked)
}
