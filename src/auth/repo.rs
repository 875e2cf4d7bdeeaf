use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::config::LockoutConfig;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
    pub login_attempts: i32,
    pub locked_until: Option<OffsetDateTime>,
    pub is_active: bool,
}

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, created_at,
    last_login, login_attempts, locked_until, is_active
"#;

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Case-sensitive exact match, used by the availability check.
    pub async fn username_exists(db: &PgPool, username: &str) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Advance the lockout state after a failed password match. A single
    /// atomic UPDATE computes the new counter and stamps `locked_until` when
    /// the threshold is reached, so concurrent failures cannot lose updates.
    /// Returns the resulting counter and lock expiry.
    pub async fn record_login_failure(
        db: &PgPool,
        user_id: i64,
        lockout: &LockoutConfig,
    ) -> anyhow::Result<(i32, Option<OffsetDateTime>)> {
        let row: (i32, Option<OffsetDateTime>) = sqlx::query_as(
            r#"
            UPDATE users
            SET login_attempts = login_attempts + 1,
                locked_until = CASE
                    WHEN login_attempts + 1 >= $2
                        THEN now() + make_interval(mins => $3)
                    ELSE locked_until
                END
            WHERE id = $1
            RETURNING login_attempts, locked_until
            "#,
        )
        .bind(user_id)
        .bind(lockout.threshold)
        .bind(lockout.lock_minutes)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// The only transition that resets lockout state: successful password
    /// match clears the counter and lock and stamps last-login.
    pub async fn reset_login_state(db: &PgPool, user_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = 0, locked_until = NULL, last_login = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }
}

/// Postgres unique-violation detection, used to map registration races to a
/// conflict instead of an internal error.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Name of the violated constraint, when the database reports one. Lets the
/// caller tell a username collision from an email collision.
pub fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "viewer@example.com".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
            is_active: true,
        };
        let json = serde_json::to_string(&user).expect("serialize user");
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
