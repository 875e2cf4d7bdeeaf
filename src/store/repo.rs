use sqlx::PgPool;

/// Viewing-history and user-config rows are plain per-user key/value pairs
/// with upsert-by-composite-key semantics; values stay opaque JSON.

pub async fn history_keys(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<String>> {
    let keys = sqlx::query_scalar::<_, String>(
        r#"
        SELECT key FROM viewing_history
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(keys)
}

pub async fn get_history(
    db: &PgPool,
    user_id: i64,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let data = sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        SELECT data FROM viewing_history
        WHERE user_id = $1 AND key = $2
        "#,
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(db)
    .await?;
    Ok(data)
}

pub async fn upsert_history(
    db: &PgPool,
    user_id: i64,
    key: &str,
    data: &serde_json::Value,
) -> anyhow::Result<()> {
    // Re-saving re-stamps created_at so the key surfaces first in the
    // recency-ordered keys list.
    sqlx::query(
        r#"
        INSERT INTO viewing_history (user_id, key, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, key)
        DO UPDATE SET data = EXCLUDED.data, created_at = now()
        "#,
    )
    .bind(user_id)
    .bind(key)
    .bind(data)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn get_config(
    db: &PgPool,
    user_id: i64,
    config_key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let value = sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        SELECT config_value FROM user_configs
        WHERE user_id = $1 AND config_key = $2
        "#,
    )
    .bind(user_id)
    .bind(config_key)
    .fetch_optional(db)
    .await?;
    Ok(value)
}

pub async fn upsert_config(
    db: &PgPool,
    user_id: i64,
    config_key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_configs (user_id, config_key, config_value)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, config_key)
        DO UPDATE SET config_value = EXCLUDED.config_value, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(config_key)
    .bind(value)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use serde_json::json;

    async fn seed_user(db: &PgPool, username: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, password_hash) VALUES ($1, 'x') RETURNING id",
        )
        .bind(username)
        .fetch_one(db)
        .await
        .expect("seed user")
    }

    #[sqlx::test]
    async fn config_round_trip_is_per_user(pool: PgPool) {
        let alice = seed_user(&pool, "alice@example.com").await;
        let bob = seed_user(&pool, "bob@example.com").await;
        let value = json!({"quality": "1080p", "subtitles": true});

        upsert_config(&pool, alice, "player", &value)
            .await
            .expect("upsert");

        let stored = get_config(&pool, alice, "player")
            .await
            .expect("get own config")
            .expect("config exists");
        assert_eq!(stored, value);

        assert!(get_config(&pool, bob, "player")
            .await
            .expect("get other user's config")
            .is_none());
    }

    #[sqlx::test]
    async fn history_is_per_user(pool: PgPool) {
        let alice = seed_user(&pool, "alice@example.com").await;
        let bob = seed_user(&pool, "bob@example.com").await;

        upsert_history(&pool, alice, "show-42", &json!({"episode": 3}))
            .await
            .expect("upsert");

        assert!(get_history(&pool, alice, "show-42")
            .await
            .expect("get own entry")
            .is_some());
        assert!(get_history(&pool, bob, "show-42")
            .await
            .expect("get other user's entry")
            .is_none());
        assert!(history_keys(&pool, bob).await.expect("bob keys").is_empty());
    }

    #[sqlx::test]
    async fn resaved_key_surfaces_first(pool: PgPool) {
        let user = seed_user(&pool, "alice@example.com").await;

        upsert_history(&pool, user, "show-a", &json!({"episode": 1}))
            .await
            .expect("save a");
        upsert_history(&pool, user, "show-b", &json!({"episode": 1}))
            .await
            .expect("save b");
        upsert_history(&pool, user, "show-a", &json!({"episode": 2}))
            .await
            .expect("resave a");

        let keys = history_keys(&pool, user).await.expect("keys");
        assert_eq!(keys, vec!["show-a".to_string(), "show-b".to_string()]);

        let data = get_history(&pool, user, "show-a")
            .await
            .expect("get")
            .expect("entry exists");
        assert_eq!(data, json!({"episode": 2}));
    }
}
