use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: i64,
    pub max_login: i64,
    pub max_register: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub threshold: i32,
    pub lock_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub lockout: LockoutConfig,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            // Two distinct secrets so an access token can never pass as a
            // refresh token even if one of them leaks.
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "streamvault".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "streamvault-users".into()),
            access_ttl_minutes: env_i64("ACCESS_TTL_MINUTES", 5),
            refresh_ttl_days: env_i64("REFRESH_TTL_DAYS", 7),
        };
        let rate_limit = RateLimitConfig {
            window_secs: env_i64("RATE_WINDOW_SECS", 60),
            max_login: env_i64("RATE_MAX_LOGIN", 5),
            max_register: env_i64("RATE_MAX_REGISTER", 3),
        };
        let lockout = LockoutConfig {
            threshold: env_i32("LOCKOUT_THRESHOLD", 5),
            lock_minutes: env_i32("LOCKOUT_MINUTES", 30),
        };
        Ok(Self {
            database_url,
            jwt,
            rate_limit,
            lockout,
        })
    }
}
