use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookie,
        dto::{
            AuthResponse, CheckUsernameRequest, CheckUsernameResponse, LoginRequest,
            MessageResponse, ProfileResponse, PublicUser, RegisterRequest,
        },
        extractors::{AuthUser, ClientIp},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        ratelimit::{self, AttemptKind},
        repo::{is_unique_violation, violated_constraint, User},
        tokens,
        validate::{is_valid_email, validate_password, validate_username},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/check-username", post(check_username))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
}

/// Mint the access/refresh pair for a freshly authenticated user. Persisting
/// the refresh digest revokes any prior session for the account.
async fn issue_session(
    db: &PgPool,
    keys: &JwtKeys,
    user: &User,
) -> anyhow::Result<(String, HeaderValue)> {
    let access_token = keys.sign_access(user.id, &user.username)?;
    let refresh_token = keys.sign_refresh(user.id, &user.username)?;
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::seconds(keys.refresh_ttl.as_secs() as i64);
    tokens::persist_refresh_token(db, user.id, &refresh_token, expires_at).await?;
    let set_cookie = cookie::refresh_cookie(&refresh_token, keys.refresh_ttl.as_secs())
        .map_err(|e| anyhow::anyhow!("build refresh cookie: {e}"))?;
    Ok((access_token, set_cookie))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    let username = payload.username.trim().to_string();
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    validate_username(&username).map_err(|msg| AppError::Validation(msg.into()))?;
    validate_password(&payload.password).map_err(|msg| AppError::Validation(msg.into()))?;
    if let Some(ref email) = email {
        if !is_valid_email(email) {
            return Err(AppError::Validation("invalid email address".into()));
        }
    }

    if !ratelimit::check_rate_limit(&state.db, &state.config.rate_limit, &ip, AttemptKind::Register)
        .await?
    {
        warn!(%ip, "register rate limited");
        return Err(AppError::RateLimited);
    }

    if User::find_by_username(&state.db, &username).await?.is_some() {
        ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
        return Err(AppError::Conflict("username already taken".into()));
    }
    if let Some(ref email) = email {
        if User::find_by_email(&state.db, email).await?.is_some() {
            ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
            return Err(AppError::Conflict("email already in use".into()));
        }
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(&state.db, &username, email.as_deref(), &hash).await {
        Ok(user) => user,
        // Races with a concurrent registration surface as unique violations;
        // the constraint name tells which identity collided.
        Err(err) if is_unique_violation(&err) => {
            ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
            let message = if violated_constraint(&err).is_some_and(|c| c.contains("email")) {
                "email already in use"
            } else {
                "username already taken"
            };
            return Err(AppError::Conflict(message.into()));
        }
        Err(err) => return Err(err.into()),
    };

    ratelimit::record_attempt(&state.db, &ip, Some(&username), true).await?;

    let keys = JwtKeys::from_ref(&state);
    let (token, set_cookie) = issue_session(&state.db, &keys, &user).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, set_cookie);

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "username and password must not be empty".into(),
        ));
    }

    if !ratelimit::check_rate_limit(&state.db, &state.config.rate_limit, &ip, AttemptKind::Login)
        .await?
    {
        warn!(%ip, "login rate limited");
        return Err(AppError::RateLimited);
    }

    let Some(user) = User::find_by_username(&state.db, &username).await? else {
        // Same generic error as a bad password, so usernames cannot be probed.
        ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
        return Err(AppError::Auth);
    };

    if !user.is_active {
        ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
        return Err(AppError::Forbidden);
    }

    // Lock expiry is evaluated lazily here; a rejected attempt while locked
    // neither increments the counter nor writes an audit row.
    if let Some(locked_until) = user.locked_until {
        if locked_until > OffsetDateTime::now_utc() {
            warn!(user_id = user.id, %locked_until, "login while locked");
            return Err(AppError::Locked);
        }
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        let (attempts, locked_until) =
            User::record_login_failure(&state.db, user.id, &state.config.lockout).await?;
        if let Some(locked_until) = locked_until {
            warn!(user_id = user.id, attempts, %locked_until, "account locked");
        }
        ratelimit::record_attempt(&state.db, &ip, Some(&username), false).await?;
        return Err(AppError::Auth);
    }

    User::reset_login_state(&state.db, user.id).await?;
    ratelimit::record_attempt(&state.db, &ip, Some(&username), true).await?;

    let keys = JwtKeys::from_ref(&state);
    let (token, set_cookie) = issue_session(&state.db, &keys, &user).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, set_cookie);

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok((
        headers,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn check_username(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<CheckUsernameRequest>,
) -> Result<Json<CheckUsernameResponse>, AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if username.chars().count() < 5 {
        return Err(AppError::Validation(
            "username must be at least 5 characters".into(),
        ));
    }

    if !ratelimit::check_rate_limit(&state.db, &state.config.rate_limit, &ip, AttemptKind::Register)
        .await?
    {
        return Err(AppError::RateLimited);
    }

    let exists = User::username_exists(&state.db, &username).await?;
    Ok(Json(CheckUsernameResponse {
        username,
        available: !exists,
    }))
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, AppError> {
    // The side channel is the only accepted transport for refresh tokens.
    let token = cookie::extract_refresh_token(&headers).ok_or(AppError::Auth)?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&token).map_err(|_| AppError::Auth)?;

    // Signature alone is not enough: the digest must still be live in the
    // store. Logout and supersession both flip it revoked.
    let Some(record) = tokens::find_active(&state.db, &token).await? else {
        warn!(user_id = claims.sub, "refresh with revoked or unknown token");
        return Err(AppError::Auth);
    };
    if record.user_id != claims.sub {
        warn!(user_id = claims.sub, "refresh token owner mismatch");
        return Err(AppError::Auth);
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AppError::Auth)?;

    // The refresh token itself is not rotated here; only a new login or
    // registration re-mints it.
    let token = keys
        .sign_access(user.id, &user.username)
        .map_err(AppError::Internal)?;

    info!(user_id = user.id, "access token refreshed");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, auth))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    tokens::revoke_all(&state.db, auth.user_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie::clear_refresh_cookie());

    info!(user_id = auth.user_id, "user logged out");
    Ok((headers, Json(MessageResponse { message: "logged out" })))
}

#[instrument(skip(state, auth))]
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    Ok(Json(ProfileResponse {
        user: (&user).into(),
    }))
}
