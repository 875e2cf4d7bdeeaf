use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::error::AppError;

/// Access-token guard: verifies the Bearer token before the handler runs and
/// injects the caller's identity.
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Auth)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AppError::Auth)?;

        let claims = keys.verify_access(token).map_err(|_| {
            warn!("invalid or expired access token");
            AppError::Auth
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}

/// Source IP for rate limiting: first X-Forwarded-For entry, then X-Real-IP,
/// then the peer address.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Ok(ClientIp(first.to_string()));
                }
            }
        }

        if let Some(real_ip) = parts
            .headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Ok(ClientIp(real_ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn client_ip(req: Request<()>) -> String {
        let (mut parts, _) = req.into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        ip
    }

    #[tokio::test]
    async fn forwarded_for_takes_first_entry() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .expect("request");
        assert_eq!(client_ip(req).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn real_ip_used_when_no_forwarded_for() {
        let req = Request::builder()
            .header("x-real-ip", "198.51.100.4")
            .body(())
            .expect("request");
        assert_eq!(client_ip(req).await, "198.51.100.4");
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let mut req = Request::builder().body(()).expect("request");
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:4242".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_ip(req).await, "192.0.2.9");
    }

    #[tokio::test]
    async fn rejects_missing_bearer_header() {
        use crate::state::AppState;
        let state = AppState::fake();
        let req = Request::builder().body(()).expect("request");
        let (mut parts, _) = req.into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, AppError::Auth));
    }

    #[tokio::test]
    async fn rejects_refresh_token_as_access() {
        use crate::auth::jwt::JwtKeys;
        use crate::state::AppState;
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let refresh = keys.sign_refresh(3, "a@b.com").expect("sign refresh");
        let req = Request::builder()
            .header("authorization", format!("Bearer {refresh}"))
            .body(())
            .expect("request");
        let (mut parts, _) = req.into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, AppError::Auth));
    }

    #[tokio::test]
    async fn accepts_valid_access_token() {
        use crate::auth::jwt::JwtKeys;
        use crate::state::AppState;
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(11, "viewer@example.com").expect("sign access");
        let req = Request::builder()
            .header("authorization", format!("Bearer {token}"))
            .body(())
            .expect("request");
        let (mut parts, _) = req.into_parts();
        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("should accept");
        assert_eq!(user.user_id, 11);
        assert_eq!(user.username, "viewer@example.com");
    }
}
