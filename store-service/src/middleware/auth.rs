use crate::models::Role;
use crate::services::cart::CartOwner;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use service_core::error::AppError;
use std::str::FromStr;

/// Anonymous carts are keyed by a client-generated session id in this header.
pub const SESSION_HEADER: &str = "x-session-id";

/// Authenticated identity extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing bearer token")))?;

        let claims = state.jwt.verify(&token)?;
        let role = Role::from_str(&claims.role)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("unknown role in token")))?;

        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }
}

/// An authenticated user with the admin role; anything else is a 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden(anyhow::anyhow!("admin role required")));
        }
        Ok(AdminUser(user))
    }
}

/// Cart/order identity: a bearer token when present, otherwise the anonymous
/// session id header. Requests with neither cannot own a cart.
#[derive(Debug, Clone)]
pub struct Shopper(pub CartOwner);

#[async_trait]
impl FromRequestParts<AppState> for Shopper {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_some() {
            let user = AuthUser::from_request_parts(parts, state).await?;
            return Ok(Shopper(CartOwner::User(user.user_id)));
        }

        let session_id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "missing bearer token or {} header",
                    SESSION_HEADER
                ))
            })?;

        Ok(Shopper(CartOwner::Session(session_id.to_string())))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}
