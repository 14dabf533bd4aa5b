use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::Users,
    error::AppError,
    models::ROLE_ADMIN,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden("Admin access only".into()));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

/// Where the bearer credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Authorization,
    XAuthToken,
    XAccessToken,
    Query,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Look for a credential in the `Authorization` header, then `x-auth-token`,
/// then `x-access-token`, then the `token` query parameter.
pub fn extract_token(parts: &Parts) -> Option<(String, TokenSource)> {
    let header_value = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    if let Some(bearer) = header_value(header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer ").map(|t| t.trim().to_string()))
        .filter(|token| !token.is_empty())
    {
        return Some((bearer, TokenSource::Authorization));
    }
    if let Some(token) = header_value("x-auth-token") {
        return Some((token, TokenSource::XAuthToken));
    }
    if let Some(token) = header_value("x-access-token") {
        return Some((token, TokenSource::XAccessToken));
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.trim().is_empty())
        .map(|token| (token, TokenSource::Query))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let (token, source) = extract_token(parts).ok_or_else(|| {
            tracing::warn!(path = %path, "auth failed: no token");
            AppError::Unauthorized("No token, access denied".into())
        })?;

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            tracing::warn!(path = %path, source = ?source, error = %err, "auth failed: invalid token");
            AppError::Unauthorized("Invalid token".into())
        })?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

        let user = Users::find_by_id(user_id).one(&state.orm).await?;
        let user = match user {
            Some(u) => u,
            None => {
                tracing::warn!(path = %path, source = ?source, "auth failed: user not found");
                return Err(AppError::Unauthorized("User not found".into()));
            }
        };

        Ok(AuthUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
    }
}
