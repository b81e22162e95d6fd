use crate::{
    error::AppError,
    models::{user, User},
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        jwt::decode_jwt,
    },
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Identity the token resolved to. The voting layer trusts this value;
/// it never authenticates on its own.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Required authentication.
///
/// Accepts an access token from the Authorization header or the HttpOnly
/// cookie, and rejects unless it maps to a live (not soft-deleted) user.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_user(&db, &headers)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Optional authentication.
///
/// Same resolution as [`auth_middleware`], but an absent or invalid token
/// lets the request through anonymously instead of rejecting it.
pub async fn optional_auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Ok(Some(auth_user)) = resolve_user(&db, &headers).await {
        request.extensions_mut().insert(auth_user);
    }
    Ok(next.run(request).await)
}

async fn resolve_user(
    db: &DatabaseConnection,
    headers: &HeaderMap,
) -> Result<Option<AuthUser>, AppError> {
    // Prefer Authorization: Bearer, fallback to HttpOnly cookie.
    let Some(token) =
        extract_bearer_token(headers).or_else(|| extract_cookie(headers, ACCESS_TOKEN_COOKIE))
    else {
        return Ok(None);
    };

    let Ok(claims) = decode_jwt(&token) else {
        return Ok(None);
    };

    if !crate::utils::jwt::is_access_token(&claims) {
        return Ok(None);
    }

    let user_id: i32 = match claims.sub.parse() {
        Ok(id) => id,
        Err(_) => return Ok(None),
    };

    // Token must resolve to a user that still exists.
    let user = User::find_by_id(user_id)
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(user.map(|_| AuthUser {
        user_id: claims.sub,
    }))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Parse user_id from AuthUser string to i32
pub fn parse_user_id(auth_user: &AuthUser) -> crate::error::AppResult<i32> {
    auth_user
        .user_id
        .parse()
        .map_err(|_| AppError::Validation("Invalid user ID".to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor for routes behind [`optional_auth_middleware`]: never
/// rejects, yields `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}
