use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// JWT Claims
// ============================================================================

/// Tokens are issued by the account service; this API only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    pub sub: Uuid,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Missing,
    #[error("Invalid or expired token")]
    InvalidToken,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::AuthenticationError(err.to_string())
    }
}

pub fn issue_token(secret: &str, user_id: Uuid, ttl_seconds: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = UserClaims {
        sub: user_id,
        exp: (Utc::now() + Duration::seconds(ttl_seconds as i64)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

fn verify(secret: &str, token: &str) -> Result<UserClaims, AuthError> {
    decode::<UserClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
}

// ============================================================================
// Identification Middleware
// ============================================================================

/// Attaches `UserClaims` when a bearer token is present.
/// Anonymous requests pass through; a bad token is rejected outright.
pub async fn identify_user(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() {
        match verify(&state.auth.secret, bearer.token()) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(err) => {
                tracing::debug!("rejected bearer token: {}", err);
                return AppError::from(err).into_response();
            }
        }
    }

    next.run(req).await
}

// ============================================================================
// Extractors
// ============================================================================

/// An authenticated user. Rejects with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserClaims>()
            .map(|claims| AuthUser(claims.sub))
            .ok_or_else(|| AuthError::Missing.into())
    }
}

/// The authenticated user, if any.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<UserClaims>().map(|claims| claims.sub)))
    }
}
