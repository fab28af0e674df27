use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use tracing::warn;

use crate::claims::Claims;
use crate::error::{AuthCause, AuthError, AuthResult};
use crate::verifier::TokenVerifier;

/// Extracts verified Clerk claims from the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub token: String,
}

impl AuthContext {
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let header_value = parts.headers.get(AUTHORIZATION).ok_or_else(|| {
            warn!("request rejected: authorization header missing");
            AuthError::from(AuthCause::MissingAuthorization)
        })?;

        let token = parse_bearer(header_value)?;
        let claims = verifier.authenticate(&token, None).await?;

        Ok(Self { claims, token })
    }
}

fn parse_bearer(value: &axum::http::HeaderValue) -> AuthResult<String> {
    let raw = value.to_str().map_err(|_| {
        warn!("request rejected: authorization header not valid UTF-8");
        AuthError::from(AuthCause::InvalidAuthorization)
    })?;

    let token = raw
        .trim()
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            warn!("request rejected: authorization header is not a bearer credential");
            AuthError::from(AuthCause::InvalidAuthorization)
        })?
        .trim();

    if token.is_empty() {
        warn!("request rejected: empty bearer token");
        return Err(AuthError::from(AuthCause::InvalidAuthorization));
    }

    Ok(token.to_owned())
}
