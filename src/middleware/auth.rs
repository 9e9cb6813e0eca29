use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::auth::{extract_bearer_token, VerifiedIdentity};
use crate::error::ApiError;
use crate::state::AppState;

/// Verified caller identity, attached by [`require_identity`]
#[derive(Clone, Debug)]
pub struct AuthUser(pub VerifiedIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::MissingIdentity)
    }
}

/// Identity-gated request filter.
///
/// No usable bearer header -> 401, verification failure -> 403, both without
/// reaching the inner handler. On success the identity rides in the request
/// extensions.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .map(str::to_owned)
        .map_err(|e| {
            tracing::debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            ApiError::from(e)
        })?;

    let identity = state.verifier.verify(&token).await?;
    tracing::debug!("Verified identity '{}'", identity.uid);

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
