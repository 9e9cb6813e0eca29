use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::types::{NewProfile, Profile, ProfilePatch};

/// GET /fetch-user-data - the caller's own profile
pub async fn fetch_user_data(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.profiles.fetch(&identity.uid).await?;
    Ok(Json(profile))
}

/// PUT /update-user-data - merge a partial update into the caller's profile
///
/// ```json
/// { "firstName": "Jane", "age": null }
/// ```
///
/// Responds with the full document as re-read after the write. The body `id`
/// is checked against the caller before anything else about the body.
pub async fn update_user_data(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Profile>, ApiError> {
    let Json(body) = body?;
    if ProfilePatch::claims_other_identity(&body, &identity.uid) {
        tracing::warn!("Rejected update for '{}': body id does not match", identity.uid);
        return Err(ApiError::IdentityMismatch);
    }
    let patch = ProfilePatch::from_value(body).map_err(ApiError::invalid_payload)?;

    let profile = state.profiles.update(&identity.uid, patch).await?;
    Ok(Json(profile))
}

/// POST /create-user-data - write the initial profile right after sign-up.
/// The document id and email come from the verified token.
pub async fn create_user_data(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let Json(body) = body?;
    if !body.is_object() {
        return Err(ApiError::invalid_payload("Request body must be a JSON object"));
    }
    let initial: NewProfile =
        serde_json::from_value(body).map_err(|e| ApiError::invalid_payload(e.to_string()))?;

    let profile = state
        .profiles
        .create(&identity.uid, identity.email.clone(), initial)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}
