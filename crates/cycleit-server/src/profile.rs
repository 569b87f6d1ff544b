//! The caller's own profile, avatar and dashboard counters.

use axum::{extract::Multipart, extract::State, Json};
use tracing::info;

use cycleit_shared::listing::avatar_object_key;
use cycleit_shared::protocol::{AvatarUploaded, ProfileUpdate};
use cycleit_shared::Bucket;
use cycleit_store::{DashboardStats, Profile};

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;
use crate::multipart::FormData;

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Profile>, ServerError> {
    Ok(Json(state.db()?.get_profile(user.user_id)?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ServerError> {
    let update = normalize(update)?;
    let profile = state.db()?.update_profile(user.user_id, &update)?;
    info!(user = %user.user_id, "profile updated");
    Ok(Json(profile))
}

fn normalize(update: ProfileUpdate) -> Result<ProfileUpdate, ServerError> {
    let username = update.username.trim().to_string();
    if username.is_empty() {
        return Err(ServerError::BadRequest("username is required".into()));
    }
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(ProfileUpdate {
        username,
        full_name: clean(update.full_name),
        bio: clean(update.bio),
        location: clean(update.location),
    })
}

/// Replace the caller's avatar with the `file` part of the form.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<AvatarUploaded>, ServerError> {
    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_files("file")
        .into_iter()
        .next()
        .ok_or_else(|| ServerError::BadRequest("Missing 'file' field in multipart form".into()))?;
    if !file.looks_like_image() {
        return Err(ServerError::BadRequest("avatar must be an image".into()));
    }

    let key = avatar_object_key(user.user_id, &file.file_name);
    state
        .blob_store
        .put(Bucket::Avatars, &key, &file.data, true)
        .await?;

    let avatar_url = state.blob_store.public_url(Bucket::Avatars, &key);
    state.db()?.set_avatar_url(user.user_id, &avatar_url)?;

    info!(user = %user.user_id, size = file.data.len(), "avatar updated");
    Ok(Json(AvatarUploaded { avatar_url }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DashboardStats>, ServerError> {
    Ok(Json(state.db()?.dashboard_stats(user.user_id)?))
}
