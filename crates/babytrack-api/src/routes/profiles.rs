use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use babytrack_core::wire::{DeleteResponse, ProfileRequest, ProfileView};
use babytrack_core::{BabyProfile, CoreError, Id, UserRecord, WriteMode};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::routes::{owned_profile, parse_id};
use crate::state::AppState;

/// GET /profiles
///
/// Returns the caller's profiles sorted by name.
pub async fn list_profiles_handler(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
    let mut profiles = state.store.list_profiles(&user.user_id).await?;
    profiles.sort_by(|a, b| {
        a.name
            .trim()
            .to_lowercase()
            .cmp(&b.name.trim().to_lowercase())
            .then_with(|| a.baby_id.cmp(&b.baby_id))
    });
    Ok(Json(profiles.iter().map(ProfileView::from).collect()))
}

/// POST /profiles
///
/// Creates a profile owned by the caller and records the caller in the
/// users table.
pub async fn create_profile_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProfileView>), ApiError> {
    let Json(request) = body?;
    let name = babytrack_core::schema::validate_name(&request.name).map_err(CoreError::from)?;
    let now = Utc::now();

    state
        .store
        .upsert_user(&UserRecord {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            created_at: now,
            last_seen_at: now,
        })
        .await?;

    let profile = BabyProfile {
        user_id: user.user_id.clone(),
        baby_id: Id::generate("baby", now),
        name,
        birthday: request.birthday,
        created_at: now,
        updated_at: None,
    };
    state.store.put_profile(&profile, WriteMode::Create).await?;

    info!(user = %user.user_id, profile = %profile.baby_id, "created profile");
    Ok((StatusCode::CREATED, Json(ProfileView::from(&profile))))
}

/// GET /profiles/{profile_id}
pub async fn get_profile_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(profile_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile_id = parse_id(&profile_id)?;
    let profile = owned_profile(&state, &user, &profile_id).await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// PUT /profiles/{profile_id}
///
/// Replaces the name and birthday of an existing profile.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(profile_id): Path<String>,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile_id = parse_id(&profile_id)?;
    let Json(request) = body?;
    let name = babytrack_core::schema::validate_name(&request.name).map_err(CoreError::from)?;

    let existing = owned_profile(&state, &user, &profile_id).await?;
    let profile = BabyProfile {
        name,
        birthday: request.birthday,
        updated_at: Some(Utc::now()),
        ..existing
    };
    state.store.put_profile(&profile, WriteMode::Replace).await?;

    Ok(Json(ProfileView::from(&profile)))
}

/// DELETE /profiles/{profile_id}
///
/// Deletes the profile together with its tracker entries and the caller's
/// custom checklist items for it.
pub async fn delete_profile_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(profile_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let profile_id = parse_id(&profile_id)?;
    owned_profile(&state, &user, &profile_id).await?;

    let entries = state.store.list_entries(&profile_id, None).await?;
    let mut removed_entries = 0;
    for entry in &entries {
        match state.store.delete_entry(&profile_id, &entry.entry_id).await {
            Ok(()) => removed_entries += 1,
            // Already gone: a concurrent delete got there first.
            Err(CoreError::NotFound(_)) => {
                warn!(entry = %entry.entry_id, "entry vanished during cascade delete");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let custom_items = state
        .store
        .list_checklist(&user.user_id)
        .await?
        .into_iter()
        .filter(|r| r.is_custom() && r.profile_id.as_ref() == Some(&profile_id));
    for record in custom_items {
        match state
            .store
            .delete_checklist_record(&user.user_id, &record.item_id)
            .await
        {
            Ok(()) | Err(CoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    state.store.delete_profile(&user.user_id, &profile_id).await?;

    info!(
        user = %user.user_id,
        profile = %profile_id,
        removed_entries,
        "deleted profile"
    );
    Ok(Json(DeleteResponse {
        deleted: true,
        id: profile_id,
        removed_entries: Some(removed_entries),
    }))
}
