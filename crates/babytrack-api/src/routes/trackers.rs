use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use babytrack_core::schema::validate_payload;
use babytrack_core::wire::DeleteResponse;
use babytrack_core::{CoreError, Id, TrackerEntry, TrackerType, WriteMode};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::routes::{owned_profile, parse_id, parse_tracker};
use crate::state::AppState;

/// Resolve and authorize the `{profile_id}/trackers/{tracker_type}` prefix.
async fn scope(
    state: &AppState,
    user: &CurrentUser,
    profile_id: &str,
    tracker_type: &str,
) -> Result<(Id, TrackerType), ApiError> {
    let profile_id = parse_id(profile_id)?;
    let tracker = parse_tracker(tracker_type)?;
    owned_profile(state, user, &profile_id).await?;
    Ok((profile_id, tracker))
}

/// Load an entry and check it belongs to `tracker`.
async fn existing_entry(
    state: &AppState,
    profile_id: &Id,
    tracker: TrackerType,
    entry_id: &Id,
) -> Result<TrackerEntry, ApiError> {
    state
        .store
        .get_entry(profile_id, entry_id)
        .await?
        .filter(|e| e.tracker_type == tracker)
        .ok_or_else(|| ApiError::NotFound(format!("{tracker} entry {entry_id} not found")))
}

/// GET /profiles/{profile_id}/trackers/{tracker_type}
///
/// Lists the tracker's entries in creation order.
pub async fn list_entries_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_id, tracker_type)): Path<(String, String)>,
) -> Result<Json<Vec<TrackerEntry>>, ApiError> {
    let (profile_id, tracker) = scope(&state, &user, &profile_id, &tracker_type).await?;
    let entries = state.store.list_entries(&profile_id, Some(tracker)).await?;
    Ok(Json(entries))
}

/// POST /profiles/{profile_id}/trackers/{tracker_type}
///
/// Validates the payload against the tracker's schema and stores a new
/// entry with a generated `<tracker>_...` id. Optional fields sent as
/// `null` are treated as absent and left out of the stored entry; a `null`
/// required field is rejected as missing.
pub async fn create_entry_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_id, tracker_type)): Path<(String, String)>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<TrackerEntry>), ApiError> {
    let (profile_id, tracker) = scope(&state, &user, &profile_id, &tracker_type).await?;
    let Json(body) = body?;
    let fields = validate_payload(tracker, &body).map_err(CoreError::from)?;

    let now = Utc::now();
    let entry = TrackerEntry {
        entry_id: Id::generate(tracker.as_str(), now),
        baby_id: profile_id,
        tracker_type: tracker,
        created_at: now,
        updated_at: None,
        fields,
    };
    state.store.put_entry(&entry, WriteMode::Create).await?;

    info!(profile = %entry.baby_id, entry = %entry.entry_id, "created entry");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /profiles/{profile_id}/trackers/{tracker_type}/{entry_id}
pub async fn get_entry_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_id, tracker_type, entry_id)): Path<(String, String, String)>,
) -> Result<Json<TrackerEntry>, ApiError> {
    let (profile_id, tracker) = scope(&state, &user, &profile_id, &tracker_type).await?;
    let entry_id = parse_id(&entry_id)?;
    let entry = existing_entry(&state, &profile_id, tracker, &entry_id).await?;
    Ok(Json(entry))
}

/// PUT /profiles/{profile_id}/trackers/{tracker_type}/{entry_id}
///
/// Replaces the payload of an existing entry. Ids and `createdAt` are kept.
pub async fn update_entry_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_id, tracker_type, entry_id)): Path<(String, String, String)>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<TrackerEntry>, ApiError> {
    let (profile_id, tracker) = scope(&state, &user, &profile_id, &tracker_type).await?;
    let entry_id = parse_id(&entry_id)?;
    let Json(body) = body?;
    let fields = validate_payload(tracker, &body).map_err(CoreError::from)?;

    let existing = existing_entry(&state, &profile_id, tracker, &entry_id).await?;
    let entry = TrackerEntry {
        updated_at: Some(Utc::now()),
        fields,
        ..existing
    };
    state.store.put_entry(&entry, WriteMode::Replace).await?;

    Ok(Json(entry))
}

/// DELETE /profiles/{profile_id}/trackers/{tracker_type}/{entry_id}
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_id, tracker_type, entry_id)): Path<(String, String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let (profile_id, tracker) = scope(&state, &user, &profile_id, &tracker_type).await?;
    let entry_id = parse_id(&entry_id)?;
    existing_entry(&state, &profile_id, tracker, &entry_id).await?;
    state.store.delete_entry(&profile_id, &entry_id).await?;

    info!(profile = %profile_id, entry = %entry_id, "deleted entry");
    Ok(Json(DeleteResponse {
        deleted: true,
        id: entry_id,
        removed_entries: None,
    }))
}
