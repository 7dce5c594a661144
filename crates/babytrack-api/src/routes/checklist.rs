use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use babytrack_core::checklist::{self, ChecklistView};
use babytrack_core::model::CUSTOM_ITEM_PREFIX;
use babytrack_core::schema::{check_length, validate_name};
use babytrack_core::wire::{
    ChecklistResponse, CustomItemRequest, DeleteResponse, StatusRequest, StatusView,
};
use babytrack_core::{ChecklistRecord, CoreError, Id};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::routes::{owned_profile, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistQuery {
    pub profile_id: Option<String>,
}

/// GET /checklist[?profileId=..]
///
/// The bundled checklist merged with the caller's completion state. With a
/// profile, its custom items are included and `currentWeek` is derived from
/// the profile's date, read as the due date.
pub async fn checklist_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<ChecklistQuery>, QueryRejection>,
) -> Result<Json<ChecklistResponse>, ApiError> {
    let Query(query) = query?;
    let profile = match query.profile_id.as_deref() {
        Some(raw) => Some(owned_profile(&state, &user, &parse_id(raw)?).await?),
        None => None,
    };

    let base = checklist::base_items()?;
    let records = state.store.list_checklist(&user.user_id).await?;
    let items = checklist::merge(&base, &records, profile.as_ref().map(|p| &p.baby_id));
    let current_week = profile
        .as_ref()
        .and_then(|p| checklist::gestational_week(p.birthday, Utc::now().date_naive()));

    Ok(Json(ChecklistResponse {
        current_week,
        items,
    }))
}

/// POST /checklist
///
/// Adds a custom item to one of the caller's profiles.
pub async fn create_custom_item_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CustomItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChecklistView>), ApiError> {
    let Json(request) = body?;
    let week = checklist::validate_week(request.week).map_err(CoreError::from)?;
    let title = validate_name(&request.title)
        .map_err(|_| ApiError::BadRequest("title must be 1 to 100 characters".to_string()))?
        .trim()
        .to_string();
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(d) = &description {
        check_length("description", d).map_err(CoreError::from)?;
    }

    owned_profile(&state, &user, &request.profile_id).await?;

    let now = Utc::now();
    let record = ChecklistRecord {
        user_id: user.user_id.clone(),
        item_id: Id::generate(CUSTOM_ITEM_PREFIX, now),
        completed: false,
        updated_at: now,
        profile_id: Some(request.profile_id),
        week: Some(week),
        title: Some(title),
        description,
    };
    state.store.put_checklist_record(&record).await?;

    info!(user = %user.user_id, item = %record.item_id, "created custom checklist item");
    Ok((StatusCode::CREATED, Json(checklist::custom_view(&record))))
}

/// DELETE /checklist/{item_id}
///
/// Only custom items can be deleted.
pub async fn delete_custom_item_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let item_id = parse_id(&item_id)?;
    let not_found = || ApiError::NotFound(format!("custom item {item_id} not found"));

    let record = state
        .store
        .get_checklist_record(&user.user_id, &item_id)
        .await?
        .ok_or_else(not_found)?;
    if !record.is_custom() {
        return Err(not_found());
    }
    state
        .store
        .delete_checklist_record(&user.user_id, &item_id)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: true,
        id: item_id,
        removed_entries: None,
    }))
}

/// GET /checklist/status
pub async fn list_status_handler(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<StatusView>>, ApiError> {
    let records = state.store.list_checklist(&user.user_id).await?;
    Ok(Json(records.iter().map(StatusView::from).collect()))
}

/// PUT /checklist/status/{item_id}
///
/// Sets completion for a bundled item or one of the caller's custom items.
pub async fn set_status_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<String>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusView>, ApiError> {
    let item_id = parse_id(&item_id)?;
    let Json(request) = body?;

    let existing = state
        .store
        .get_checklist_record(&user.user_id, &item_id)
        .await?;
    let now = Utc::now();
    let record = match existing {
        // Custom fields ride along unchanged.
        Some(record) => ChecklistRecord {
            completed: request.completed,
            updated_at: now,
            ..record
        },
        None => {
            let bundled = checklist::base_items()?.iter().any(|i| i.id == item_id);
            if !bundled {
                return Err(ApiError::NotFound(format!(
                    "checklist item {item_id} not found"
                )));
            }
            ChecklistRecord {
                user_id: user.user_id.clone(),
                item_id,
                completed: request.completed,
                updated_at: now,
                profile_id: None,
                week: None,
                title: None,
                description: None,
            }
        }
    };
    state.store.put_checklist_record(&record).await?;

    Ok(Json(StatusView::from(&record)))
}
