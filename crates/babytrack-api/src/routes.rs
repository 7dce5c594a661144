use axum::Json;
use axum::Router;
use axum::routing::{delete, get, put};
use babytrack_core::{BabyProfile, Id, TrackerType};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub mod checklist;
pub mod profiles;
pub mod reports;
pub mod trackers;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/profiles",
            get(profiles::list_profiles_handler).post(profiles::create_profile_handler),
        )
        .route(
            "/profiles/{profile_id}",
            get(profiles::get_profile_handler)
                .put(profiles::update_profile_handler)
                .delete(profiles::delete_profile_handler),
        )
        .route(
            "/profiles/{profile_id}/trackers/{tracker_type}",
            get(trackers::list_entries_handler).post(trackers::create_entry_handler),
        )
        .route(
            "/profiles/{profile_id}/trackers/{tracker_type}/{entry_id}",
            get(trackers::get_entry_handler)
                .put(trackers::update_entry_handler)
                .delete(trackers::delete_entry_handler),
        )
        .route("/reports", get(reports::reports_handler))
        .route("/notes", get(reports::notes_handler))
        .route(
            "/checklist",
            get(checklist::checklist_handler).post(checklist::create_custom_item_handler),
        )
        .route("/checklist/status", get(checklist::list_status_handler))
        .route(
            "/checklist/status/{item_id}",
            put(checklist::set_status_handler),
        )
        .route(
            "/checklist/{item_id}",
            delete(checklist::delete_custom_item_handler),
        )
        .with_state(state)
}

/// GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Validate an id taken from a path or query parameter.
pub(crate) fn parse_id(raw: &str) -> Result<Id, ApiError> {
    Id::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn parse_tracker(raw: &str) -> Result<TrackerType, ApiError> {
    raw.parse()
        .map_err(|e: babytrack_core::model::UnknownTracker| ApiError::BadRequest(e.to_string()))
}

/// Parse a comma-separated tracker list, keeping first occurrences in order.
pub(crate) fn parse_tracker_list(raw: &str) -> Result<Vec<TrackerType>, ApiError> {
    let mut trackers = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let tracker = parse_tracker(name)?;
        if !trackers.contains(&tracker) {
            trackers.push(tracker);
        }
    }
    Ok(trackers)
}

/// Load a profile owned by `user`; anything else is reported as not found.
pub(crate) async fn owned_profile(
    state: &AppState,
    user: &CurrentUser,
    profile_id: &Id,
) -> Result<BabyProfile, ApiError> {
    state
        .store
        .get_profile(&user.user_id, profile_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("profile {profile_id} not found")))
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::test_support::TestApp;
    use super::*;

    #[test]
    fn tracker_list_dedupes_and_validates() {
        assert_eq!(
            parse_tracker_list("sleep, bottle,sleep,,").unwrap(),
            vec![TrackerType::Sleep, TrackerType::Bottle]
        );
        assert!(parse_tracker_list("sleep,naps").is_err());
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = router(AppState::new(std::sync::Arc::new(
            babytrack_core::MemoryStore::new(),
        )));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let app = router(AppState::new(std::sync::Arc::new(
            babytrack_core::MemoryStore::new(),
        )));
        let response = app
            .oneshot(Request::builder().uri("/profiles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_tracker_is_bad_request() {
        let app = TestApp::new();
        let id = app.profile("u1", "Ada", "2024-01-01").await;
        let (status, body) = app
            .call("u1", "GET", &format!("/profiles/{id}/trackers/naps"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("naps"));
    }
}
