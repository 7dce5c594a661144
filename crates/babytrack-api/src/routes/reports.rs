use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use babytrack_core::notes::{Note, collect_notes};
use babytrack_core::report::build_section;
use babytrack_core::time::utc_offset;
use babytrack_core::wire::ReportResponse;
use babytrack_core::{TimeRange, TrackerEntry, TrackerType};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::routes::{owned_profile, parse_id, parse_tracker_list};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub profile_id: String,
    pub trackers: Option<String>,
    pub time_range: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesQuery {
    pub profile_id: String,
    pub trackers: Option<String>,
    pub time_range: Option<String>,
}

fn parse_time_range(raw: Option<&str>) -> Result<TimeRange, ApiError> {
    match raw {
        Some(s) => s.parse().map_err(|e: babytrack_core::time::UnknownTimeRange| {
            ApiError::BadRequest(e.to_string())
        }),
        None => Ok(TimeRange::default()),
    }
}

/// A `trackers` parameter that names no tracker counts as absent.
fn tracker_filter(raw: Option<&str>) -> Result<Option<Vec<TrackerType>>, ApiError> {
    let list = raw.map(parse_tracker_list).transpose()?;
    Ok(list.filter(|l| !l.is_empty()))
}

/// GET /reports?profileId=..&trackers=sleep,bottle&timeRange=last7days
///
/// Builds chart data per requested tracker over the time range. Trackers
/// default to the core chart set, the range to the last 7 days.
pub async fn reports_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Query(query) = query?;
    let profile_id = parse_id(&query.profile_id)?;
    let time_range = parse_time_range(query.time_range.as_deref())?;
    let trackers = match tracker_filter(query.trackers.as_deref())? {
        Some(list) => list,
        None => TrackerType::CORE_REPORTS.to_vec(),
    };
    let offset_minutes = query.utc_offset_minutes.unwrap_or(0);
    let offset = utc_offset(offset_minutes).ok_or_else(|| {
        ApiError::BadRequest(format!("utcOffsetMinutes {offset_minutes} out of range"))
    })?;

    owned_profile(&state, &user, &profile_id).await?;

    let now = Utc::now();
    let window = time_range.window(now);
    let mut reports = Vec::with_capacity(trackers.len());
    for tracker in trackers {
        let entries = state.store.list_entries(&profile_id, Some(tracker)).await?;
        let section = build_section(tracker, &entries, window, offset);
        debug!(
            profile = %profile_id,
            %tracker,
            fetched = entries.len(),
            in_window = section.entry_count,
            "built report section"
        );
        reports.push(section);
    }

    Ok(Json(ReportResponse {
        profile_id,
        time_range,
        generated_at: now,
        reports,
    }))
}

/// GET /notes?profileId=..[&trackers=..][&timeRange=..]
///
/// Lists every entry with notes, newest first. Without `timeRange` all
/// entries are considered.
pub async fn notes_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<NotesQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let profile_id = parse_id(&query.profile_id)?;
    let window = match query.time_range.as_deref() {
        Some(raw) => Some(parse_time_range(Some(raw))?.window(Utc::now())),
        None => None,
    };
    let trackers = tracker_filter(query.trackers.as_deref())?;

    owned_profile(&state, &user, &profile_id).await?;

    let entries: Vec<TrackerEntry> = match trackers {
        Some(trackers) => {
            let mut all = Vec::new();
            for tracker in trackers {
                all.extend(state.store.list_entries(&profile_id, Some(tracker)).await?);
            }
            all
        }
        None => state.store.list_entries(&profile_id, None).await?,
    };

    Ok(Json(collect_notes(&entries, window)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, NaiveDate, SecondsFormat, Utc};
    use serde_json::{Value, json};

    use crate::routes::test_support::TestApp;

    fn hours_ago(h: i64) -> String {
        (Utc::now() - Duration::hours(h)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    async fn log(app: &TestApp, profile: &str, tracker: &str, payload: Value) {
        let (status, body) = app
            .call(
                "u1",
                "POST",
                &format!("/profiles/{profile}/trackers/{tracker}"),
                Some(payload),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    #[tokio::test]
    async fn report_chart_data_is_well_typed() {
        let app = TestApp::new();
        let profile = app.profile("u1", "Ada", "2024-01-01").await;

        log(&app, &profile, "sleep", json!({"startTime": hours_ago(10), "endTime": hours_ago(2)})).await;
        log(&app, &profile, "nursing", json!({"startTime": hours_ago(5), "side": "left", "duration": 12})).await;
        log(&app, &profile, "bottle", json!({"startTime": hours_ago(4), "volume": 120})).await;
        log(&app, &profile, "diaper", json!({"startTime": hours_ago(3), "isWet": true, "isDirty": true})).await;
        log(&app, &profile, "medicine", json!({"startTime": hours_ago(3), "medicineName": "Vitamin D"})).await;
        log(&app, &profile, "potty", json!({"startTime": hours_ago(1), "pee": true, "poop": false})).await;

        let (status, body) = app
            .call("u1", "GET", &format!("/reports?profileId={profile}&timeRange=last24hours"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["timeRange"], "last24hours");

        let reports = body["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 6);
        let numeric = ["hours", "duration", "volume", "wet", "dirty", "doses", "pee", "poop"];
        for section in reports {
            let rows = section["chartData"].as_array().unwrap();
            assert_eq!(rows.len(), 1, "{section}");
            for row in rows {
                let date = row["date"].as_str().unwrap();
                assert!(NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
                for field in numeric {
                    if let Some(v) = row.get(field) {
                        assert!(v.is_number(), "{field} in {row}");
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn report_respects_tracker_selection_and_window() {
        let app = TestApp::new();
        let profile = app.profile("u1", "Ada", "2024-01-01").await;
        log(&app, &profile, "bottle", json!({"startTime": hours_ago(30), "volume": 90})).await;
        log(&app, &profile, "bottle", json!({"startTime": hours_ago(2), "volume": 120})).await;

        let (_, body) = app
            .call(
                "u1",
                "GET",
                &format!("/reports?profileId={profile}&trackers=bottle&timeRange=last24hours"),
                None,
            )
            .await;
        let reports = body["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["trackerType"], "bottle");
        assert_eq!(reports[0]["entryCount"], 1);
        assert_eq!(reports[0]["chartData"][0]["volume"], 120.0);

        let (_, body) = app
            .call("u1", "GET", &format!("/reports?profileId={profile}&trackers=bottle"), None)
            .await;
        assert_eq!(body["timeRange"], "last7days");
        assert_eq!(body["reports"][0]["entryCount"], 2);
    }

    #[tokio::test]
    async fn empty_tracker_list_means_default_set() {
        let app = TestApp::new();
        let profile = app.profile("u1", "Ada", "2024-01-01").await;
        log(&app, &profile, "bottle", json!({"startTime": hours_ago(2), "volume": 60, "notes": "ok"})).await;

        for query in ["trackers=", "trackers=,,"] {
            let (status, body) = app
                .call("u1", "GET", &format!("/reports?profileId={profile}&{query}"), None)
                .await;
            assert_eq!(status, StatusCode::OK);
            let kinds: Vec<&str> = body["reports"]
                .as_array()
                .unwrap()
                .iter()
                .map(|s| s["trackerType"].as_str().unwrap())
                .collect();
            assert_eq!(kinds, vec!["sleep", "nursing", "bottle", "diaper", "medicine", "potty"]);
        }

        let (_, body) = app
            .call("u1", "GET", &format!("/notes?profileId={profile}&trackers="), None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn report_rejects_bad_parameters() {
        let app = TestApp::new();
        let profile = app.profile("u1", "Ada", "2024-01-01").await;

        for query in [
            format!("profileId={profile}&timeRange=last90days"),
            format!("profileId={profile}&trackers=naps"),
            format!("profileId={profile}&utcOffsetMinutes=9999"),
            "timeRange=last7days".to_string(),
        ] {
            let (status, _) = app.call("u1", "GET", &format!("/reports?{query}"), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        }

        let (status, _) = app
            .call("u2", "GET", &format!("/reports?profileId={profile}"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn notes_lists_annotated_entries_newest_first() {
        let app = TestApp::new();
        let profile = app.profile("u1", "Ada", "2024-01-01").await;
        log(&app, &profile, "sleep", json!({"startTime": hours_ago(48), "notes": "woke twice"})).await;
        log(&app, &profile, "bottle", json!({"startTime": hours_ago(3), "volume": 60, "notes": "refused"})).await;
        log(&app, &profile, "diaper", json!({"startTime": hours_ago(2), "isWet": true, "isDirty": false})).await;

        let (status, body) = app
            .call("u1", "GET", &format!("/notes?profileId={profile}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let notes: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["notes"].as_str().unwrap())
            .collect();
        assert_eq!(notes, vec!["refused", "woke twice"]);

        let (_, body) = app
            .call("u1", "GET", &format!("/notes?profileId={profile}&timeRange=last24hours"), None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = app
            .call("u1", "GET", &format!("/notes?profileId={profile}&trackers=sleep"), None)
            .await;
        assert_eq!(body[0]["trackerType"], "sleep");
    }
}
