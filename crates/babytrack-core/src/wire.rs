//! Request and response bodies shared by the HTTP service and its client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::checklist::ChecklistView;
use crate::model::{BabyProfile, ChecklistRecord, Id};
use crate::report::ReportSection;
use crate::time::TimeRange;

/// Body of `POST /profiles` and `PUT /profiles/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub birthday: NaiveDate,
}

/// A profile as returned to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Id,
    pub name: String,
    pub birthday: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&BabyProfile> for ProfileView {
    fn from(p: &BabyProfile) -> Self {
        Self {
            id: p.baby_id.clone(),
            name: p.name.clone(),
            birthday: p.birthday,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Acknowledgement returned by every DELETE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Id,
    /// Tracker entries removed along with a profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_entries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub profile_id: Id,
    pub time_range: TimeRange,
    pub generated_at: DateTime<Utc>,
    pub reports: Vec<ReportSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResponse {
    /// Gestational week, while the profile's due date is ahead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_week: Option<u32>,
    pub items: Vec<ChecklistView>,
}

/// Body of `POST /checklist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomItemRequest {
    pub profile_id: Id,
    pub week: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PUT /checklist/status/{itemId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub item_id: Id,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&ChecklistRecord> for StatusView {
    fn from(r: &ChecklistRecord) -> Self {
        Self {
            item_id: r.item_id.clone(),
            completed: r.completed,
            updated_at: r.updated_at,
        }
    }
}
