use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{ChecklistRecord, Id};
use crate::schema::ValidationError;

const BASE_ITEMS_JSON: &str = include_str!("../data/checklist.json");

/// Length of a full-term pregnancy in weeks.
pub const TERM_WEEKS: u32 = 40;

/// Latest week a custom item may be scheduled for.
pub const MAX_ITEM_WEEK: u32 = 42;

/// A bundled checklist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Id,
    pub week: u32,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// A checklist item as shown to a user: bundled or custom, with its
/// completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistView {
    pub id: Id,
    pub week: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub custom: bool,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

static BASE_ITEMS: LazyLock<Result<Vec<ChecklistItem>, String>> =
    LazyLock::new(|| serde_json::from_str(BASE_ITEMS_JSON).map_err(|e| e.to_string()));

/// The bundled checklist, in file order. Parsed on first use.
pub fn base_items() -> Result<&'static [ChecklistItem], CoreError> {
    match &*BASE_ITEMS {
        Ok(items) => Ok(items),
        Err(e) => Err(CoreError::ChecklistData(e.clone())),
    }
}

/// Merge bundled items with a user's status records.
///
/// Custom items are included only when they belong to `profile`. Status
/// records for ids that are not bundled items are ignored. The result is
/// sorted by week, then id.
pub fn merge(
    base: &[ChecklistItem],
    records: &[ChecklistRecord],
    profile: Option<&Id>,
) -> Vec<ChecklistView> {
    let status: HashMap<&Id, &ChecklistRecord> = records
        .iter()
        .filter(|r| !r.is_custom())
        .map(|r| (&r.item_id, r))
        .collect();

    let bundled = base.iter().map(|item| {
        let record = status.get(&item.id);
        ChecklistView {
            id: item.id.clone(),
            week: item.week,
            title: item.title.clone(),
            description: Some(item.description.clone()),
            category: Some(item.category.clone()),
            custom: false,
            completed: record.is_some_and(|r| r.completed),
            profile_id: None,
            updated_at: record.map(|r| r.updated_at),
        }
    });

    let custom = records
        .iter()
        .filter(|r| r.is_custom() && profile.is_some() && r.profile_id.as_ref() == profile)
        .map(custom_view);

    let mut items: Vec<ChecklistView> = bundled.chain(custom).collect();
    items.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.id.cmp(&b.id)));
    items
}

/// View of a custom item record.
pub fn custom_view(record: &ChecklistRecord) -> ChecklistView {
    ChecklistView {
        id: record.item_id.clone(),
        week: record.week.unwrap_or(1),
        title: record.title.clone().unwrap_or_default(),
        description: record.description.clone(),
        category: None,
        custom: true,
        completed: record.completed,
        profile_id: record.profile_id.clone(),
        updated_at: Some(record.updated_at),
    }
}

/// Gestational week for a pregnancy due on `due`, as of `today`.
///
/// Returns `None` once the due date has passed.
pub fn gestational_week(due: NaiveDate, today: NaiveDate) -> Option<u32> {
    let days_until_due = (due - today).num_days();
    if days_until_due < 0 {
        return None;
    }
    let weeks_remaining = (days_until_due as u64).div_ceil(7);
    let week = (TERM_WEEKS as u64).saturating_sub(weeks_remaining);
    Some(week.clamp(1, TERM_WEEKS as u64) as u32)
}

pub fn validate_week(week: u32) -> Result<u32, ValidationError> {
    if !(1..=MAX_ITEM_WEEK).contains(&week) {
        return Err(ValidationError::OutOfRange {
            field: "week".to_string(),
            min: 1,
            max: MAX_ITEM_WEEK as i64,
        });
    }
    Ok(week)
}
