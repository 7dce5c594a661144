use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Id
// ---------------------------------------------------------------------------

const MAX_ID_LENGTH: usize = 128;

/// A validated record identifier (profile, entry or checklist item id):
/// ASCII letters, digits, `_` and `-`, 1-128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

impl Id {
    /// Create a new `Id` after validation.
    pub fn new(s: impl Into<String>) -> Result<Self, IdError> {
        let s = s.into();

        if s.is_empty() {
            return Err(IdError::Empty);
        }

        if s.len() > MAX_ID_LENGTH {
            return Err(IdError::TooLong(s.len()));
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IdError::InvalidCharacters);
        }

        Ok(Self(s))
    }

    /// Generate a fresh id of the form `<prefix>_<millis>_<hex>`.
    ///
    /// The millisecond component keeps ids of one prefix roughly ordered by
    /// creation time, so a sort-key range query returns them chronologically.
    pub fn generate(prefix: &str, now: DateTime<Utc>) -> Self {
        let suffix: u32 = rand::rng().random();
        Self(format!(
            "{prefix}_{:013}_{suffix:08x}",
            now.timestamp_millis().max(0)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Id {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when validating an id.
#[derive(Debug, Clone, Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,

    #[error("id length {0} exceeds maximum of {MAX_ID_LENGTH}")]
    TooLong(usize),

    #[error("id must contain only letters, digits, underscores, and hyphens")]
    InvalidCharacters,
}

// ---------------------------------------------------------------------------
// TrackerType
// ---------------------------------------------------------------------------

/// One category of loggable baby-care event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerType {
    Sleep,
    Nursing,
    Bottle,
    Diaper,
    Solids,
    Medicine,
    Growth,
    Potty,
    Temperature,
}

impl TrackerType {
    pub const ALL: [TrackerType; 9] = [
        Self::Sleep,
        Self::Nursing,
        Self::Bottle,
        Self::Diaper,
        Self::Solids,
        Self::Medicine,
        Self::Growth,
        Self::Potty,
        Self::Temperature,
    ];

    /// Trackers charted by the reports endpoint when none are requested.
    pub const CORE_REPORTS: [TrackerType; 6] = [
        Self::Sleep,
        Self::Nursing,
        Self::Bottle,
        Self::Diaper,
        Self::Medicine,
        Self::Potty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Nursing => "nursing",
            Self::Bottle => "bottle",
            Self::Diaper => "diaper",
            Self::Solids => "solids",
            Self::Medicine => "medicine",
            Self::Growth => "growth",
            Self::Potty => "potty",
            Self::Temperature => "temperature",
        }
    }

    /// Prefix shared by every entry id of this tracker, e.g. `bottle_`.
    pub fn entry_prefix(self) -> String {
        format!("{}_", self.as_str())
    }

    /// Payload field holding the event time.
    pub fn time_field(self) -> &'static str {
        match self {
            Self::Growth => "date",
            _ => "startTime",
        }
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackerType {
    type Err = UnknownTracker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTracker(s.to_string()))
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown tracker type: {0}")]
pub struct UnknownTracker(pub String);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A user seen by the API, keyed by the Cognito `sub`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// A baby (or pregnancy) profile as stored in the Babies table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyProfile {
    pub user_id: String,
    pub baby_id: Id,
    pub name: String,
    /// Date of birth, or the due date while in pregnancy mode.
    pub birthday: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single logged event. The tracker-specific payload is flattened next to
/// the common fields, both in DynamoDB and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEntry {
    pub entry_id: Id,
    pub baby_id: Id,
    pub tracker_type: TrackerType,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Keys owned by the server; never taken from a client payload.
pub const RESERVED_ENTRY_KEYS: [&str; 5] =
    ["entryId", "babyId", "trackerType", "createdAt", "updatedAt"];

impl TrackerEntry {
    /// The event time of this entry (`startTime`, or `date` for growth).
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(self.tracker_type.time_field())
            .and_then(Value::as_str)
            .and_then(crate::time::parse_timestamp)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A row of the ChecklistStatus table: either a completion status for a
/// bundled item, or a user-defined custom item (which carries its own
/// status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRecord {
    pub user_id: String,
    pub item_id: Id,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Prefix of user-defined checklist item ids.
pub const CUSTOM_ITEM_PREFIX: &str = "custom";

impl ChecklistRecord {
    pub fn is_custom(&self) -> bool {
        self.title.is_some()
    }
}

/// Whether a write may create a new item or must replace an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `Conflict` if the key already exists.
    Create,
    /// Fail with `NotFound` if the key does not exist.
    Replace,
}
