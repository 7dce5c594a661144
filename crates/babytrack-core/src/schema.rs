//! Per-tracker payload schemas.
//!
//! Every tracker type owns a static field table. Create and update payloads
//! are checked against it before anything is written: unknown fields are
//! rejected, required fields must be present, and each value must match its
//! field kind.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{RESERVED_ENTRY_KEYS, TrackerType};
use crate::time::parse_timestamp;

/// Kind of value a payload field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Finite, non-negative number.
    Number,
    Flag,
    Timestamp,
    /// Text restricted to a fixed set of values.
    Choice(&'static [&'static str]),
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Text | Self::Choice(_) => "a string",
            Self::Number => "a non-negative number",
            Self::Flag => "a boolean",
            Self::Timestamp => "an RFC 3339 or YYYY-MM-DDTHH:MM timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

pub const NURSING_SIDES: &[&str] = &["left", "right", "both"];
pub const VOLUME_UNITS: &[&str] = &["ml", "oz"];
pub const BOTTLE_CONTENTS: &[&str] = &["formula", "breastmilk", "other"];
pub const TEMPERATURE_UNITS: &[&str] = &["C", "F"];

const NOTES: FieldSpec = optional("notes", FieldKind::Text);

const SLEEP: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    optional("endTime", FieldKind::Timestamp),
    optional("location", FieldKind::Text),
    NOTES,
];

const NURSING: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("side", FieldKind::Choice(NURSING_SIDES)),
    required("duration", FieldKind::Number),
    NOTES,
];

const BOTTLE: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("volume", FieldKind::Number),
    optional("unit", FieldKind::Choice(VOLUME_UNITS)),
    optional("contents", FieldKind::Choice(BOTTLE_CONTENTS)),
    NOTES,
];

const DIAPER: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("isWet", FieldKind::Flag),
    required("isDirty", FieldKind::Flag),
    NOTES,
];

const SOLIDS: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("food", FieldKind::Text),
    optional("reaction", FieldKind::Text),
    optional("imageKey", FieldKind::Text),
    NOTES,
];

const MEDICINE: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("medicineName", FieldKind::Text),
    optional("amount", FieldKind::Number),
    optional("unit", FieldKind::Text),
    NOTES,
];

const GROWTH: &[FieldSpec] = &[
    required("date", FieldKind::Timestamp),
    optional("weight", FieldKind::Number),
    optional("height", FieldKind::Number),
    optional("headCircumference", FieldKind::Number),
    NOTES,
];

const POTTY: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("pee", FieldKind::Flag),
    required("poop", FieldKind::Flag),
    NOTES,
];

const TEMPERATURE: &[FieldSpec] = &[
    required("startTime", FieldKind::Timestamp),
    required("temperature", FieldKind::Number),
    optional("unit", FieldKind::Choice(TEMPERATURE_UNITS)),
    NOTES,
];

/// The field table for a tracker type.
pub fn fields(tracker: TrackerType) -> &'static [FieldSpec] {
    match tracker {
        TrackerType::Sleep => SLEEP,
        TrackerType::Nursing => NURSING,
        TrackerType::Bottle => BOTTLE,
        TrackerType::Diaper => DIAPER,
        TrackerType::Solids => SOLIDS,
        TrackerType::Medicine => MEDICINE,
        TrackerType::Growth => GROWTH,
        TrackerType::Potty => POTTY,
        TrackerType::Temperature => TEMPERATURE,
    }
}

/// Errors produced while validating client input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown field {field:?} for {tracker} entries")]
    UnknownField { tracker: TrackerType, field: String },

    #[error("missing required field {0:?}")]
    MissingField(String),

    #[error("field {field:?} must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field {field:?} must be one of {allowed:?}")]
    InvalidChoice {
        field: String,
        allowed: &'static [&'static str],
    },

    #[error("endTime must not be before startTime")]
    EndBeforeStart,

    #[error("field {field:?} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("field {field:?} exceeds maximum length of {max}")]
    TooLong { field: String, max: usize },
}

/// Longest accepted text value, in characters.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Validate a client payload for `tracker` and return the fields to store.
///
/// Reserved keys are dropped, as are `null` values of optional fields.
pub fn validate_payload(
    tracker: TrackerType,
    body: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    let specs = fields(tracker);
    let mut clean = Map::new();

    for (key, value) in body {
        if RESERVED_ENTRY_KEYS.contains(&key.as_str()) {
            continue;
        }
        let spec = specs
            .iter()
            .find(|s| s.name == key)
            .ok_or_else(|| ValidationError::UnknownField {
                tracker,
                field: key.clone(),
            })?;
        if value.is_null() {
            continue;
        }
        check_value(spec, value)?;
        clean.insert(key.clone(), value.clone());
    }

    for spec in specs.iter().filter(|s| s.required) {
        if !clean.contains_key(spec.name) {
            return Err(ValidationError::MissingField(spec.name.to_string()));
        }
    }

    if tracker == TrackerType::Sleep {
        let ts = |k: &str| clean.get(k).and_then(Value::as_str).and_then(parse_timestamp);
        if let (Some(start), Some(end)) = (ts("startTime"), ts("endTime")) {
            if end < start {
                return Err(ValidationError::EndBeforeStart);
            }
        }
    }

    Ok(clean)
}

fn check_value(spec: &FieldSpec, value: &Value) -> Result<(), ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        field: spec.name.to_string(),
        expected: spec.kind.describe(),
    };

    match spec.kind {
        FieldKind::Text => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if spec.required && s.trim().is_empty() {
                return Err(ValidationError::MissingField(spec.name.to_string()));
            }
            check_length(spec.name, s)?;
        }
        FieldKind::Number => {
            let n = value.as_f64().ok_or_else(wrong_type)?;
            if !n.is_finite() || n < 0.0 {
                return Err(wrong_type());
            }
        }
        FieldKind::Flag => {
            value.as_bool().ok_or_else(wrong_type)?;
        }
        FieldKind::Timestamp => {
            value
                .as_str()
                .and_then(parse_timestamp)
                .ok_or_else(wrong_type)?;
        }
        FieldKind::Choice(allowed) => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if !allowed.contains(&s) {
                return Err(ValidationError::InvalidChoice {
                    field: spec.name.to_string(),
                    allowed,
                });
            }
        }
    }

    Ok(())
}

/// Longest accepted profile name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validate a profile name. Surrounding whitespace is ignored by the checks
/// but kept in the returned name.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("name".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name.to_string())
}

pub fn check_length(field: &str, s: &str) -> Result<(), ValidationError> {
    if s.chars().count() > MAX_TEXT_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}
