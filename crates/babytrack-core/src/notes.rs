use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Id, TrackerEntry, TrackerType};
use crate::time::Window;

/// A tracker entry that carries free-text notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub entry_id: Id,
    pub tracker_type: TrackerType,
    pub start_date_time: String,
    pub notes: String,
}

/// Collect the notes of `entries`, newest first.
///
/// Entries with blank notes are skipped. When `window` is given, only
/// entries whose event time lies inside it are kept; otherwise entries
/// without a parseable event time fall back to their creation time.
pub fn collect_notes(entries: &[TrackerEntry], window: Option<Window>) -> Vec<Note> {
    let mut notes: Vec<(DateTime<Utc>, Note)> = entries
        .iter()
        .filter_map(|e| {
            let text = e.text("notes")?.trim();
            if text.is_empty() {
                return None;
            }
            let at = e.event_time().unwrap_or(e.created_at);
            if let Some(w) = window {
                if !w.contains(at) {
                    return None;
                }
            }
            Some((
                at,
                Note {
                    entry_id: e.entry_id.clone(),
                    tracker_type: e.tracker_type,
                    start_date_time: at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    notes: text.to_string(),
                },
            ))
        })
        .collect();

    notes.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.entry_id.cmp(&b.1.entry_id)));
    notes.into_iter().map(|(_, note)| note).collect()
}
