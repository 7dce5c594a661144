//! Chart-data shaping for the reports endpoint.
//!
//! Each tracker's raw entries are filtered to the report window and reshaped
//! into a fixed per-tracker row schema. Continuous trackers (sleep, nursing,
//! bottle, ...) produce one row per entry; count trackers (diaper, medicine,
//! potty) produce one row per day.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{TrackerEntry, TrackerType};
use crate::time::{Window, day_key};

/// Millilitres per US fluid ounce.
const ML_PER_OZ: f64 = 29.5735;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepPoint {
    pub date: String,
    pub start_date_time: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NursingPoint {
    pub date: String,
    pub start_date_time: String,
    pub side: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottlePoint {
    pub date: String,
    pub start_date_time: String,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaperPoint {
    pub date: String,
    pub start_date_time: String,
    pub wet: u32,
    pub dirty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicinePoint {
    pub date: String,
    pub start_date_time: String,
    pub medicine_name: String,
    pub doses: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PottyPoint {
    pub date: String,
    pub start_date_time: String,
    pub pee: u32,
    pub poop: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub date: String,
    pub start_date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_circumference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturePoint {
    pub date: String,
    pub start_date_time: String,
    pub temperature: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolidsPoint {
    pub date: String,
    pub start_date_time: String,
    pub food: String,
}

/// One row of chart data. Serialized without a tag; the enclosing section
/// names the tracker.
///
/// Variant order matters when deserializing: growth rows have only optional
/// measurements and would match any row, so they come last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartPoint {
    Sleep(SleepPoint),
    Nursing(NursingPoint),
    Bottle(BottlePoint),
    Diaper(DiaperPoint),
    Medicine(MedicinePoint),
    Potty(PottyPoint),
    Temperature(TemperaturePoint),
    Solids(SolidsPoint),
    Growth(GrowthPoint),
}

impl ChartPoint {
    pub fn start_date_time(&self) -> &str {
        match self {
            Self::Sleep(p) => &p.start_date_time,
            Self::Nursing(p) => &p.start_date_time,
            Self::Bottle(p) => &p.start_date_time,
            Self::Diaper(p) => &p.start_date_time,
            Self::Medicine(p) => &p.start_date_time,
            Self::Potty(p) => &p.start_date_time,
            Self::Growth(p) => &p.start_date_time,
            Self::Temperature(p) => &p.start_date_time,
            Self::Solids(p) => &p.start_date_time,
        }
    }
}

/// Nursing minutes per side for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NursingDay {
    pub date: String,
    pub left: f64,
    pub right: f64,
    pub both: f64,
}

/// Report output for a single tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub tracker_type: TrackerType,
    /// Entries of this tracker inside the window.
    pub entry_count: usize,
    pub chart_data: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_totals: Option<Vec<NursingDay>>,
}

/// Build the report section for `tracker` from that tracker's entries.
///
/// Entries of other trackers, entries without a parseable event time, and
/// entries outside `window` are ignored. Rows are sorted ascending by
/// `startDateTime`.
pub fn build_section(
    tracker: TrackerType,
    entries: &[TrackerEntry],
    window: Window,
    offset: FixedOffset,
) -> ReportSection {
    let mut timed: Vec<(DateTime<Utc>, &TrackerEntry)> = entries
        .iter()
        .filter(|e| e.tracker_type == tracker)
        .filter_map(|e| e.event_time().map(|t| (t, e)))
        .filter(|(t, _)| window.contains(*t))
        .collect();
    timed.sort_by_key(|(t, _)| *t);

    let entry_count = timed.len();
    let stamp = |t: DateTime<Utc>| (day_key(t, offset), format_stamp(t, offset));

    let mut daily_totals = None;
    let mut chart_data: Vec<ChartPoint> = match tracker {
        TrackerType::Sleep => timed
            .iter()
            .filter_map(|(start, e)| {
                let end = e.text("endTime").and_then(crate::time::parse_timestamp)?;
                let (date, start_date_time) = stamp(*start);
                let hours = (end - *start).num_seconds().max(0) as f64 / 3600.0;
                Some(ChartPoint::Sleep(SleepPoint {
                    date,
                    start_date_time,
                    hours: round_to(hours, 2),
                }))
            })
            .collect(),
        TrackerType::Nursing => {
            let points: Vec<NursingPoint> = timed
                .iter()
                .map(|(t, e)| {
                    let (date, start_date_time) = stamp(*t);
                    NursingPoint {
                        date,
                        start_date_time,
                        side: e.text("side").unwrap_or("both").to_string(),
                        duration: e.number("duration").unwrap_or(0.0),
                    }
                })
                .collect();
            daily_totals = Some(nursing_daily_totals(&points));
            points.into_iter().map(ChartPoint::Nursing).collect()
        }
        TrackerType::Bottle => timed
            .iter()
            .map(|(t, e)| {
                let (date, start_date_time) = stamp(*t);
                ChartPoint::Bottle(BottlePoint {
                    date,
                    start_date_time,
                    volume: volume_ml(e),
                })
            })
            .collect(),
        TrackerType::Diaper => group_by_day(&timed, offset)
            .into_iter()
            .map(|(date, first, group)| {
                ChartPoint::Diaper(DiaperPoint {
                    date,
                    start_date_time: format_stamp(first, offset),
                    wet: count(&group, |e| e.flag("isWet")),
                    dirty: count(&group, |e| e.flag("isDirty")),
                })
            })
            .collect(),
        TrackerType::Potty => group_by_day(&timed, offset)
            .into_iter()
            .map(|(date, first, group)| {
                ChartPoint::Potty(PottyPoint {
                    date,
                    start_date_time: format_stamp(first, offset),
                    pee: count(&group, |e| e.flag("pee")),
                    poop: count(&group, |e| e.flag("poop")),
                })
            })
            .collect(),
        TrackerType::Medicine => medicine_doses(&timed, offset),
        TrackerType::Growth => timed
            .iter()
            .map(|(t, e)| {
                let (date, start_date_time) = stamp(*t);
                ChartPoint::Growth(GrowthPoint {
                    date,
                    start_date_time,
                    weight: e.number("weight"),
                    height: e.number("height"),
                    head_circumference: e.number("headCircumference"),
                })
            })
            .collect(),
        TrackerType::Temperature => timed
            .iter()
            .map(|(t, e)| {
                let (date, start_date_time) = stamp(*t);
                ChartPoint::Temperature(TemperaturePoint {
                    date,
                    start_date_time,
                    temperature: e.number("temperature").unwrap_or(0.0),
                    unit: e.text("unit").unwrap_or("C").to_string(),
                })
            })
            .collect(),
        TrackerType::Solids => timed
            .iter()
            .map(|(t, e)| {
                let (date, start_date_time) = stamp(*t);
                ChartPoint::Solids(SolidsPoint {
                    date,
                    start_date_time,
                    food: e.text("food").unwrap_or_default().to_string(),
                })
            })
            .collect(),
    };

    // Stamps share one offset and format, so string order is time order.
    chart_data.sort_by(|a, b| a.start_date_time().cmp(b.start_date_time()));

    ReportSection {
        tracker_type: tracker,
        entry_count,
        chart_data,
        daily_totals,
    }
}

/// Sum nursing minutes per side for each day, ascending by date.
pub fn nursing_daily_totals(points: &[NursingPoint]) -> Vec<NursingDay> {
    let mut days: BTreeMap<&str, NursingDay> = BTreeMap::new();
    for p in points {
        let day = days.entry(&p.date).or_insert_with(|| NursingDay {
            date: p.date.clone(),
            ..NursingDay::default()
        });
        match p.side.as_str() {
            "left" => day.left += p.duration,
            "right" => day.right += p.duration,
            _ => day.both += p.duration,
        }
    }
    days.into_values().collect()
}

/// Entries grouped by calendar day: `(day, first event time, entries)`.
fn group_by_day<'a>(
    timed: &[(DateTime<Utc>, &'a TrackerEntry)],
    offset: FixedOffset,
) -> Vec<(String, DateTime<Utc>, Vec<&'a TrackerEntry>)> {
    let mut days: BTreeMap<String, (DateTime<Utc>, Vec<&'a TrackerEntry>)> = BTreeMap::new();
    for (t, e) in timed {
        let slot = days
            .entry(day_key(*t, offset))
            .or_insert_with(|| (*t, Vec::new()));
        slot.0 = slot.0.min(*t);
        slot.1.push(*e);
    }
    days.into_iter()
        .map(|(date, (first, group))| (date, first, group))
        .collect()
}

fn medicine_doses(timed: &[(DateTime<Utc>, &TrackerEntry)], offset: FixedOffset) -> Vec<ChartPoint> {
    let mut groups: BTreeMap<(String, String), (DateTime<Utc>, u32)> = BTreeMap::new();
    for (t, e) in timed {
        let name = e.text("medicineName").unwrap_or_default().trim().to_string();
        let slot = groups
            .entry((day_key(*t, offset), name))
            .or_insert((*t, 0));
        slot.0 = slot.0.min(*t);
        slot.1 += 1;
    }
    groups
        .into_iter()
        .map(|((date, medicine_name), (first, doses))| {
            ChartPoint::Medicine(MedicinePoint {
                date,
                start_date_time: format_stamp(first, offset),
                medicine_name,
                doses,
            })
        })
        .collect()
}

fn count(group: &[&TrackerEntry], pred: impl Fn(&TrackerEntry) -> bool) -> u32 {
    group.iter().filter(|e| pred(e)).count() as u32
}

fn volume_ml(entry: &TrackerEntry) -> f64 {
    let volume = entry.number("volume").unwrap_or(0.0);
    match entry.text("unit") {
        Some("oz") => round_to(volume * ML_PER_OZ, 1),
        _ => volume,
    }
}

fn format_stamp(t: DateTime<Utc>, offset: FixedOffset) -> String {
    t.with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Id;
    use crate::time::{TimeRange, utc_offset};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{Value, json};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap()
    }

    fn window() -> Window {
        TimeRange::Last7Days.window(now())
    }

    fn utc() -> FixedOffset {
        utc_offset(0).unwrap()
    }

    fn entry(tracker: TrackerType, n: u32, fields: Value) -> TrackerEntry {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        TrackerEntry {
            entry_id: Id::new(format!("{tracker}_{n}")).unwrap(),
            baby_id: Id::new("baby_1").unwrap(),
            tracker_type: tracker,
            created_at: now(),
            updated_at: None,
            fields,
        }
    }

    #[test]
    fn sleep_hours_per_completed_sleep() {
        let entries = vec![
            entry(TrackerType::Sleep, 1, json!({"startTime": "2024-05-07T20:00:00Z", "endTime": "2024-05-08T05:30:00Z"})),
            entry(TrackerType::Sleep, 2, json!({"startTime": "2024-05-08T10:00:00Z"})),
        ];
        let section = build_section(TrackerType::Sleep, &entries, window(), utc());
        assert_eq!(section.entry_count, 2);
        assert_eq!(
            section.chart_data,
            vec![ChartPoint::Sleep(SleepPoint {
                date: "2024-05-07".into(),
                start_date_time: "2024-05-07T20:00:00Z".into(),
                hours: 9.5,
            })]
        );
    }

    #[test]
    fn entries_outside_window_are_dropped() {
        let entries = vec![
            entry(TrackerType::Bottle, 1, json!({"startTime": "2024-04-01T08:00:00Z", "volume": 100})),
            entry(TrackerType::Bottle, 2, json!({"startTime": "2024-05-08T08:00:00Z", "volume": 120})),
            entry(TrackerType::Bottle, 3, json!({"startTime": "2024-05-09T08:00:00Z", "volume": 140})),
        ];
        let section = build_section(TrackerType::Bottle, &entries, window(), utc());
        assert_eq!(section.entry_count, 1);
        assert_eq!(section.chart_data.len(), 1);
    }

    #[test]
    fn bottle_volume_normalised_to_ml_and_sorted() {
        let entries = vec![
            entry(TrackerType::Bottle, 1, json!({"startTime": "2024-05-08T09:00:00Z", "volume": 4, "unit": "oz"})),
            entry(TrackerType::Bottle, 2, json!({"startTime": "2024-05-08T06:00:00Z", "volume": 120})),
        ];
        let section = build_section(TrackerType::Bottle, &entries, window(), utc());
        let volumes: Vec<f64> = section
            .chart_data
            .iter()
            .map(|p| match p {
                ChartPoint::Bottle(b) => b.volume,
                other => panic!("unexpected point {other:?}"),
            })
            .collect();
        assert_eq!(volumes, vec![120.0, 118.3]);
    }

    #[test]
    fn diaper_counts_per_day() {
        let entries = vec![
            entry(TrackerType::Diaper, 1, json!({"startTime": "2024-05-07T09:00:00Z", "isWet": true, "isDirty": false})),
            entry(TrackerType::Diaper, 2, json!({"startTime": "2024-05-07T07:00:00Z", "isWet": true, "isDirty": true})),
            entry(TrackerType::Diaper, 3, json!({"startTime": "2024-05-08T07:00:00Z", "isWet": false, "isDirty": true})),
        ];
        let section = build_section(TrackerType::Diaper, &entries, window(), utc());
        assert_eq!(
            section.chart_data,
            vec![
                ChartPoint::Diaper(DiaperPoint {
                    date: "2024-05-07".into(),
                    start_date_time: "2024-05-07T07:00:00Z".into(),
                    wet: 2,
                    dirty: 1,
                }),
                ChartPoint::Diaper(DiaperPoint {
                    date: "2024-05-08".into(),
                    start_date_time: "2024-05-08T07:00:00Z".into(),
                    wet: 0,
                    dirty: 1,
                }),
            ]
        );
    }

    #[test]
    fn medicine_doses_per_day_and_name() {
        let entries = vec![
            entry(TrackerType::Medicine, 1, json!({"startTime": "2024-05-07T08:00:00Z", "medicineName": "Vitamin D"})),
            entry(TrackerType::Medicine, 2, json!({"startTime": "2024-05-07T20:00:00Z", "medicineName": "Vitamin D"})),
            entry(TrackerType::Medicine, 3, json!({"startTime": "2024-05-07T12:00:00Z", "medicineName": "Ibuprofen"})),
        ];
        let section = build_section(TrackerType::Medicine, &entries, window(), utc());
        let rows: Vec<(String, u32)> = section
            .chart_data
            .iter()
            .map(|p| match p {
                ChartPoint::Medicine(m) => (m.medicine_name.clone(), m.doses),
                other => panic!("unexpected point {other:?}"),
            })
            .collect();
        assert_eq!(rows, vec![("Vitamin D".into(), 2), ("Ibuprofen".into(), 1)]);
    }

    #[test]
    fn potty_counts_per_day() {
        let entries = vec![
            entry(TrackerType::Potty, 1, json!({"startTime": "2024-05-08T08:00:00Z", "pee": true, "poop": false})),
            entry(TrackerType::Potty, 2, json!({"startTime": "2024-05-08T11:00:00Z", "pee": true, "poop": true})),
        ];
        let section = build_section(TrackerType::Potty, &entries, window(), utc());
        assert_eq!(
            section.chart_data,
            vec![ChartPoint::Potty(PottyPoint {
                date: "2024-05-08".into(),
                start_date_time: "2024-05-08T08:00:00Z".into(),
                pee: 2,
                poop: 1,
            })]
        );
    }

    #[test]
    fn nursing_rows_and_daily_side_totals() {
        let entries = vec![
            entry(TrackerType::Nursing, 1, json!({"startTime": "2024-05-07T08:00:00Z", "side": "left", "duration": 10})),
            entry(TrackerType::Nursing, 2, json!({"startTime": "2024-05-07T11:00:00Z", "side": "right", "duration": 12})),
            entry(TrackerType::Nursing, 3, json!({"startTime": "2024-05-07T14:00:00Z", "side": "left", "duration": 5})),
        ];
        let section = build_section(TrackerType::Nursing, &entries, window(), utc());
        assert_eq!(section.chart_data.len(), 3);
        assert_eq!(
            section.daily_totals,
            Some(vec![NursingDay {
                date: "2024-05-07".into(),
                left: 15.0,
                right: 12.0,
                both: 0.0,
            }])
        );
    }

    #[test]
    fn day_boundaries_follow_offset() {
        let entries = vec![entry(
            TrackerType::Potty,
            1,
            json!({"startTime": "2024-05-07T23:30:00Z", "pee": true, "poop": false}),
        )];
        let section = build_section(TrackerType::Potty, &entries, window(), utc_offset(60).unwrap());
        match &section.chart_data[0] {
            ChartPoint::Potty(p) => {
                assert_eq!(p.date, "2024-05-08");
                assert_eq!(p.start_date_time, "2024-05-08T00:30:00+01:00");
            }
            other => panic!("unexpected point {other:?}"),
        }
    }

    #[test]
    fn chart_rows_serialize_with_parseable_dates_and_numbers() {
        let entries = vec![
            entry(TrackerType::Nursing, 1, json!({"startTime": "2024-05-07T08:00:00Z", "side": "left", "duration": 10})),
            entry(TrackerType::Diaper, 2, json!({"startTime": "2024-05-07T09:00:00Z", "isWet": true, "isDirty": false})),
        ];
        for tracker in [TrackerType::Nursing, TrackerType::Diaper] {
            let section = build_section(tracker, &entries, window(), utc());
            let json = serde_json::to_value(&section).unwrap();
            for row in json["chartData"].as_array().unwrap() {
                let date = row["date"].as_str().unwrap();
                assert!(NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
                assert!(row["startDateTime"].is_string());
            }
        }
    }

    #[test]
    fn sections_read_back_as_the_same_row_kind() {
        let entries = vec![
            entry(TrackerType::Temperature, 1, json!({"startTime": "2024-05-08T08:00:00Z", "temperature": 37.4})),
            entry(TrackerType::Solids, 2, json!({"startTime": "2024-05-08T09:00:00Z", "food": "pear"})),
            entry(TrackerType::Growth, 3, json!({"date": "2024-05-08T10:00:00Z", "weight": 6.1})),
        ];
        for tracker in [TrackerType::Temperature, TrackerType::Solids, TrackerType::Growth] {
            let section = build_section(tracker, &entries, window(), utc());
            let json = serde_json::to_string(&section).unwrap();
            let back: ReportSection = serde_json::from_str(&json).unwrap();
            assert_eq!(back, section);
        }
    }

    #[test]
    fn other_trackers_are_ignored() {
        let entries = vec![entry(
            TrackerType::Bottle,
            1,
            json!({"startTime": "2024-05-08T08:00:00Z", "volume": 100}),
        )];
        let section = build_section(TrackerType::Sleep, &entries, window(), utc());
        assert_eq!(section.entry_count, 0);
        assert!(section.chart_data.is_empty());
        assert!(section.daily_totals.is_none());
    }
}
