use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use strum_macros::AsRefStr;
use strum_macros::Display;
use strum_macros::EnumIter;
use strum_macros::EnumString;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    PrTracked,
    PrStatusChanged,
    PrMerged,
    PrClosed,
    PrUntracked,
    RepoScoreUpdated,
    IssueVetted,
    IssueTracked,
    IssueUntracked,
    SearchCompleted,
    ConfigChanged,
    StateMigrated,
    /// Written by a newer build. The original name stays on the [`Event`].
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRecord", into = "EventRecord")]
pub struct Event {
    pub id: Uuid,
    pub event_type: EventType,
    pub at: DateTime<Utc>,
    pub data: Value,
    /// Wire name of an [`EventType::Unknown`] event, written back as read.
    unrecognized_type: Option<String>,
}

impl Event {
    /// Name as stored in the state file.
    pub fn type_name(&self) -> &str {
        self.unrecognized_type
            .as_deref()
            .unwrap_or(self.event_type.as_ref())
    }
}

/// On-disk shape of an [`Event`].
#[derive(Serialize, Deserialize)]
struct EventRecord {
    id: Uuid,
    #[serde(rename = "type")]
    event_type: String,
    at: DateTime<Utc>,
    #[serde(default)]
    data: Value,
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let (event_type, unrecognized_type) = match EventType::from_str(&record.event_type) {
            Ok(EventType::Unknown) | Err(_) => (EventType::Unknown, Some(record.event_type)),
            Ok(event_type) => (event_type, None),
        };
        Self {
            id: record.id,
            event_type,
            at: record.at,
            data: record.data,
            unrecognized_type,
        }
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        let event_type = event.type_name().to_string();
        Self {
            id: event.id,
            event_type,
            at: event.at,
            data: event.data,
        }
    }
}

/// Append-only log of state transitions. There is no API to edit or remove
/// an entry once recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog(Vec<Event>);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    pub total: usize,
    /// Keyed by stored type name, so unrecognized types are counted apart.
    pub by_type: BTreeMap<String, usize>,
    pub merged: usize,
    pub closed: usize,
    /// Merged over merged+closed, when at least one PR has finished.
    pub merge_rate: Option<f64>,
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}

impl EventLog {
    pub fn append(&mut self, event_type: EventType, data: Value, at: DateTime<Utc>) -> &Event {
        let index = self.0.len();
        self.0.push(Event {
            id: Uuid::new_v4(),
            event_type,
            at,
            data,
            unrecognized_type: None,
        });
        &self.0[index]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.0.iter()
    }

    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &Event> {
        self.0.iter().filter(move |e| e.event_type == event_type)
    }

    pub fn since(&self, at: DateTime<Utc>) -> impl Iterator<Item = &Event> {
        self.0.iter().filter(move |e| e.at >= at)
    }

    pub fn stats(&self) -> EventStats {
        let mut stats = EventStats {
            total: self.0.len(),
            ..Default::default()
        };
        for event in &self.0 {
            *stats.by_type.entry(event.type_name().to_string()).or_default() += 1;
            match event.event_type {
                EventType::PrMerged => stats.merged += 1,
                EventType::PrClosed => stats.closed += 1,
                _ => {}
            }
            stats.first_at = Some(stats.first_at.map_or(event.at, |first| first.min(event.at)));
            stats.last_at = Some(stats.last_at.map_or(event.at, |last| last.max(event.at)));
        }
        let finished = stats.merged + stats.closed;
        if finished > 0 {
            stats.merge_rate = Some(stats.merged as f64 / finished as f64);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn append_assigns_unique_ids_and_keeps_order() {
        let mut log = EventLog::default();
        let first = log.append(EventType::PrTracked, json!({"url": "u1"}), at(1)).id;
        let second = log.append(EventType::PrMerged, json!({"url": "u1"}), at(2)).id;
        assert_ne!(first, second);
        let types: Vec<EventType> = log.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::PrTracked, EventType::PrMerged]);
        assert_eq!(log.since(at(2)).count(), 1);
    }

    #[test]
    fn stats_count_outcomes() {
        let mut log = EventLog::default();
        log.append(EventType::PrMerged, Value::Null, at(3));
        log.append(EventType::PrMerged, Value::Null, at(1));
        log.append(EventType::PrClosed, Value::Null, at(2));
        log.append(EventType::IssueVetted, Value::Null, at(4));

        let stats = log.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.merged, 2);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.by_type.get("pr_merged"), Some(&2));
        assert_eq!(stats.first_at, Some(at(1)));
        assert_eq!(stats.last_at, Some(at(4)));
        let rate = stats.merge_rate.expect("rate");
        assert!((rate - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_event_types_are_written_back_verbatim() {
        let raw = json!([{
            "id": "7d7a4c1e-8f3e-4d7b-9a55-0a6a3c2b9e11",
            "type": "something_new",
            "at": "2026-01-01T00:00:00Z",
            "data": {"k": 1}
        }]);
        let log: EventLog = serde_json::from_value(raw.clone()).expect("decode");
        let event = log.iter().next().expect("event");
        assert_eq!(event.event_type, EventType::Unknown);
        assert_eq!(event.type_name(), "something_new");
        assert_eq!(log.stats().by_type.get("something_new"), Some(&1));

        let back = serde_json::to_value(&log).expect("encode");
        assert_eq!(back, raw);
    }

    #[test]
    fn known_type_names_match_the_wire_format() {
        for event_type in EventType::iter().filter(|t| *t != EventType::Unknown) {
            let mut log = EventLog::default();
            log.append(event_type, Value::Null, at(1));
            let back = serde_json::to_value(&log).expect("encode");
            assert_eq!(back[0]["type"], json!(event_type.to_string()));
            assert_eq!(
                serde_json::to_value(event_type).expect("encode"),
                json!(event_type.as_ref())
            );
            let decoded: EventLog = serde_json::from_value(back).expect("decode");
            assert_eq!(decoded, log);
        }
    }
}
