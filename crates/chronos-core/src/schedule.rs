//! Raw optimizer output and start-time back-filling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::Task;
use crate::timeline::{format_clock, parse_iso};

/// One entry of the optimizer's schedule, kept exactly as received.
///
/// The sync endpoint expects the events verbatim, so this wraps the JSON value
/// instead of deserializing into a struct that could drop unknown fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduledEvent(Value);

impl ScheduledEvent {
    pub fn event_type(&self) -> Option<&str> {
        self.str_field("event_type")
    }

    /// Whether the optimizer labelled this entry as a task (rather than a
    /// break or buffer).
    pub fn is_task(&self) -> bool {
        self.event_type()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("task"))
    }

    pub fn summary(&self) -> Option<&str> {
        self.str_field("summary")
    }

    pub fn start_iso(&self) -> Option<&str> {
        self.str_field("start_iso")
    }

    pub fn end_iso(&self) -> Option<&str> {
        self.str_field("end_iso")
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id").filter(|s| !s.is_empty())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Value> for ScheduledEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Fill in each task's start time from the optimizer's task placements.
///
/// A task matches a placement when either title contains the other,
/// ignoring case. The first matching placement in schedule order wins, so
/// duplicate or overlapping titles can land on the same slot; this is a
/// display hint, not a reliable assignment. Tasks without a match keep their
/// existing start time. Returns a new list; the input is untouched.
pub fn with_start_times(tasks: &[Task], schedule: &[ScheduledEvent]) -> Vec<Task> {
    let placements: Vec<(String, String)> = schedule
        .iter()
        .filter(|event| event.is_task())
        .filter_map(|event| {
            let summary = event.summary()?.trim().to_lowercase();
            if summary.is_empty() {
                return None;
            }
            let start = parse_iso(event.start_iso()?)?;
            Some((summary, format_clock(start.time())))
        })
        .collect();

    tasks
        .iter()
        .map(|task| {
            let title = task.title.trim().to_lowercase();
            let matched = (!title.is_empty())
                .then(|| {
                    placements
                        .iter()
                        .find(|(summary, _)| summary.contains(&title) || title.contains(summary))
                })
                .flatten();

            match matched {
                Some((_, start)) => Task {
                    start_time: Some(start.clone()),
                    ..task.clone()
                },
                None => task.clone(),
            }
        })
        .collect()
}
