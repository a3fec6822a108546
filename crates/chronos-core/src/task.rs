//! Normalized task type and the mapping from backend task records.
//!
//! The parse endpoint returns loosely shaped records: the title may be called
//! `summary`, the duration `duration`, the fixed time `start_time`, and the
//! priority may be a label such as `"P1"` or a bare number. Everything here is
//! lenient and falls back to defaults rather than failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::timeline::{format_clock, parse_iso};

/// Duration assumed when a record carries none.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

const UNTITLED: &str = "Untitled task";

/// Task priority, P1 being the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Priority {
    /// Normalize a backend priority value.
    ///
    /// Missing (or `null`) means P2. Otherwise the value is read as text and
    /// the first rule that applies wins: contains `1` is P1, contains `2` is
    /// P2, anything else is P3. So `"P1-high"` is P1 and `"urgent"` is P3.
    pub fn normalize(value: Option<&Value>) -> Self {
        let text = match value {
            None | Some(Value::Null) => return Priority::P2,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        if text.contains('1') {
            Priority::P1
        } else if text.contains('2') {
            Priority::P2
        } else {
            Priority::P3
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::P1 => 1,
            Self::P2 => 2,
            Self::P3 => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P2
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.as_u8()
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::P1),
            2 => Ok(Self::P2),
            3 => Ok(Self::P3),
            other => Err(format!("priority must be 1, 2 or 3, got {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A task ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    pub priority: Priority,
    /// `HH:MM` on the planned day, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

impl Task {
    /// Map one backend record. `index` is the record's position and is only
    /// used to synthesize an id when the record has none.
    pub fn from_record(record: &Value, index: usize) -> Self {
        let id = non_empty_str(record.get("id"))
            .map(str::to_string)
            .or_else(|| record.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
            .unwrap_or_else(|| format!("t{}", index + 1));

        let title = non_empty_str(record.get("title"))
            .or_else(|| non_empty_str(record.get("summary")))
            .unwrap_or(UNTITLED)
            .to_string();

        let start_time = fixed_time(record).map(|iso| {
            parse_iso(iso)
                .map(|dt| format_clock(dt.time()))
                .unwrap_or_else(|| iso.to_string())
        });

        Self {
            id,
            title,
            duration_minutes: duration_minutes(record),
            priority: Priority::normalize(record.get("priority")),
            start_time,
        }
    }

    /// Duration in hours, as the timeline measures it.
    pub fn duration_hours(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }
}

/// Map every record in backend order.
pub fn normalize_tasks(records: &[Value]) -> Vec<Task> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| Task::from_record(record, i))
        .collect()
}

/// The record's fixed timestamp (`fixed_time_iso`, else `start_time`), if any.
pub fn fixed_time(record: &Value) -> Option<&str> {
    non_empty_str(record.get("fixed_time_iso")).or_else(|| non_empty_str(record.get("start_time")))
}

/// `estimated_duration_minutes`, else `duration`. Anything missing,
/// non-numeric or not positive counts as absent.
fn duration_minutes(record: &Value) -> u32 {
    let raw = record
        .get("estimated_duration_minutes")
        .filter(|v| !v.is_null())
        .or_else(|| record.get("duration").filter(|v| !v.is_null()));

    let minutes = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match minutes {
        Some(m) if m.is_finite() && m >= 0.5 => m.round().min(f64::from(u32::MAX)) as u32,
        _ => DEFAULT_DURATION_MINUTES,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
