//! Wire types for the planning backend.
//!
//! Task records and schedule events are passed through as raw JSON; only the
//! envelopes are typed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schedule::ScheduledEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRequest {
    pub text: String,
    /// `YYYY-MM-DD`
    pub date_iso: String,
}

impl ParseRequest {
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            text: text.into(),
            date_iso: date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    #[serde(default)]
    pub tasks: Vec<Value>,
}

/// A span of the day the optimizer may fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeWindow {
    pub start: String,
    pub end: String,
}

impl FreeWindow {
    /// `{date}T{start:02}:00:00` to `{date}T{end:02}:00:00`.
    pub fn workday(date: NaiveDate, start_hour: u32, end_hour: u32) -> Self {
        let day = date.format("%Y-%m-%d");
        Self {
            start: format!("{day}T{start_hour:02}:00:00"),
            end: format!("{day}T{end_hour:02}:00:00"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    /// Parse records exactly as the backend returned them.
    pub tasks: Vec<Value>,
    /// Omitted to let the backend use its default working window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_windows: Option<Vec<FreeWindow>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub events: Vec<ScheduledEvent>,
}
