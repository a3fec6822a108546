//! Timeline event types and utilities.
//!
//! Timeline positions are measured in fractional hours since midnight of the
//! planned day, so 13:30 is `13.5`.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schedule::ScheduledEvent;
use crate::task::{fixed_time, Task};

/// First hour drawn on the timeline grid.
pub const GRID_START_HOUR: u32 = 8;
/// Last hour drawn on the timeline grid.
pub const GRID_END_HOUR: u32 = 20;

/// Where a timeline entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Already on the user's calendar.
    Existing,
    /// Placed by the planner.
    Proposed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::Proposed => "proposed",
        }
    }
}

/// A single block on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub start_hour: f64,
    pub duration_hours: f64,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn existing(
        id: impl Into<String>,
        title: impl Into<String>,
        start_hour: f64,
        duration_hours: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_hour,
            duration_hours,
            kind: EventKind::Existing,
        }
    }

    pub fn proposed(
        id: impl Into<String>,
        title: impl Into<String>,
        start_hour: f64,
        duration_hours: f64,
    ) -> Self {
        Self {
            kind: EventKind::Proposed,
            ..Self::existing(id, title, start_hour, duration_hours)
        }
    }

    pub fn end_hour(&self) -> f64 {
        self.start_hour + self.duration_hours
    }

    /// Check if this event overlaps with another
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_hour < other.end_hour() && self.end_hour() > other.start_hour
    }
}

/// Proposed events for tasks that were parsed with a fixed timestamp.
///
/// `records` and `tasks` are parallel: `tasks[i]` is the normalized form of
/// `records[i]`.
pub fn events_from_fixed_tasks(records: &[Value], tasks: &[Task]) -> Vec<TimelineEvent> {
    records
        .iter()
        .zip(tasks)
        .filter_map(|(record, task)| {
            let at = parse_iso(fixed_time(record)?)?;
            Some(TimelineEvent::proposed(
                format!("p-{}", task.id),
                task.title.clone(),
                hour_of_day(&at),
                task.duration_hours(),
            ))
        })
        .collect()
}

/// Proposed events for the optimizer's `"task"` placements.
///
/// Breaks, buffers and anything else stay out of the timeline (they remain in
/// the raw schedule). Entries whose start or end cannot be read are skipped.
/// An entry without an id gets `"{index}-{summary}"`, index being its position
/// in the full schedule.
pub fn events_from_schedule(schedule: &[ScheduledEvent]) -> Vec<TimelineEvent> {
    schedule
        .iter()
        .enumerate()
        .filter(|(_, event)| event.is_task())
        .filter_map(|(index, event)| {
            let start = parse_iso(event.start_iso()?)?;
            let end = parse_iso(event.end_iso()?)?;
            let minutes = (end - start).num_minutes().max(0);
            let summary = event.summary().unwrap_or_default();
            let id = event
                .id()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{index}-{summary}"));
            Some(TimelineEvent::proposed(
                id,
                summary,
                hour_of_day(&start),
                minutes as f64 / 60.0,
            ))
        })
        .collect()
}

/// Existing and proposed events together, ordered by start.
pub fn merge_for_display(existing: &[TimelineEvent], proposed: &[TimelineEvent]) -> Vec<TimelineEvent> {
    let mut all: Vec<TimelineEvent> = existing.iter().chain(proposed).cloned().collect();
    all.sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));
    all
}

/// Hours labelled on the grid.
pub fn hour_grid() -> impl Iterator<Item = u32> {
    GRID_START_HOUR..=GRID_END_HOUR
}

/// Parse the timestamps the backend emits.
///
/// Accepts naive ISO date-times (`2024-01-01T10:00:00`, with or without
/// seconds or fractions) and RFC 3339 with an offset, in which case the wall
/// clock time at that offset is kept.
pub fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Fractional hours since midnight.
pub fn hour_of_day(at: &NaiveDateTime) -> f64 {
    f64::from(at.hour()) + f64::from(at.minute()) / 60.0 + f64::from(at.second()) / 3600.0
}

/// `HH:MM` for a wall-clock time.
pub fn format_clock(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// `HH:MM` for fractional hours, rounded to the nearest minute.
pub fn format_hour(decimal_hour: f64) -> String {
    let total = (decimal_hour * 60.0).round().max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
