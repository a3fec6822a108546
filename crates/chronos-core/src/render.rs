//! Plain-text widgets for a planning session.
//!
//! Each renderer is a pure function of session data and returns the lines to
//! print, without trailing newline. Colouring is left to the caller.

use std::fmt::Write;

use crate::planner::PlanSnapshot;
use crate::progress::{ProcessingState, StepStatus};
use crate::task::Task;
use crate::timeline::{
    format_hour, hour_grid, EventKind, TimelineEvent, GRID_END_HOUR, GRID_START_HOUR,
};

pub fn step_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Done => "[x]",
        StepStatus::Active => "[>]",
        StepStatus::Pending => "[ ]",
    }
}

/// The "Thought Process" panel, or `None` while there is nothing to show.
pub fn render_status_panel(progress: &ProcessingState) -> Option<String> {
    if !progress.is_running() && progress.revealed_steps().is_empty() {
        return None;
    }

    let mut out = String::from("Thought Process");
    if progress.is_running() {
        out.push_str("  (Processing)");
    }
    for (index, label) in progress.revealed_steps().iter().enumerate() {
        let _ = write!(out, "\n  {} {label}", step_marker(progress.status_of(index)));
    }
    Some(out)
}

pub fn render_task_card(task: &Task) -> String {
    let mut out = format!(
        "{}  {}m  {}",
        task.priority.label(),
        task.duration_minutes,
        task.title
    );
    if let Some(start) = &task.start_time {
        let _ = write!(out, "\n    Scheduled: {start}");
    }
    out
}

pub fn render_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "Tasks (0)\n  No tasks yet".to_string();
    }
    let mut out = format!("Tasks ({})", tasks.len());
    for task in tasks {
        for line in render_task_card(task).lines() {
            let _ = write!(out, "\n  {line}");
        }
    }
    out
}

/// A proposed event that runs into an existing one is flagged.
fn render_event(event: &TimelineEvent, all: &[TimelineEvent]) -> String {
    let mut out = format!(
        "{} - {}  {:<8}  {}",
        format_hour(event.start_hour),
        format_hour(event.end_hour()),
        event.kind.as_str(),
        event.title
    );
    let clashes = event.kind == EventKind::Proposed
        && all
            .iter()
            .any(|other| other.kind == EventKind::Existing && event.overlaps(other));
    if clashes {
        out.push_str("  (overlaps calendar)");
    }
    out
}

/// Hour grid from 08:00 to 20:00 with each event on the row of its start
/// hour. Events starting outside the grid are listed after it.
pub fn render_timeline(events: &[TimelineEvent], processing: bool) -> String {
    let mut out = String::from("Timeline");
    if processing {
        out.push_str("\n  Optimizing your schedule...");
    }

    for hour in hour_grid() {
        let _ = write!(out, "\n  {hour:02}:00 |");
        for event in events.iter().filter(|e| e.start_hour.floor() as i64 == i64::from(hour)) {
            let _ = write!(out, "\n        | {}", render_event(event, events));
        }
    }

    let outside: Vec<&TimelineEvent> = events
        .iter()
        .filter(|e| {
            e.start_hour < f64::from(GRID_START_HOUR) || e.start_hour >= f64::from(GRID_END_HOUR + 1)
        })
        .collect();
    if !outside.is_empty() {
        out.push_str("\n  Outside the grid:");
        for event in outside {
            let _ = write!(out, "\n    {}", render_event(event, events));
        }
    }
    out
}

/// Offered actions, or `None` when the bar is hidden.
pub fn render_action_bar(snapshot: &PlanSnapshot) -> Option<String> {
    if !snapshot.action_bar_visible() {
        return None;
    }
    let sync = if snapshot.can_sync() {
        format!("[sync] Sync to Calendar ({} events)", snapshot.schedule.len())
    } else {
        "[sync] Sync to Calendar (nothing scheduled)".to_string()
    };
    Some(format!("{sync}   [refine] Refine"))
}

/// Every visible widget, separated by blank lines.
pub fn render_snapshot(snapshot: &PlanSnapshot) -> String {
    let mut sections = Vec::new();
    if let Some(panel) = render_status_panel(&snapshot.progress) {
        sections.push(panel);
    }
    sections.push(render_task_list(&snapshot.tasks));
    sections.push(render_timeline(&snapshot.events, snapshot.is_processing()));
    if let Some(bar) = render_action_bar(snapshot) {
        sections.push(bar);
    }
    sections.join("\n\n")
}
