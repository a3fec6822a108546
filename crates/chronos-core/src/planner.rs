//! Planning session orchestration.
//!
//! A [`Planner`] owns one planning session. `submit` runs the paced agent
//! steps and the parse call side by side, applies the parse result once both
//! are done, then asks the backend to optimize. Backend failures never escape:
//! they turn into empty defaults plus a [`Notification`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Submitting -> AwaitingParse -> Optimizing -> Ready
//!                                                       |
//! Ready -> Submitting -> ...   (next brain dump)        v
//!                                              sync() / refine()
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let (planner, mut events) = Planner::with_events(backend, settings);
//! let outcome = planner.submit("gym, write report", today).await?;
//! let snapshot = planner.snapshot();
//! planner.sync().await;
//! ```

use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::api::{FreeWindow, OptimizeRequest, ParseRequest, PlannerBackend, ScheduleRequest};
use crate::error::PlannerError;
use crate::events::{Notification, PlannerEvent};
use crate::progress::{ProcessingState, StepPacing, DEFAULT_STEPS};
use crate::schedule::{with_start_times, ScheduledEvent};
use crate::task::{normalize_tasks, Task};
use crate::timeline::{events_from_fixed_tasks, events_from_schedule, merge_for_display, TimelineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerState {
    Idle,
    Submitting,
    AwaitingParse,
    Optimizing,
    /// Resting state after a submission, successful or not.
    Ready,
}

impl PlannerState {
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingParse | Self::Optimizing)
    }
}

/// Construction-time settings for a planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub steps: Vec<String>,
    pub pacing: StepPacing,
    /// Calendar entries already on the day, drawn under the proposal.
    pub existing_events: Vec<TimelineEvent>,
    /// `(start, end)` hours offered to the optimizer.
    pub workday_hours: Option<(u32, u32)>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.iter().map(|s| s.to_string()).collect(),
            pacing: StepPacing::default(),
            existing_events: Vec::new(),
            workday_hours: None,
        }
    }
}

/// What a finished submission produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub tasks: usize,
    /// Raw schedule entries stored for sync.
    pub scheduled: usize,
    /// Whether the optimizer returned a usable schedule.
    pub optimized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No schedule stored; no request was made.
    NothingToSync,
    Synced { events: usize },
    Failed,
}

/// A consistent copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSnapshot {
    pub state: PlannerState,
    pub progress: ProcessingState,
    pub tasks: Vec<Task>,
    /// Existing and proposed events, ordered by start.
    pub events: Vec<TimelineEvent>,
    pub schedule: Vec<ScheduledEvent>,
}

impl PlanSnapshot {
    pub fn is_processing(&self) -> bool {
        self.state.is_processing()
    }

    pub fn can_sync(&self) -> bool {
        !self.schedule.is_empty()
    }

    /// The sync/refine actions are offered once there is something to act on.
    pub fn action_bar_visible(&self) -> bool {
        !self.tasks.is_empty() && !self.is_processing()
    }

    pub fn proposed_events(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == crate::timeline::EventKind::Proposed)
    }
}

#[derive(Debug)]
struct Session {
    state: PlannerState,
    progress: ProcessingState,
    tasks: Vec<Task>,
    proposed: Vec<TimelineEvent>,
    schedule: Vec<ScheduledEvent>,
}

struct Inner<B> {
    backend: B,
    settings: PlannerSettings,
    session: Mutex<Session>,
    in_flight: AtomicBool,
    events: Option<mpsc::UnboundedSender<PlannerEvent>>,
}

impl<B> Inner<B> {
    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    fn emit(&self, event: PlannerEvent) {
        if let Some(tx) = &self.events {
            // Nobody listening is fine.
            let _ = tx.send(event);
        }
    }
}

/// Held for the lifetime of one submission.
///
/// Dropping it clears the in-flight flag. If the submission did not run to
/// completion (its future was dropped part way), the session is also put
/// back to rest: `Idle` before the parse results were applied, `Ready`
/// after.
struct SubmitGuard<'a, B> {
    inner: &'a Inner<B>,
    applied: bool,
    completed: bool,
}

impl<'a, B> SubmitGuard<'a, B> {
    fn acquire(inner: &'a Inner<B>) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner,
                applied: false,
                completed: false,
            })
    }
}

impl<B> Drop for SubmitGuard<'_, B> {
    fn drop(&mut self) {
        if !self.completed {
            let state = if self.applied {
                PlannerState::Ready
            } else {
                PlannerState::Idle
            };
            let interrupted = self.inner.with_session(|s| {
                if !s.state.is_processing() {
                    return false;
                }
                s.progress.stop();
                s.state = state;
                true
            });
            if interrupted {
                warn!("submission dropped before completion, session back to {state:?}");
                self.inner.emit(PlannerEvent::StateChanged { state });
            }
        }
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

/// Orchestrates one planning session against a [`PlannerBackend`].
///
/// Cloning is cheap and every clone drives the same session. The session
/// lock is never held across an await, and displayed collections are always
/// replaced whole.
pub struct Planner<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Planner<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: PlannerBackend> Planner<B> {
    pub fn new(backend: B, settings: PlannerSettings) -> Self {
        Self::build(backend, settings, None)
    }

    /// Like [`new`](Self::new), also returning the stream of session events.
    pub fn with_events(
        backend: B,
        settings: PlannerSettings,
    ) -> (Self, mpsc::UnboundedReceiver<PlannerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::build(backend, settings, Some(tx)), rx)
    }

    fn build(
        backend: B,
        settings: PlannerSettings,
        events: Option<mpsc::UnboundedSender<PlannerEvent>>,
    ) -> Self {
        let session = Session {
            state: PlannerState::Idle,
            progress: ProcessingState::new(settings.steps.clone()),
            tasks: Vec::new(),
            proposed: Vec::new(),
            schedule: Vec::new(),
        };
        Self {
            inner: Arc::new(Inner {
                backend,
                settings,
                session: Mutex::new(session),
                in_flight: AtomicBool::new(false),
                events,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whether a submission is running.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PlannerState {
        self.with_session(|s| s.state)
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        self.with_session(|s| PlanSnapshot {
            state: s.state,
            progress: s.progress.clone(),
            tasks: s.tasks.clone(),
            events: merge_for_display(&self.inner.settings.existing_events, &s.proposed),
            schedule: s.schedule.clone(),
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Turn a brain dump into tasks and a proposed schedule.
    ///
    /// # Errors
    ///
    /// Only input problems are errors: an empty brain dump, or another
    /// submission still running. Backend failures are reported through
    /// notifications and the submission still completes.
    pub async fn submit(&self, text: &str, date: NaiveDate) -> Result<SubmitOutcome, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::EmptyInput);
        }
        let mut guard =
            SubmitGuard::acquire(&self.inner).ok_or(PlannerError::SubmissionInFlight)?;

        info!("planning {} characters for {date}", text.len());
        self.transition(|s| s.progress.start(), PlannerState::Submitting);

        let request = ParseRequest::new(text, date);
        self.transition(|_| (), PlannerState::AwaitingParse);

        let (_, parsed) = tokio::join!(self.run_steps(), self.inner.backend.parse(&request));

        let records = match parsed {
            Ok(response) => {
                if response.tasks.is_empty() {
                    self.notify(
                        Notification::info("No tasks found")
                            .with_description("Try describing what you want to get done today."),
                    );
                }
                response.tasks
            }
            Err(e) => {
                error!("parse request failed: {e}");
                self.notify(
                    Notification::error("Couldn't read your brain dump")
                        .with_description(e.to_string()),
                );
                Vec::new()
            }
        };

        let tasks = normalize_tasks(&records);
        let proposed = events_from_fixed_tasks(&records, &tasks);
        let task_count = tasks.len();
        debug!("parsed {task_count} tasks, {} with a fixed time", proposed.len());

        self.transition(
            move |s| {
                s.tasks = tasks;
                s.proposed = proposed;
                s.schedule = Vec::new();
            },
            PlannerState::Optimizing,
        );
        guard.applied = true;
        self.emit(PlannerEvent::TasksParsed { count: task_count });

        let (scheduled, optimized) = self.optimize(records, date).await;

        self.transition(|s| s.progress.finish(), PlannerState::Ready);
        guard.completed = true;

        let noun = if task_count == 1 { "task" } else { "tasks" };
        let notification = if optimized {
            Notification::success("Schedule optimized!").with_description(format!(
                "Found {task_count} {noun} and scheduled them around your existing events."
            ))
        } else {
            Notification::success("Planning complete")
                .with_description(format!("Found {task_count} {noun}."))
        };
        self.notify(notification);

        Ok(SubmitOutcome {
            tasks: task_count,
            scheduled,
            optimized,
        })
    }

    /// Push the stored schedule to the calendar.
    ///
    /// Tasks and events are left untouched whatever the outcome.
    pub async fn sync(&self) -> SyncOutcome {
        let events = self.with_session(|s| s.schedule.clone());
        if events.is_empty() {
            self.notify(
                Notification::warning("Nothing to sync")
                    .with_description("Plan your day before syncing it to your calendar."),
            );
            return SyncOutcome::NothingToSync;
        }

        let count = events.len();
        match self.inner.backend.schedule(&ScheduleRequest { events }).await {
            Ok(body) => {
                debug!("schedule response: {body}");
                info!("synced {count} events");
                self.notify(
                    Notification::success("Synced to Google Calendar!")
                        .with_description("Your optimized schedule has been added to your calendar."),
                );
                SyncOutcome::Synced { events: count }
            }
            Err(e) => {
                error!("schedule request failed: {e}");
                self.notify(Notification::error("Calendar sync failed").with_description(e.to_string()));
                SyncOutcome::Failed
            }
        }
    }

    /// Interactive reordering is not available yet; this only tells the user.
    pub fn refine(&self) -> Notification {
        let notification = Notification::info("Opening refinement mode...")
            .with_description("Drag tasks to reorder or adjust times.");
        self.notify(notification.clone());
        notification
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Walk the step labels on the pacing timer. Never waits on the backend.
    async fn run_steps(&self) {
        let pacing = self.inner.settings.pacing;
        for (index, label) in self.inner.settings.steps.iter().enumerate() {
            if self.with_session(|s| s.progress.advance_to(index)) {
                self.emit(PlannerEvent::StepStarted {
                    index,
                    label: label.clone(),
                });
            }
            if !pacing.is_instant() {
                tokio::time::sleep(pacing.delay()).await;
            }
        }
        self.emit(PlannerEvent::StepsFinished);
    }

    /// Returns `(stored schedule entries, optimized)`.
    async fn optimize(&self, records: Vec<serde_json::Value>, date: NaiveDate) -> (usize, bool) {
        let request = OptimizeRequest {
            tasks: records,
            free_windows: self
                .inner
                .settings
                .workday_hours
                .map(|(start, end)| vec![FreeWindow::workday(date, start, end)]),
        };

        match self.inner.backend.optimize(&request).await {
            Ok(response) if response.events.is_empty() => {
                warn!("optimizer returned no events");
                self.notify(
                    Notification::warning("Nothing could be scheduled")
                        .with_description("No free slot fits the tasks that were found."),
                );
                (0, false)
            }
            Ok(response) => {
                let events = response.events;
                let scheduled = events.len();
                let placed = events_from_schedule(&events);
                let placed_count = placed.len();
                self.with_session(move |s| {
                    s.tasks = with_start_times(&s.tasks, &events);
                    s.proposed = placed;
                    s.schedule = events;
                });
                self.emit(PlannerEvent::ScheduleOptimized {
                    scheduled,
                    placed: placed_count,
                });
                (scheduled, true)
            }
            Err(e) => {
                warn!("optimize request failed: {e}");
                self.notify(
                    Notification::warning("Couldn't optimize your schedule")
                        .with_description(format!("Showing the parsed tasks as they are. ({e})")),
                );
                (0, false)
            }
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        self.inner.with_session(f)
    }

    fn transition(&self, f: impl FnOnce(&mut Session), state: PlannerState) {
        self.with_session(|s| {
            f(s);
            s.state = state;
        });
        self.emit(PlannerEvent::StateChanged { state });
    }

    fn notify(&self, notification: Notification) {
        debug!(
            "notify [{}] {}",
            notification.severity.as_str(),
            notification.title
        );
        self.emit(PlannerEvent::Notified(notification));
    }

    fn emit(&self, event: PlannerEvent) {
        self.inner.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OptimizeResponse, ParseResponse};
    use crate::error::ApiError;
    use crate::events::Severity;
    use crate::task::Priority;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockBackend {
        parse_tasks: Option<Vec<Value>>,
        optimize_events: Option<Vec<Value>>,
        schedule_ok: bool,
        parse_gate: Option<Arc<Notify>>,
        optimize_gate: Option<Arc<Notify>>,
        parse_calls: AtomicUsize,
        optimize_requests: Mutex<Vec<OptimizeRequest>>,
        schedule_requests: Mutex<Vec<ScheduleRequest>>,
    }

    fn failure(endpoint: &'static str) -> ApiError {
        ApiError::Status {
            endpoint,
            status: 500,
            body: "boom".into(),
        }
    }

    #[async_trait]
    impl PlannerBackend for MockBackend {
        async fn parse(&self, _request: &ParseRequest) -> Result<ParseResponse, ApiError> {
            self.parse_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.parse_gate {
                gate.notified().await;
            }
            self.parse_tasks
                .clone()
                .map(|tasks| ParseResponse { tasks })
                .ok_or_else(|| failure("/api/parse"))
        }

        async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError> {
            self.optimize_requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.optimize_gate {
                gate.notified().await;
            }
            self.optimize_events
                .clone()
                .map(|events| OptimizeResponse {
                    events: events.into_iter().map(ScheduledEvent::from).collect(),
                })
                .ok_or_else(|| failure("/api/optimize"))
        }

        async fn schedule(&self, request: &ScheduleRequest) -> Result<Value, ApiError> {
            self.schedule_requests.lock().unwrap().push(request.clone());
            if self.schedule_ok {
                Ok(json!({"status": "ok"}))
            } else {
                Err(failure("/api/schedule"))
            }
        }
    }

    fn settings() -> PlannerSettings {
        PlannerSettings {
            pacing: StepPacing::instant(),
            ..PlannerSettings::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PlannerEvent>) -> Vec<PlannerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn notifications(events: &[PlannerEvent]) -> Vec<Notification> {
        events
            .iter()
            .filter_map(|e| match e {
                PlannerEvent::Notified(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn write_report_backend() -> MockBackend {
        MockBackend {
            parse_tasks: Some(vec![json!({
                "title": "Write report",
                "estimated_duration_minutes": 60,
                "priority": "P1"
            })]),
            optimize_events: Some(vec![json!({
                "event_type": "task",
                "summary": "Write report",
                "start_iso": "2024-01-01T10:00:00",
                "end_iso": "2024-01-01T11:00:00"
            })]),
            schedule_ok: true,
            ..MockBackend::default()
        }
    }

    #[tokio::test]
    async fn submit_write_report_end_to_end() {
        let (planner, mut rx) = Planner::with_events(write_report_backend(), settings());
        let outcome = planner
            .submit("Write report; call Bob 30 min", today())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome {
                tasks: 1,
                scheduled: 1,
                optimized: true
            }
        );

        let snap = planner.snapshot();
        assert_eq!(snap.state, PlannerState::Ready);
        assert!(snap.progress.is_finished());
        assert_eq!(snap.progress.current_index(), snap.progress.steps().len());

        let task = &snap.tasks[0];
        assert_eq!(task.title, "Write report");
        assert_eq!(task.duration_minutes, 60);
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.start_time.as_deref(), Some("10:00"));

        let proposed: Vec<_> = snap.proposed_events().collect();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].start_hour, 10.0);
        assert_eq!(proposed[0].duration_hours, 1.0);
        assert!(snap.can_sync());
        assert!(snap.action_bar_visible());

        let events = drain(&mut rx);
        let steps = events
            .iter()
            .filter(|e| matches!(e, PlannerEvent::StepStarted { .. }))
            .count();
        assert_eq!(steps, 7);
        let last = notifications(&events).pop().unwrap();
        assert_eq!(last.severity, Severity::Success);
        assert!(last.description.unwrap().contains("Found 1 task"));
    }

    #[tokio::test]
    async fn steps_finish_before_parse_results_are_applied() {
        let (planner, mut rx) = Planner::with_events(write_report_backend(), settings());
        planner.submit("Write report", today()).await.unwrap();

        let events = drain(&mut rx);
        let finished = events
            .iter()
            .position(|e| matches!(e, PlannerEvent::StepsFinished))
            .unwrap();
        let parsed = events
            .iter()
            .position(|e| matches!(e, PlannerEvent::TasksParsed { .. }))
            .unwrap();
        assert!(finished < parsed);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_state_change() {
        let planner = Planner::new(write_report_backend(), settings());
        assert_eq!(
            planner.submit("   \n", today()).await,
            Err(PlannerError::EmptyInput)
        );
        assert_eq!(planner.state(), PlannerState::Idle);
        assert_eq!(planner.inner.backend.parse_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_tasks_still_optimizes_with_empty_list() {
        let backend = MockBackend {
            parse_tasks: Some(vec![]),
            optimize_events: Some(vec![]),
            ..MockBackend::default()
        };
        let (planner, mut rx) = Planner::with_events(backend, settings());
        let outcome = planner.submit("nothing much", today()).await.unwrap();

        assert_eq!(outcome.tasks, 0);
        let snap = planner.snapshot();
        assert_eq!(snap.state, PlannerState::Ready);
        assert!(snap.tasks.is_empty());
        assert_eq!(snap.proposed_events().count(), 0);
        assert!(!snap.action_bar_visible());

        let requests = planner.inner.backend.optimize_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tasks.is_empty());

        let notes = notifications(&drain(&mut rx));
        assert!(notes.iter().any(|n| n.title == "No tasks found"));
        assert!(notes.iter().any(|n| n.title == "Nothing could be scheduled"));
    }

    #[tokio::test]
    async fn parse_failure_becomes_empty_plan_with_error() {
        let backend = MockBackend {
            parse_tasks: None,
            optimize_events: Some(vec![]),
            ..MockBackend::default()
        };
        let (planner, mut rx) = Planner::with_events(backend, settings());
        let outcome = planner.submit("gym", today()).await.unwrap();

        assert_eq!(outcome.tasks, 0);
        assert_eq!(planner.state(), PlannerState::Ready);
        let notes = notifications(&drain(&mut rx));
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(notes.last().unwrap().severity, Severity::Success);
    }

    #[tokio::test]
    async fn non_task_events_leave_timeline_empty_but_sync_enabled() {
        let backend = MockBackend {
            parse_tasks: Some(vec![json!({"title": "Stretch"})]),
            optimize_events: Some(vec![json!({
                "event_type": "break",
                "summary": "Break",
                "start_iso": "2024-01-01T11:00:00",
                "end_iso": "2024-01-01T11:10:00"
            })]),
            ..MockBackend::default()
        };
        let planner = Planner::new(backend, settings());
        planner.submit("stretch", today()).await.unwrap();

        let snap = planner.snapshot();
        assert_eq!(snap.proposed_events().count(), 0);
        assert_eq!(snap.schedule.len(), 1);
        assert!(snap.can_sync());
    }

    #[tokio::test]
    async fn optimize_failure_keeps_parsed_tasks_and_warns() {
        let backend = MockBackend {
            parse_tasks: Some(vec![json!({
                "id": "t1",
                "title": "Dentist",
                "fixed_time_iso": "2024-01-01T13:00:00"
            })]),
            optimize_events: None,
            ..MockBackend::default()
        };
        let (planner, mut rx) = Planner::with_events(backend, settings());
        let outcome = planner.submit("dentist at 1pm", today()).await.unwrap();

        assert!(!outcome.optimized);
        let snap = planner.snapshot();
        assert_eq!(snap.tasks.len(), 1);
        assert_eq!(snap.tasks[0].start_time.as_deref(), Some("13:00"));
        assert_eq!(snap.proposed_events().count(), 1);
        assert!(!snap.can_sync());

        let notes = notifications(&drain(&mut rx));
        assert!(notes
            .iter()
            .any(|n| n.severity == Severity::Warning && n.title == "Couldn't optimize your schedule"));
        let last = notes.last().unwrap();
        assert_eq!(last.title, "Planning complete");
        assert_eq!(last.description.as_deref(), Some("Found 1 task."));
    }

    #[tokio::test]
    async fn optimize_receives_raw_records_and_free_windows() {
        let record = json!({"id": "t1", "title": "Gym", "priority": "P3", "constraint_type": "flexible"});
        let backend = MockBackend {
            parse_tasks: Some(vec![record.clone()]),
            optimize_events: Some(vec![]),
            ..MockBackend::default()
        };
        let planner = Planner::new(
            backend,
            PlannerSettings {
                workday_hours: Some((9, 18)),
                ..settings()
            },
        );
        planner.submit("gym", today()).await.unwrap();

        let requests = planner.inner.backend.optimize_requests.lock().unwrap();
        assert_eq!(requests[0].tasks, vec![record]);
        let windows = requests[0].free_windows.as_ref().unwrap();
        assert_eq!(windows[0].start, "2024-01-01T09:00:00");
    }

    #[tokio::test]
    async fn sync_without_schedule_warns_and_skips_network() {
        let (planner, mut rx) = Planner::with_events(write_report_backend(), settings());
        assert_eq!(planner.sync().await, SyncOutcome::NothingToSync);
        assert!(planner.inner.backend.schedule_requests.lock().unwrap().is_empty());
        let notes = notifications(&drain(&mut rx));
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn sync_forwards_raw_schedule_verbatim() {
        let planner = Planner::new(write_report_backend(), settings());
        planner.submit("Write report", today()).await.unwrap();
        let before = planner.snapshot();

        assert_eq!(planner.sync().await, SyncOutcome::Synced { events: 1 });

        let requests = planner.inner.backend.schedule_requests.lock().unwrap();
        assert_eq!(requests[0].events, before.schedule);
        assert_eq!(planner.snapshot(), before);
    }

    #[tokio::test]
    async fn sync_failure_is_reported_and_state_kept() {
        let backend = MockBackend {
            schedule_ok: false,
            ..write_report_backend()
        };
        let (planner, mut rx) = Planner::with_events(backend, settings());
        planner.submit("Write report", today()).await.unwrap();
        let before = planner.snapshot();
        drain(&mut rx);

        assert_eq!(planner.sync().await, SyncOutcome::Failed);
        assert_eq!(planner.snapshot(), before);
        let notes = notifications(&drain(&mut rx));
        assert_eq!(notes[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn refine_only_notifies() {
        let planner = Planner::new(write_report_backend(), settings());
        let before = planner.snapshot();
        let note = planner.refine();
        assert_eq!(note.severity, Severity::Info);
        assert_eq!(planner.snapshot(), before);
    }

    #[tokio::test]
    async fn overlapping_submission_is_rejected() {
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            parse_gate: Some(Arc::clone(&gate)),
            ..write_report_backend()
        };
        let planner = Planner::new(backend, settings());

        let first = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.submit("Write report", today()).await })
        };
        while !planner.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            planner.submit("something else", today()).await,
            Err(PlannerError::SubmissionInFlight)
        );

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.tasks, 1);
        assert!(!planner.is_busy());
        assert_eq!(planner.inner.backend.parse_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_submission_releases_the_guard() {
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            parse_gate: Some(Arc::clone(&gate)),
            ..write_report_backend()
        };
        let planner = Planner::new(backend, settings());

        let stuck = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.submit("Write report", today()).await })
        };
        while !planner.is_busy() {
            tokio::task::yield_now().await;
        }
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert!(!planner.is_busy());

        let snap = planner.snapshot();
        assert!(!snap.is_processing());
        assert_eq!(snap.state, PlannerState::Idle);
        assert!(!snap.progress.is_running());
        assert!(!snap.progress.is_finished());

        // The session is usable again.
        gate.notify_one();
        planner.submit("Write report", today()).await.unwrap();
        assert_eq!(planner.state(), PlannerState::Ready);
    }

    #[tokio::test]
    async fn dropped_submission_after_parse_rests_in_ready() {
        let backend = MockBackend {
            optimize_gate: Some(Arc::new(Notify::new())),
            ..write_report_backend()
        };
        let (planner, mut rx) = Planner::with_events(backend, settings());

        let stuck = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.submit("Write report", today()).await })
        };
        while planner.state() != PlannerState::Optimizing {
            tokio::task::yield_now().await;
        }
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());

        let snap = planner.snapshot();
        assert_eq!(snap.state, PlannerState::Ready);
        assert_eq!(snap.tasks.len(), 1);
        assert!(snap.action_bar_visible());
        assert!(!planner.is_busy());
        assert!(drain(&mut rx)
            .iter()
            .any(|e| *e == PlannerEvent::StateChanged { state: PlannerState::Ready }));
    }

    #[tokio::test]
    async fn stale_results_survive_until_the_join_point() {
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            parse_gate: Some(Arc::clone(&gate)),
            ..write_report_backend()
        };
        let planner = Planner::new(backend, settings());

        gate.notify_one();
        planner.submit("Write report", today()).await.unwrap();

        let second = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.submit("Write report again", today()).await })
        };
        while planner.state() != PlannerState::AwaitingParse {
            tokio::task::yield_now().await;
        }
        let mid = planner.snapshot();
        assert!(mid.is_processing());
        assert_eq!(mid.tasks.len(), 1);
        assert!(!mid.action_bar_visible());

        gate.notify_one();
        second.await.unwrap().unwrap();
        assert_eq!(planner.state(), PlannerState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn step_pacing_runs_alongside_a_slow_backend() {
        struct SlowBackend;

        #[async_trait]
        impl PlannerBackend for SlowBackend {
            async fn parse(&self, _request: &ParseRequest) -> Result<ParseResponse, ApiError> {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                Ok(ParseResponse::default())
            }
            async fn optimize(&self, _request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError> {
                Ok(OptimizeResponse::default())
            }
            async fn schedule(&self, _request: &ScheduleRequest) -> Result<Value, ApiError> {
                Ok(Value::Null)
            }
        }

        let planner = Planner::new(
            SlowBackend,
            PlannerSettings {
                pacing: StepPacing::new(600, 1000).unwrap(),
                ..PlannerSettings::default()
            },
        );
        let started = tokio::time::Instant::now();
        planner.submit("anything", today()).await.unwrap();
        let elapsed = started.elapsed();

        // Seven paced steps dominate the 2s parse call; they do not add up.
        assert!(elapsed >= std::time::Duration::from_millis(7 * 600));
        assert!(elapsed <= std::time::Duration::from_millis(7 * 1000 + 50));
    }
}
