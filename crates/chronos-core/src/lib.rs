//! # Chronos Core Library
//!
//! Client-side core of the Chronos day planner. The user hands over a free-form
//! "brain dump", watches a paced list of agent steps while the backend extracts
//! tasks, and gets back a task list plus a proposed timeline that can be pushed
//! to an external calendar.
//!
//! Task extraction, schedule optimization and calendar sync all happen on a
//! remote backend. This crate only shapes the requests, reconciles the
//! responses into display types and renders them as text.
//!
//! ## Architecture
//!
//! - **Planner**: the orchestration state machine. Runs the step animation
//!   concurrently with the parse call, then optimizes, then waits for sync
//! - **Backend**: the [`PlannerBackend`] trait and its reqwest implementation
//! - **Model**: [`Task`], [`TimelineEvent`] and the opaque [`ScheduledEvent`]
//! - **Render**: stateless text widgets (status panel, task list, timeline,
//!   action bar)
//! - **Config**: TOML configuration at `~/.config/chronos/config.toml`

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod planner;
pub mod progress;
pub mod render;
pub mod schedule;
pub mod task;
pub mod timeline;

pub use api::{HttpBackend, PlannerBackend};
pub use config::Config;
pub use error::{ApiError, ConfigError, PlannerError};
pub use events::{Notification, PlannerEvent, Severity};
pub use planner::{
    PlanSnapshot, Planner, PlannerSettings, PlannerState, SubmitOutcome, SyncOutcome,
};
pub use progress::{ProcessingState, StepPacing, StepStatus};
pub use schedule::ScheduledEvent;
pub use task::{Priority, Task};
pub use timeline::{EventKind, TimelineEvent};
