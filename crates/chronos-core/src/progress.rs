//! Agent step progress shown while a plan is being built.
//!
//! The steps are cosmetic: they advance on a randomized timer and never wait
//! on the backend. [`ProcessingState`] only tracks which label is active.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlannerError;

/// Labels shown when the configuration does not override them.
pub const DEFAULT_STEPS: [&str; 7] = [
    "Fetching existing calendar events...",
    "Parsing your brain dump...",
    "Identifying tasks and priorities...",
    "Estimating durations...",
    "Optimizing schedule...",
    "Resolving conflicts...",
    "Finalizing your day...",
];

/// How a single step should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Done,
    Active,
    Pending,
}

/// Step labels plus the active index for one run.
///
/// The index only moves forward within a run. `finish()` parks it at
/// `steps.len()`, meaning every step is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    steps: Vec<String>,
    current: usize,
    running: bool,
    /// Steps revealed so far in this run (the panel grows as steps start).
    revealed: usize,
}

impl ProcessingState {
    pub fn new(steps: Vec<String>) -> Self {
        Self {
            steps,
            current: 0,
            running: false,
            revealed: 0,
        }
    }

    pub fn with_default_steps() -> Self {
        Self::new(DEFAULT_STEPS.iter().map(|s| s.to_string()).collect())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Steps that have been shown in the current (or last) run.
    pub fn revealed_steps(&self) -> &[String] {
        &self.steps[..self.revealed]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        !self.running && self.current >= self.steps.len() && self.revealed > 0
    }

    pub fn status_of(&self, index: usize) -> StepStatus {
        if index < self.current {
            StepStatus::Done
        } else if index == self.current && self.running {
            StepStatus::Active
        } else {
            StepStatus::Pending
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new run from the first step.
    pub fn start(&mut self) {
        self.current = 0;
        self.revealed = 0;
        self.running = true;
    }

    /// Make `index` the active step. Moving backwards is ignored.
    ///
    /// Returns whether the index changed or a new step was revealed.
    pub fn advance_to(&mut self, index: usize) -> bool {
        if !self.running || index >= self.steps.len() || index < self.current {
            return false;
        }
        let revealed = (index + 1).max(self.revealed);
        let changed = index != self.current || revealed != self.revealed;
        self.current = index;
        self.revealed = revealed;
        changed
    }

    /// Abandon the run. Steps already passed stay done, the rest pending.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// End the run with every step marked done.
    pub fn finish(&mut self) {
        self.current = self.steps.len();
        self.revealed = self.steps.len();
        self.running = false;
    }
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self::with_default_steps()
    }
}

/// Randomized pause between steps, in milliseconds (inclusive range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl StepPacing {
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidPacing`] if `min_ms > max_ms`.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, PlannerError> {
        if min_ms > max_ms {
            return Err(PlannerError::InvalidPacing { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }

    /// No pauses at all.
    pub fn instant() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub fn is_instant(&self) -> bool {
        self.max_ms == 0
    }

    /// Draw the next pause.
    pub fn delay(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.max_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

impl Default for StepPacing {
    fn default() -> Self {
        Self {
            min_ms: 600,
            max_ms: 1000,
        }
    }
}
