//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine for one study session. It
//! has no threads and makes no backend calls: the controller arms a ticker
//! that calls `tick()` once per second and talks to the backend itself.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> (Completed | Abandoned) -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.begin(SessionPlan::fresh("42", "Mathematics", None, 25));
//! // Once per second:
//! engine.tick();
//! if let Some(event) = engine.take_completion() {
//!     // end the session on the backend, exactly once
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Completed,
    Abandoned,
}

/// Everything needed to put the engine into `Running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub session_id: String,
    pub subject: String,
    pub topic: Option<String>,
    pub total_secs: u64,
    pub remaining_secs: u64,
}

impl SessionPlan {
    /// A brand-new session of `duration_minutes`.
    pub fn fresh(
        session_id: impl Into<String>,
        subject: impl Into<String>,
        topic: Option<String>,
        duration_minutes: u32,
    ) -> Self {
        let total_secs = u64::from(duration_minutes) * 60;
        Self {
            session_id: session_id.into(),
            subject: subject.into(),
            topic,
            total_secs,
            remaining_secs: total_secs,
        }
    }
}

/// Core timer engine.
///
/// Counts whole seconds. `tick()` only decrements; the zero crossing is
/// latched and handed out once through `take_completion()`.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    phase: TimerPhase,
    session_id: Option<String>,
    subject: Option<String>,
    topic: Option<String>,
    total_secs: u64,
    remaining_secs: u64,
    started_at: Option<DateTime<Utc>>,
    completion_pending: bool,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self {
            phase: TimerPhase::Idle,
            session_id: None,
            subject: None,
            topic: None,
            total_secs: 0,
            remaining_secs: 0,
            started_at: None,
            completion_pending: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Running or paused: a session is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs.saturating_sub(self.remaining_secs)
    }

    /// Whole minutes studied so far, rounded down.
    pub fn elapsed_minutes(&self) -> u32 {
        u32::try_from(self.elapsed_secs() / 60).unwrap_or(u32::MAX)
    }

    /// 0.0 .. 100.0 progress through the planned duration.
    pub fn progress_pct(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        (self.elapsed_secs() as f64 / self.total_secs as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            session_id: self.session_id.clone(),
            subject: self.subject.clone(),
            is_active: self.is_active(),
            is_paused: self.is_paused(),
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            progress_pct: self.progress_pct(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enter `Running` for `plan`. Only valid from `Idle`.
    ///
    /// A plan with nothing remaining (an overrun recovered session) is
    /// immediately due for completion.
    pub fn begin(&mut self, plan: SessionPlan) -> Option<Event> {
        if self.phase != TimerPhase::Idle {
            return None;
        }
        let remaining = plan.remaining_secs.min(plan.total_secs);
        self.phase = TimerPhase::Running;
        self.total_secs = plan.total_secs;
        self.remaining_secs = remaining;
        self.completion_pending = remaining == 0;
        self.started_at = Some(Utc::now());
        self.session_id = Some(plan.session_id.clone());
        self.subject = Some(plan.subject.clone());
        self.topic = plan.topic.clone();

        Some(Event::SessionStarted {
            session_id: plan.session_id,
            subject: plan.subject,
            topic: plan.topic,
            duration_secs: plan.total_secs,
            at: Utc::now(),
        })
    }

    /// Decrement by one second while running, floored at zero.
    ///
    /// Returns the remaining seconds. Does nothing outside `Running`.
    pub fn tick(&mut self) -> u64 {
        if self.phase == TimerPhase::Running && self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            if self.remaining_secs == 0 {
                self.completion_pending = true;
            }
        }
        self.remaining_secs
    }

    /// Hand out the zero-crossing exactly once.
    pub fn take_completion(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Running || !self.completion_pending {
            return None;
        }
        self.completion_pending = false;
        Some(Event::TimerCompleted {
            session_id: self.session_id.clone().unwrap_or_default(),
            duration_minutes: self.elapsed_minutes(),
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        self.phase = TimerPhase::Paused;
        Some(Event::TimerPaused {
            session_id: self.session_id.clone().unwrap_or_default(),
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Paused {
            return None;
        }
        self.phase = TimerPhase::Running;
        Some(Event::TimerResumed {
            session_id: self.session_id.clone().unwrap_or_default(),
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Mark the session finished with credit. Only valid while active.
    pub fn complete(&mut self) -> bool {
        self.finish(TimerPhase::Completed)
    }

    /// Mark the session thrown away. Only valid while active.
    pub fn abandon(&mut self) -> bool {
        self.finish(TimerPhase::Abandoned)
    }

    /// Back to `Idle`, forgetting the session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self, terminal: TimerPhase) -> bool {
        if !self.is_active() {
            return false;
        }
        self.phase = terminal;
        self.completion_pending = false;
        true
    }
}
