use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Achievement;
use crate::timer::TimerPhase;

/// Every state change of a study session produces an Event.
/// The CLI prints them; callers may log or forward them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        subject: String,
        topic: Option<String>,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        session_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        session_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero. Emitted once per session.
    TimerCompleted {
        session_id: String,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    /// Backend accepted the end of a session.
    SessionEnded {
        session_id: String,
        subject: String,
        duration_minutes: u32,
        xp_earned: u32,
        at: DateTime<Utc>,
    },
    /// Sub-minimum session thrown away after confirmation.
    SessionDiscarded {
        session_id: String,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    AchievementsUnlocked {
        achievements: Vec<Achievement>,
        at: DateTime<Utc>,
    },
    /// A session from an earlier run was picked up again.
    SessionRecovered {
        session_id: String,
        subject: String,
        remaining_secs: u64,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// A session from an earlier run was past the staleness threshold and ended.
    StaleSessionEnded {
        session_id: String,
        elapsed_minutes: u32,
        threshold_minutes: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        session_id: Option<String>,
        subject: Option<String>,
        is_active: bool,
        is_paused: bool,
        remaining_secs: u64,
        total_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short kebab-case name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session-started",
            Event::TimerPaused { .. } => "timer-paused",
            Event::TimerResumed { .. } => "timer-resumed",
            Event::TimerCompleted { .. } => "timer-completed",
            Event::SessionEnded { .. } => "session-ended",
            Event::SessionDiscarded { .. } => "session-discarded",
            Event::AchievementsUnlocked { .. } => "achievements-unlocked",
            Event::SessionRecovered { .. } => "session-recovered",
            Event::StaleSessionEnded { .. } => "stale-session-ended",
            Event::StateSnapshot { .. } => "state-snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_variant() {
        let event = Event::TimerPaused {
            session_id: "3".into(),
            remaining_secs: 90,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["remaining_secs"], 90);
        assert_eq!(event.kind(), "timer-paused");
    }
}
