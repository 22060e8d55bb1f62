//! Session recovery and end-of-session policy.
//!
//! A session can outlive the client that started it (crash, closed terminal,
//! reboot). On start-up the controller asks the backend for a running
//! session and feeds it through [`decide`], which is pure: given elapsed
//! time, the staleness threshold and the user's answer, it says what to do.
//!
//! ```text
//! elapsed > stale_after  -> AutoEnd (no prompt)
//! choice == Resume       -> Resume  (rebuild countdown)
//! choice == Discard      -> Discard (end with elapsed)
//! ```

use serde::{Deserialize, Serialize};

use crate::api::ActiveSession;
use crate::error::StaleSessionError;

/// Product thresholds for the study timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPolicy {
    /// Recovered sessions running longer than this are ended automatically.
    pub stale_after_minutes: u32,
    /// Manual ends below this many elapsed minutes need confirmation and earn nothing.
    pub min_session_minutes: u32,
    /// Planned length assumed when the backend does not report one.
    pub default_duration_minutes: u32,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            stale_after_minutes: 180,
            min_session_minutes: 1,
            default_duration_minutes: 25,
        }
    }
}

impl TimerPolicy {
    pub fn is_stale(&self, elapsed_minutes: u32) -> bool {
        elapsed_minutes > self.stale_after_minutes
    }

    pub fn needs_confirmation(&self, elapsed_minutes: u32) -> bool {
        elapsed_minutes < self.min_session_minutes
    }

    /// Describe a stale session for logging.
    pub fn stale_error(&self, session: &ActiveSession) -> Option<StaleSessionError> {
        self.is_stale(session.current_duration).then(|| StaleSessionError {
            session_id: session.id.clone(),
            elapsed_minutes: session.current_duration,
            threshold_minutes: self.stale_after_minutes,
        })
    }
}

/// The user's answer when asked about a recovered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryChoice {
    Resume,
    Discard,
}

/// What to do with a recovered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryDecision {
    /// End on the server with the elapsed minutes; never prompts.
    AutoEnd { duration_minutes: u32 },
    /// Rebuild the local countdown and keep running.
    Resume { total_secs: u64, remaining_secs: u64 },
    /// End on the server with the elapsed minutes at the user's request.
    Discard { duration_minutes: u32 },
}

/// Whether the user must be asked at all.
pub fn requires_choice(elapsed_minutes: u32, policy: &TimerPolicy) -> bool {
    !policy.is_stale(elapsed_minutes)
}

/// Decide the fate of a recovered session.
///
/// `planned_minutes` falls back to the policy default. The rebuilt total
/// never drops below what has already elapsed, so a session that overran its
/// plan resumes at zero and completes on the next tick.
pub fn decide(
    elapsed_minutes: u32,
    planned_minutes: Option<u32>,
    policy: &TimerPolicy,
    choice: RecoveryChoice,
) -> RecoveryDecision {
    if policy.is_stale(elapsed_minutes) {
        return RecoveryDecision::AutoEnd {
            duration_minutes: elapsed_minutes,
        };
    }

    match choice {
        RecoveryChoice::Discard => RecoveryDecision::Discard {
            duration_minutes: elapsed_minutes,
        },
        RecoveryChoice::Resume => {
            let planned = planned_minutes
                .unwrap_or(policy.default_duration_minutes)
                .max(elapsed_minutes)
                .max(1);
            let total_secs = u64::from(planned) * 60;
            let elapsed_secs = u64::from(elapsed_minutes) * 60;
            RecoveryDecision::Resume {
                total_secs,
                remaining_secs: total_secs.saturating_sub(elapsed_secs),
            }
        }
    }
}
