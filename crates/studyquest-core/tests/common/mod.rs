//! In-memory backend for controller tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use studyquest_core::api::{Achievement, ActiveSession, EndedSession, StartedSession, StudyApi};
use studyquest_core::NetworkError;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ActiveSession,
    Start { subject: String, topic: String },
    End { session_id: String, duration: u32 },
    CheckAchievements,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub active: Option<ActiveSession>,
    pub next_id: u32,
    pub fail_start: bool,
    pub fail_end: bool,
    pub fail_achievements: bool,
    pub unlocked: Vec<Achievement>,
    pub calls: Vec<Call>,
    /// When set, `end_session` records the call and then waits for a
    /// notification before answering.
    pub end_gate: Option<Arc<Notify>>,
}

/// Mimics the backend: 10 XP per minute, one active session per user.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(session: ActiveSession) -> Self {
        let api = Self::new();
        api.state.lock().unwrap().active = Some(session);
        api
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Wait until `n` end requests have been made.
    pub async fn wait_for_end_calls(&self, n: usize) {
        while self.end_calls().len() < n {
            tokio::task::yield_now().await;
        }
    }

    pub fn end_calls(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::End {
                    session_id,
                    duration,
                } => Some((session_id, duration)),
                _ => None,
            })
            .collect()
    }

    fn unavailable(endpoint: &str) -> NetworkError {
        NetworkError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

impl StudyApi for FakeApi {
    async fn active_session(&self) -> Result<Option<ActiveSession>, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ActiveSession);
        Ok(state.active.clone())
    }

    async fn start_session(
        &self,
        subject: &str,
        topic: &str,
    ) -> Result<StartedSession, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Start {
            subject: subject.to_string(),
            topic: topic.to_string(),
        });
        if state.fail_start {
            return Err(Self::unavailable("sessions/start"));
        }
        state.next_id += 1;
        let id = state.next_id.to_string();
        state.active = Some(ActiveSession {
            id: id.clone(),
            subject: subject.to_string(),
            topic: Some(topic.to_string()),
            current_duration: 0,
            planned_duration: None,
        });
        Ok(StartedSession {
            id,
            subject: subject.to_string(),
            topic: Some(topic.to_string()),
            start_time: None,
        })
    }

    async fn end_session(
        &self,
        session_id: &str,
        duration_minutes: u32,
    ) -> Result<EndedSession, NetworkError> {
        // The outcome is fixed when the request is made.
        let (fail, gate) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::End {
                session_id: session_id.to_string(),
                duration: duration_minutes,
            });
            (state.fail_end, state.end_gate.clone())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if fail {
            return Err(Self::unavailable("sessions/end"));
        }
        let mut state = self.state.lock().unwrap();
        let subject = state
            .active
            .take()
            .map(|s| s.subject)
            .unwrap_or_default();
        Ok(EndedSession {
            xp_earned: duration_minutes * 10,
            subject,
        })
    }

    async fn check_achievements(&self) -> Result<Vec<Achievement>, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CheckAchievements);
        if state.fail_achievements {
            return Err(Self::unavailable("achievements/check"));
        }
        Ok(std::mem::take(&mut state.unlocked))
    }
}

pub fn active_session(id: &str, subject: &str, elapsed_minutes: u32) -> ActiveSession {
    ActiveSession {
        id: id.to_string(),
        subject: subject.to_string(),
        topic: None,
        current_duration: elapsed_minutes,
        planned_duration: None,
    }
}

pub fn achievement(id: &str, name: &str) -> Achievement {
    Achievement {
        id: id.to_string(),
        name: name.to_string(),
        icon: "🏆".to_string(),
        points_reward: 50,
    }
}
