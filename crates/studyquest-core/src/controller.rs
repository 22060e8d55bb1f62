//! TimerController: drives one study session against the backend.
//!
//! The controller owns the [`TimerEngine`] and its [`Ticker`] behind a
//! shared lock and is cheap to clone. Ticks arrive on the channel returned
//! by [`TimerController::new`]; the caller's event loop forwards each one to
//! [`TimerController::on_tick`].
//!
//! Backend calls never run under the lock. A response is only applied if the
//! engine still holds the session the request was made for; otherwise it is
//! dropped. On failure the engine keeps its previous state.
//!
//! Every state change is also published as an [`Event`] to receivers from
//! [`TimerController::subscribe`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::api::{Achievement, ActiveSession, StudyApi};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::recovery::{self, RecoveryChoice, RecoveryDecision, TimerPolicy};
use crate::timer::{SessionPlan, Tick, Ticker, TimerEngine, TimerPhase};

/// What the backend credited for a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub subject: String,
    pub duration_minutes: u32,
    pub xp_earned: u32,
    pub achievements: Vec<Achievement>,
    /// Set when the follow-up achievement check failed.
    pub achievement_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EndOutcome {
    Ended(SessionSummary),
    /// A session under the minimum, thrown away after confirmation.
    Discarded { session_id: String, elapsed_secs: u64 },
    /// The timer moved on while the request was in flight.
    Superseded { session_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    NoActiveSession,
    AutoEnded {
        session_id: String,
        elapsed_minutes: u32,
        threshold_minutes: u32,
        xp_earned: u32,
    },
    Resumed {
        session_id: String,
        subject: String,
        remaining_secs: u64,
        total_secs: u64,
    },
    Discarded {
        session_id: String,
        duration_minutes: u32,
        xp_earned: u32,
        achievements: Vec<Achievement>,
        achievement_error: Option<String>,
    },
}

const EVENT_CAPACITY: usize = 64;

struct Inner {
    engine: TimerEngine,
    ticker: Ticker,
    in_flight: bool,
}

pub struct TimerController<A> {
    api: Arc<A>,
    policy: TimerPolicy,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<Event>,
}

impl<A> Clone for TimerController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            policy: self.policy,
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<A: StudyApi> TimerController<A> {
    /// Create an idle controller and the channel its ticks arrive on.
    pub fn new(
        api: A,
        policy: TimerPolicy,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = Self {
            api: Arc::new(api),
            policy,
            inner: Arc::new(Mutex::new(Inner {
                engine: TimerEngine::new(),
                ticker: Ticker::new(tick_interval, tx),
                in_flight: false,
            })),
            events,
        };
        (controller, rx)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn policy(&self) -> &TimerPolicy {
        &self.policy
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn snapshot(&self) -> Event {
        self.inner.lock().await.engine.snapshot()
    }

    pub async fn phase(&self) -> TimerPhase {
        self.inner.lock().await.engine.phase()
    }

    pub async fn remaining_secs(&self) -> u64 {
        self.inner.lock().await.engine.remaining_secs()
    }

    pub async fn is_ticking(&self) -> bool {
        self.inner.lock().await.ticker.is_armed()
    }

    // ── Start ────────────────────────────────────────────────────────

    /// Create a session on the backend and start counting down.
    pub async fn start(
        &self,
        subject: &str,
        topic: Option<&str>,
        duration_minutes: u32,
    ) -> Result<Event> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ValidationError::EmptySubject.into());
        }
        if duration_minutes == 0 {
            return Err(ValidationError::InvalidDuration {
                minutes: duration_minutes,
            }
            .into());
        }
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());

        self.claim_idle().await?;
        let result = self.start_inner(subject, topic, duration_minutes).await;
        self.release().await;
        result
    }

    async fn start_inner(
        &self,
        subject: &str,
        topic: Option<&str>,
        duration_minutes: u32,
    ) -> Result<Event> {
        if let Some(active) = self.api.active_session().await? {
            return Err(ValidationError::SessionAlreadyActive {
                session_id: active.id,
            }
            .into());
        }

        let started = self
            .api
            .start_session(subject, topic.unwrap_or_default())
            .await?;
        let subject = if started.subject.trim().is_empty() {
            subject.to_string()
        } else {
            started.subject
        };
        let plan = SessionPlan::fresh(
            started.id,
            subject,
            topic.map(str::to_string),
            duration_minutes,
        );

        let mut inner = self.inner.lock().await;
        let event = inner
            .engine
            .begin(plan)
            .ok_or(ValidationError::OperationInProgress)?;
        inner.ticker.arm();
        tracing::info!(
            session_id = inner.engine.session_id().unwrap_or_default(),
            duration_minutes,
            "study session started"
        );
        self.emit(event.clone());
        Ok(event)
    }

    // ── Pause / resume ───────────────────────────────────────────────

    /// Freeze the countdown. No-op unless running.
    pub async fn pause(&self) -> Option<Event> {
        let mut inner = self.inner.lock().await;
        let event = inner.engine.pause()?;
        inner.ticker.cancel();
        self.emit(event.clone());
        Some(event)
    }

    /// Continue the countdown. No-op unless paused.
    pub async fn resume(&self) -> Option<Event> {
        let mut inner = self.inner.lock().await;
        let event = inner.engine.resume()?;
        inner.ticker.arm();
        self.emit(event.clone());
        Some(event)
    }

    // ── Tick / completion ────────────────────────────────────────────

    /// Apply one tick and, on the zero crossing, end the session.
    ///
    /// Ticks from a cancelled or replaced ticker are ignored.
    pub async fn on_tick(&self, tick: Tick) -> Result<Option<EndOutcome>> {
        let completed = {
            let mut inner = self.inner.lock().await;
            if !inner.ticker.accepts(tick) {
                return Ok(None);
            }
            inner.engine.tick();
            if inner.in_flight {
                return Ok(None);
            }
            inner.engine.take_completion()
        };

        let Some(event) = completed else {
            return Ok(None);
        };
        if let Event::TimerCompleted {
            session_id,
            duration_minutes,
            ..
        } = &event
        {
            tracing::info!(%session_id, duration_minutes, "countdown finished");
        }
        self.emit(event);
        self.end(false, false).await.map(Some)
    }

    // ── End ──────────────────────────────────────────────────────────

    /// End the current session.
    ///
    /// A manual end below the minimum session length fails with
    /// [`ValidationError::ConfirmationRequired`] unless `confirmed`; a
    /// confirmed one is reported to the backend with zero minutes and earns
    /// nothing.
    pub async fn end(&self, manual: bool, confirmed: bool) -> Result<EndOutcome> {
        let (session_id, subject, elapsed_secs, duration_minutes, discard) = {
            let mut inner = self.inner.lock().await;
            if !inner.engine.is_active() {
                return Err(ValidationError::NoActiveSession.into());
            }
            if inner.in_flight {
                return Err(ValidationError::OperationInProgress.into());
            }

            let elapsed_secs = inner.engine.elapsed_secs();
            let elapsed_minutes = inner.engine.elapsed_minutes();
            let discard = manual && self.policy.needs_confirmation(elapsed_minutes);
            if discard && !confirmed {
                return Err(ValidationError::ConfirmationRequired { elapsed_secs }.into());
            }

            inner.in_flight = true;
            (
                inner.engine.session_id().unwrap_or_default().to_string(),
                inner.engine.subject().unwrap_or_default().to_string(),
                elapsed_secs,
                if discard { 0 } else { elapsed_minutes },
                discard,
            )
        };

        let result = self.api.end_session(&session_id, duration_minutes).await;

        let ended = {
            let mut inner = self.inner.lock().await;
            inner.in_flight = false;
            let ended = result.map_err(|e| {
                tracing::warn!(%session_id, error = %e, "failed to end session");
                CoreError::from(e)
            })?;

            if inner.engine.session_id() != Some(session_id.as_str()) {
                tracing::debug!(%session_id, "dropping end response for a replaced session");
                return Ok(EndOutcome::Superseded { session_id });
            }

            inner.ticker.cancel();
            if discard {
                inner.engine.abandon();
                inner.engine.reset();
                tracing::info!(%session_id, elapsed_secs, "short session discarded");
                self.emit(Event::SessionDiscarded {
                    session_id: session_id.clone(),
                    elapsed_secs,
                    at: Utc::now(),
                });
                return Ok(EndOutcome::Discarded {
                    session_id,
                    elapsed_secs,
                });
            }
            inner.engine.complete();
            ended
        };
        let subject = if ended.subject.is_empty() {
            subject
        } else {
            ended.subject
        };
        self.emit(Event::SessionEnded {
            session_id: session_id.clone(),
            subject: subject.clone(),
            duration_minutes,
            xp_earned: ended.xp_earned,
            at: Utc::now(),
        });

        let (achievements, achievement_error) = self.check_achievements().await;

        {
            let mut inner = self.inner.lock().await;
            if inner.engine.session_id() == Some(session_id.as_str())
                && inner.engine.phase() == TimerPhase::Completed
            {
                inner.engine.reset();
            }
        }

        tracing::info!(
            %session_id,
            duration_minutes,
            xp_earned = ended.xp_earned,
            "study session ended"
        );
        Ok(EndOutcome::Ended(SessionSummary {
            session_id,
            subject,
            duration_minutes,
            xp_earned: ended.xp_earned,
            achievements,
            achievement_error,
        }))
    }

    // ── Recovery ─────────────────────────────────────────────────────

    /// Look for a session left running by an earlier run and deal with it.
    ///
    /// Stale sessions are ended without calling `choose`. Otherwise `choose`
    /// decides between resuming the countdown and discarding the session.
    pub async fn recover_on_mount<F>(&self, choose: F) -> Result<RecoveryOutcome>
    where
        F: FnOnce(&ActiveSession) -> RecoveryChoice,
    {
        self.claim_idle().await?;
        let result = self.recover_inner(choose).await;
        self.release().await;
        result
    }

    async fn recover_inner<F>(&self, choose: F) -> Result<RecoveryOutcome>
    where
        F: FnOnce(&ActiveSession) -> RecoveryChoice,
    {
        let Some(session) = self.api.active_session().await? else {
            return Ok(RecoveryOutcome::NoActiveSession);
        };

        let elapsed = session.current_duration;
        let choice = if recovery::requires_choice(elapsed, &self.policy) {
            choose(&session)
        } else {
            RecoveryChoice::Discard
        };

        match recovery::decide(elapsed, session.planned_duration, &self.policy, choice) {
            RecoveryDecision::AutoEnd { duration_minutes } => {
                if let Some(stale) = self.policy.stale_error(&session) {
                    tracing::info!(%stale, "ending stale session");
                }
                let ended = self.api.end_session(&session.id, duration_minutes).await?;
                self.emit(Event::StaleSessionEnded {
                    session_id: session.id.clone(),
                    elapsed_minutes: elapsed,
                    threshold_minutes: self.policy.stale_after_minutes,
                    at: Utc::now(),
                });
                Ok(RecoveryOutcome::AutoEnded {
                    session_id: session.id,
                    elapsed_minutes: elapsed,
                    threshold_minutes: self.policy.stale_after_minutes,
                    xp_earned: ended.xp_earned,
                })
            }
            RecoveryDecision::Discard { duration_minutes } => {
                let ended = self.api.end_session(&session.id, duration_minutes).await?;
                self.emit(Event::SessionEnded {
                    session_id: session.id.clone(),
                    subject: if ended.subject.is_empty() {
                        session.subject.clone()
                    } else {
                        ended.subject
                    },
                    duration_minutes,
                    xp_earned: ended.xp_earned,
                    at: Utc::now(),
                });
                let (achievements, achievement_error) = self.check_achievements().await;
                tracing::info!(
                    session_id = %session.id,
                    duration_minutes,
                    unlocked = achievements.len(),
                    "recovered session ended"
                );
                Ok(RecoveryOutcome::Discarded {
                    session_id: session.id,
                    duration_minutes,
                    xp_earned: ended.xp_earned,
                    achievements,
                    achievement_error,
                })
            }
            RecoveryDecision::Resume {
                total_secs,
                remaining_secs,
            } => {
                let mut inner = self.inner.lock().await;
                inner
                    .engine
                    .begin(SessionPlan {
                        session_id: session.id.clone(),
                        subject: session.subject.clone(),
                        topic: session.topic.clone(),
                        total_secs,
                        remaining_secs,
                    })
                    .ok_or(ValidationError::OperationInProgress)?;
                inner.ticker.arm();
                tracing::info!(session_id = %session.id, remaining_secs, "session resumed");
                self.emit(Event::SessionRecovered {
                    session_id: session.id.clone(),
                    subject: session.subject.clone(),
                    remaining_secs,
                    total_secs,
                    at: Utc::now(),
                });
                Ok(RecoveryOutcome::Resumed {
                    session_id: session.id,
                    subject: session.subject,
                    remaining_secs,
                    total_secs,
                })
            }
        }
    }

    /// Stop ticking and forget the local session; call when the owning view
    /// goes away.
    ///
    /// The backend session stays open for a later recovery. A response still
    /// in flight for it is dropped when it arrives.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.ticker.cancel();
        if let Some(session_id) = inner.engine.session_id() {
            tracing::debug!(session_id, "releasing local session");
        }
        inner.engine.reset();
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn claim_idle(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.in_flight {
            return Err(ValidationError::OperationInProgress.into());
        }
        if inner.engine.phase() != TimerPhase::Idle {
            return Err(ValidationError::SessionAlreadyActive {
                session_id: inner.engine.session_id().unwrap_or_default().to_string(),
            }
            .into());
        }
        inner.in_flight = true;
        Ok(())
    }

    async fn release(&self) {
        self.inner.lock().await.in_flight = false;
    }

    fn emit(&self, event: Event) {
        tracing::debug!(kind = event.kind(), "event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn check_achievements(&self) -> (Vec<Achievement>, Option<String>) {
        match self.api.check_achievements().await {
            Ok(unlocked) => {
                if !unlocked.is_empty() {
                    self.emit(Event::AchievementsUnlocked {
                        achievements: unlocked.clone(),
                        at: Utc::now(),
                    });
                }
                (unlocked, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "achievement check failed");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }
}
