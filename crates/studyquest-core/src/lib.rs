//! # StudyQuest Core Library
//!
//! This library provides the client-side logic for StudyQuest study
//! sessions. The backend is authoritative for session identity, XP and
//! achievements; this crate keeps the local countdown honest and makes
//! sure every session ends exactly once.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine for one session
//! - **Ticker**: Cancellable periodic task feeding the engine
//! - **Controller**: Async orchestration of engine, ticker and backend
//! - **Recovery**: Pure policy for sessions left running by an earlier run
//! - **Storage**: TOML configuration and the persisted login
//!
//! ## Key Components
//!
//! - [`TimerController`]: Start, pause, resume, end and recover sessions
//! - [`TimerEngine`]: Core timer state machine
//! - [`StudyApi`]: Trait over the REST backend, implemented by [`HttpStudyApi`]
//! - [`Config`]: Application configuration management
//! - [`AuthStore`]: Token and cached profile

pub mod api;
pub mod auth;
pub mod controller;
pub mod error;
pub mod events;
pub mod recovery;
pub mod storage;
pub mod timer;

pub use api::{Achievement, ActiveSession, HttpStudyApi, StudyApi, UserProfile};
pub use auth::{AuthSession, AuthStore};
pub use controller::{EndOutcome, RecoveryOutcome, SessionSummary, TimerController};
pub use error::{
    AuthError, ConfigError, CoreError, NetworkError, StaleSessionError, ValidationError,
};
pub use events::Event;
pub use recovery::{RecoveryChoice, RecoveryDecision, TimerPolicy};
pub use storage::{ApiConfig, Config, TimerConfig};
pub use timer::{SessionPlan, Tick, Ticker, TimerEngine, TimerPhase};
