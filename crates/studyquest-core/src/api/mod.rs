pub mod client;
pub mod types;

use std::future::Future;

use crate::error::NetworkError;

pub use client::HttpStudyApi;
pub use types::{Achievement, ActiveSession, EndedSession, StartedSession, UserProfile};

/// Backend operations the study timer depends on.
///
/// The backend is the source of truth for session ids, start times, XP and
/// achievements. Implementations attach credentials themselves.
pub trait StudyApi: Send + Sync {
    /// The session the backend still considers running, if any.
    fn active_session(
        &self,
    ) -> impl Future<Output = Result<Option<ActiveSession>, NetworkError>> + Send;

    /// Create a session and return its server-assigned identity.
    fn start_session(
        &self,
        subject: &str,
        topic: &str,
    ) -> impl Future<Output = Result<StartedSession, NetworkError>> + Send;

    /// End a session with its elapsed duration in whole minutes.
    fn end_session(
        &self,
        session_id: &str,
        duration_minutes: u32,
    ) -> impl Future<Output = Result<EndedSession, NetworkError>> + Send;

    /// Ask the backend to evaluate achievements after a session.
    fn check_achievements(
        &self,
    ) -> impl Future<Output = Result<Vec<Achievement>, NetworkError>> + Send;
}
