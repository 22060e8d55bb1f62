//! Request and response bodies for the StudyQuest REST backend.

use serde::{Deserialize, Deserializer, Serialize};

/// Accept ids encoded either as JSON strings or numbers.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// `GET /sessions/active`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionResponse {
    pub has_active_session: bool,
    #[serde(default)]
    pub session: Option<ActiveSession>,
}

impl ActiveSessionResponse {
    /// The running session, if the backend reports one.
    pub fn into_session(self) -> Option<ActiveSession> {
        if self.has_active_session {
            self.session
        } else {
            None
        }
    }
}

/// A session the backend still considers running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    /// Minutes elapsed since the session started.
    #[serde(default)]
    pub current_duration: u32,
    /// Minutes requested at start, when the backend remembers it.
    #[serde(default)]
    pub planned_duration: Option<u32>,
}

/// `POST /sessions/start` body.
#[derive(Debug, Clone, Serialize)]
pub struct StartSessionRequest<'a> {
    pub subject: &'a str,
    pub topic: &'a str,
}

/// `POST /sessions/start` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionResponse {
    pub session: StartedSession,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartedSession {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// `POST /sessions/:id/end` body. Duration is in whole minutes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndSessionRequest {
    pub duration: u32,
}

/// `POST /sessions/:id/end` response.
#[derive(Debug, Clone, Deserialize)]
pub struct EndSessionResponse {
    pub session: EndedSession,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndedSession {
    #[serde(default)]
    pub xp_earned: u32,
    #[serde(default)]
    pub subject: String,
}

/// `POST /achievements/check` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementCheckResponse {
    #[serde(default)]
    pub unlocked_achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub points_reward: u32,
}

/// `POST /auth/login` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// `GET /auth/me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

/// Cached user profile, stored next to the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub xp: Option<u64>,
}
