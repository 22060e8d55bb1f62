//! HttpStudyApi: reqwest client for the StudyQuest REST backend.
//!
//! Every request carries the bearer token from the [`AuthSession`] the client
//! was built with. Transport failures, non-2xx statuses and malformed bodies
//! all surface as [`NetworkError`]; nothing is retried.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::types::{
    AchievementCheckResponse, ActiveSessionResponse, EndSessionRequest, EndSessionResponse,
    LoginRequest, LoginResponse, ProfileResponse, StartSessionRequest, StartSessionResponse,
};
use super::{Achievement, ActiveSession, EndedSession, StartedSession, StudyApi, UserProfile};
use crate::auth::AuthSession;
use crate::error::NetworkError;
use crate::storage::ApiConfig;

/// Authenticated client for the StudyQuest backend.
#[derive(Debug, Clone)]
pub struct HttpStudyApi {
    base_url: Url,
    token: String,
    http_client: Client,
}

impl HttpStudyApi {
    /// Build a client for `config.base_url` authenticated as `session`.
    pub fn new(config: &ApiConfig, session: &AuthSession) -> Result<Self, NetworkError> {
        Ok(Self {
            base_url: parse_base_url(&config.base_url)?,
            token: session.token.clone(),
            http_client: build_client(config)?,
        })
    }

    /// Exchange credentials for a token and profile.
    ///
    /// This is the only call made without a bearer token.
    pub async fn login(
        config: &ApiConfig,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, NetworkError> {
        let base_url = parse_base_url(&config.base_url)?;
        let http_client = build_client(config)?;
        let url = endpoint_url(&base_url, "auth/login")?;

        let request = http_client
            .post(url)
            .json(&LoginRequest { email, password });
        let resp: LoginResponse = execute(request, "auth/login").await?;

        tracing::info!(user_id = %resp.user.id, "logged in");
        Ok(AuthSession {
            token: resp.token,
            user: resp.user,
        })
    }

    /// Refresh the cached profile.
    pub async fn profile(&self) -> Result<UserProfile, NetworkError> {
        let resp: ProfileResponse = self.send(Method::GET, "auth/me", None::<&()>).await?;
        Ok(resp.user)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = endpoint_url(&self.base_url, path)?;
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        execute(request, path).await
    }
}

impl StudyApi for HttpStudyApi {
    async fn active_session(&self) -> Result<Option<ActiveSession>, NetworkError> {
        let resp: ActiveSessionResponse = self
            .send(Method::GET, "sessions/active", None::<&()>)
            .await?;
        Ok(resp.into_session())
    }

    async fn start_session(
        &self,
        subject: &str,
        topic: &str,
    ) -> Result<StartedSession, NetworkError> {
        let body = StartSessionRequest { subject, topic };
        let resp: StartSessionResponse = self
            .send(Method::POST, "sessions/start", Some(&body))
            .await?;
        Ok(resp.session)
    }

    async fn end_session(
        &self,
        session_id: &str,
        duration_minutes: u32,
    ) -> Result<EndedSession, NetworkError> {
        let path = format!("sessions/{session_id}/end");
        let body = EndSessionRequest {
            duration: duration_minutes,
        };
        let resp: EndSessionResponse = self.send(Method::POST, &path, Some(&body)).await?;
        Ok(resp.session)
    }

    async fn check_achievements(&self) -> Result<Vec<Achievement>, NetworkError> {
        let resp: AchievementCheckResponse = self
            .send(Method::POST, "achievements/check", None::<&()>)
            .await?;
        Ok(resp.unlocked_achievements)
    }
}

fn build_client(config: &ApiConfig) -> Result<Client, NetworkError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| NetworkError::transport("client", e))
}

/// Parse the configured base URL so that relative joins append to its path.
fn parse_base_url(raw: &str) -> Result<Url, NetworkError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|_| NetworkError::InvalidUrl(raw.to_string()))
}

fn endpoint_url(base: &Url, path: &str) -> Result<Url, NetworkError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|_| NetworkError::InvalidUrl(format!("{base}{path}")))
}

async fn execute<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<T, NetworkError> {
    let resp = request
        .send()
        .await
        .map_err(|e| NetworkError::transport(endpoint, e))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| NetworkError::transport(endpoint, e))?;

    if !status.is_success() {
        tracing::warn!(%endpoint, status = status.as_u16(), "backend rejected request");
        return Err(NetworkError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| NetworkError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
