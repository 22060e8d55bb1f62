//! HttpStudyApi against a mocked backend.
//!
//! Verifies the wire contract: paths, bearer header, JSON bodies and error
//! mapping. Uses mockito so no real backend is needed.

use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use studyquest_core::{
    ApiConfig, AuthSession, EndOutcome, Event, HttpStudyApi, NetworkError, StudyApi,
    TimerController, TimerPhase, TimerPolicy, UserProfile,
};

fn session(token: &str) -> AuthSession {
    AuthSession {
        token: token.to_string(),
        user: UserProfile {
            id: "1".into(),
            username: Some("ada".into()),
            email: None,
            role: None,
            level: None,
            xp: None,
        },
    }
}

fn api_for(server: &Server) -> HttpStudyApi {
    let config = ApiConfig {
        base_url: server.url(),
        timeout_secs: 5,
    };
    HttpStudyApi::new(&config, &session("tok-abc")).unwrap()
}

#[tokio::test]
async fn active_session_sends_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/sessions/active")
        .match_header("authorization", "Bearer tok-abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hasActiveSession": true,
                "session": {
                    "id": 12,
                    "subject": "Biology",
                    "topic": "Cells",
                    "currentDuration": 33
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let active = api_for(&server).active_session().await.unwrap().unwrap();
    assert_eq!(active.id, "12");
    assert_eq!(active.subject, "Biology");
    assert_eq!(active.current_duration, 33);
    mock.assert_async().await;
}

#[tokio::test]
async fn no_active_session() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/sessions/active")
        .with_status(200)
        .with_body(r#"{"hasActiveSession":false}"#)
        .create_async()
        .await;

    assert!(api_for(&server).active_session().await.unwrap().is_none());
}

#[tokio::test]
async fn start_posts_subject_and_topic() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/sessions/start")
        .match_header("authorization", "Bearer tok-abc")
        .match_body(Matcher::Json(json!({"subject": "Mathematics", "topic": "Algebra"})))
        .with_status(201)
        .with_body(r#"{"session":{"id":"s-1","subject":"Mathematics","topic":"Algebra"}}"#)
        .create_async()
        .await;

    let started = api_for(&server)
        .start_session("Mathematics", "Algebra")
        .await
        .unwrap();
    assert_eq!(started.id, "s-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn end_posts_duration_and_returns_xp() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/sessions/42/end")
        .match_body(Matcher::Json(json!({"duration": 25})))
        .with_status(200)
        .with_body(r#"{"session":{"xp_earned":250,"subject":"Mathematics"}}"#)
        .create_async()
        .await;

    let ended = api_for(&server).end_session("42", 25).await.unwrap();
    assert_eq!(ended.xp_earned, 250);
    assert_eq!(ended.subject, "Mathematics");
    mock.assert_async().await;
}

#[tokio::test]
async fn check_achievements_returns_unlocked() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/achievements/check")
        .with_status(200)
        .with_body(
            json!({
                "unlocked_achievements": [
                    {"id": 3, "name": "Marathon", "icon": "🏃", "points_reward": 100}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let unlocked = api_for(&server).check_achievements().await.unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].id, "3");
    assert_eq!(unlocked[0].points_reward, 100);
}

#[tokio::test]
async fn non_success_status_maps_to_status_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/sessions/start")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = api_for(&server)
        .start_session("Mathematics", "")
        .await
        .unwrap_err();
    match err {
        NetworkError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_maps_to_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/sessions/active")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    assert!(matches!(
        api_for(&server).active_session().await,
        Err(NetworkError::Decode { .. })
    ));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9".into(),
        timeout_secs: 2,
    };
    let api = HttpStudyApi::new(&config, &session("tok")).unwrap();
    assert!(matches!(
        api.active_session().await,
        Err(NetworkError::Transport { .. })
    ));
}

#[tokio::test]
async fn login_returns_token_and_profile() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"email": "ada@example.com", "password": "pw"})))
        .with_status(200)
        .with_body(r#"{"token":"fresh","user":{"id":9,"username":"ada","level":4,"xp":900}}"#)
        .create_async()
        .await;

    let config = ApiConfig {
        base_url: server.url(),
        timeout_secs: 5,
    };
    let auth = HttpStudyApi::login(&config, "ada@example.com", "pw")
        .await
        .unwrap();
    assert_eq!(auth.token, "fresh");
    assert_eq!(auth.user.id, "9");
    assert_eq!(auth.user.level, Some(4));
    mock.assert_async().await;
}

#[tokio::test]
async fn profile_uses_base_path_prefix() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_status(200)
        .with_body(r#"{"user":{"id":"u1","username":"ada"}}"#)
        .create_async()
        .await;

    let config = ApiConfig {
        base_url: format!("{}/api", server.url()),
        timeout_secs: 5,
    };
    let api = HttpStudyApi::new(&config, &session("tok")).unwrap();
    assert_eq!(api.profile().await.unwrap().id, "u1");
}

#[tokio::test]
async fn controller_discards_short_session_over_http() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/sessions/active")
        .with_status(200)
        .with_body(r#"{"hasActiveSession":false}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/sessions/start")
        .with_status(200)
        .with_body(r#"{"session":{"id":7,"subject":"Mathematics"}}"#)
        .create_async()
        .await;
    let end = server
        .mock("POST", "/sessions/7/end")
        .match_body(Matcher::Json(json!({"duration": 0})))
        .with_status(200)
        .with_body(r#"{"session":{"xp_earned":0,"subject":"Mathematics"}}"#)
        .create_async()
        .await;
    let achievements = server
        .mock("POST", "/achievements/check")
        .expect(0)
        .create_async()
        .await;

    let (ctrl, _rx) = TimerController::new(
        api_for(&server),
        TimerPolicy::default(),
        Duration::from_secs(1),
    );
    ctrl.start("Mathematics", None, 25).await.unwrap();
    assert_eq!(ctrl.phase().await, TimerPhase::Running);

    let outcome = ctrl.end(true, true).await.unwrap();
    assert!(matches!(outcome, EndOutcome::Discarded { .. }));
    assert_eq!(ctrl.phase().await, TimerPhase::Idle);
    end.assert_async().await;
    achievements.assert_async().await;
}

#[tokio::test]
async fn start_response_without_subject_uses_local_subject() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/sessions/active")
        .with_status(200)
        .with_body(r#"{"hasActiveSession":false}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/sessions/start")
        .with_status(201)
        .with_body(r#"{"session":{"id":5}}"#)
        .create_async()
        .await;

    let (ctrl, _rx) = TimerController::new(
        api_for(&server),
        TimerPolicy::default(),
        Duration::from_secs(1),
    );
    ctrl.start("Geography", Some("Rivers"), 25).await.unwrap();

    assert_eq!(ctrl.phase().await, TimerPhase::Running);
    match ctrl.snapshot().await {
        Event::StateSnapshot {
            session_id,
            subject,
            ..
        } => {
            assert_eq!(session_id.as_deref(), Some("5"));
            assert_eq!(subject.as_deref(), Some("Geography"));
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
    ctrl.shutdown().await;
}
