#![allow(dead_code)]
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    Router,
};
use chrono::{Duration, Utc};
use lifeline_backend::{
    config::{Config, SmsConfig},
    handlers,
    middleware::{logging, rate_limit, request_id},
    models::sos_session::{SosSession, SosStatus},
    repositories::{InMemorySessionRepository, SessionRepository},
    services::{
        notification::NotificationDispatcher,
        sms::{SmsError, SmsSender},
    },
    state::AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().expect("socket addr"),
        public_base_url: "https://sos.example.com".into(),
        session_ttl_hours: 6,
        time_zone: chrono_tz::UTC,
        cors_allow_origins: vec!["*".into()],
        notification_queue_capacity: 16,
        rate_limit_start_max_requests: 10,
        rate_limit_start_window_seconds: 60,
        sms: SmsConfig {
            skip_send: true,
            ..SmsConfig::default()
        },
    }
}

/// SMS sender that records every message and fails for chosen numbers.
#[derive(Default)]
pub struct RecordingSmsSender {
    sent: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
}

impl RecordingSmsSender {
    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: numbers.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock sent messages").clone()
    }

    /// Polls until at least `count` send attempts were recorded.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..200 {
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!(
            "expected {} SMS attempts, saw {}",
            count,
            self.messages().len()
        );
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        self.sent
            .lock()
            .expect("lock sent messages")
            .push((to.to_string(), body.to_string()));
        if self.failing.contains(to) {
            return Err(SmsError::Rejected {
                status: 400,
                body: "invalid destination".into(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<InMemorySessionRepository>,
    pub sms: Arc<RecordingSmsSender>,
}

pub fn test_app() -> TestApp {
    test_app_with_sender(RecordingSmsSender::default())
}

pub fn test_app_with_sender(sender: RecordingSmsSender) -> TestApp {
    let sessions = Arc::new(InMemorySessionRepository::new());
    let sms = Arc::new(sender);
    let (dispatcher, _worker) = NotificationDispatcher::spawn(sms.clone(), 16);
    let state = AppState::new(sessions.clone(), dispatcher, &test_config());

    let router = Router::new()
        .merge(handlers::start_router())
        .merge(handlers::router())
        .layer(axum_middleware::from_fn(logging::log_error_responses))
        .layer(axum_middleware::from_fn(request_id::request_id))
        .with_state(state);

    TestApp {
        router,
        sessions,
        sms,
    }
}

/// Only the start route, behind the per-IP limiter built from `config`.
pub fn rate_limited_start_router(config: &Config) -> Router {
    let sessions = Arc::new(InMemorySessionRepository::new());
    let (dispatcher, _worker) =
        NotificationDispatcher::spawn(Arc::new(RecordingSmsSender::default()), 16);
    let state = AppState::new(sessions, dispatcher, config);

    handlers::start_router()
        .layer(rate_limit::create_start_rate_limiter(config).expect("build rate limiter"))
        .with_state(state)
}

pub async fn post_json(router: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");
    send(router, request).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Stores an active session whose share token expired an hour ago.
pub async fn seed_expired_session(sessions: &InMemorySessionRepository, token: &str) -> SosSession {
    let created = Utc::now() - Duration::hours(7);
    let session = SosSession::new(
        "Expired".into(),
        created,
        None,
        Vec::new(),
        token.into(),
        created,
        Duration::hours(6),
    );
    assert_eq!(session.status, SosStatus::Active);
    sessions
        .insert(session.clone())
        .await
        .expect("insert expired session");
    session
}
