//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use screego::auth::UserStore;
use screego::config::Config;
use screego::http::middleware::access_log::ACCESS_LOG_TARGET;
use screego::http::AppState;
use screego::ws::RoomManager;

pub const VERSION: &str = "1.2.3-test";

/// User store with a single `admin:admin` account. A `user=<name>` cookie
/// counts as logged in.
#[derive(Default)]
pub struct FakeUsers {
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
}

impl UserStore for FakeUsers {
    fn authenticate(&self, _request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            self.logins.fetch_add(1, Ordering::SeqCst);
            (StatusCode::OK, "login").into_response()
        })
    }

    fn logout(&self, _request: Request) -> Response {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        (StatusCode::OK, "logout").into_response()
    }

    fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .find_map(|pair| pair.trim().strip_prefix("user="))
            .map(str::to_owned)
    }

    fn validate(&self, name: &str, password: &str) -> bool {
        name == "admin" && password == "admin"
    }
}

/// Room manager that answers every upgrade with a marker body.
#[derive(Default)]
pub struct FakeRooms {
    pub upgrades: AtomicUsize,
}

impl RoomManager for FakeRooms {
    fn upgrade(&self, _request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            self.upgrades.fetch_add(1, Ordering::SeqCst);
            (StatusCode::IM_A_TEAPOT, "stream").into_response()
        })
    }

    fn start(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _ = shutdown.recv().await;
        })
    }
}

/// Config whose UI directory does not exist, so every unknown path is a 404.
pub fn test_config() -> Config {
    Config {
        cors_allowed_origins: vec!["https://app.example".into()],
        ui_dir: "/nonexistent/screego-ui".into(),
        ..Config::default()
    }
}

pub struct Fixture {
    pub state: AppState,
    pub users: Arc<FakeUsers>,
    pub rooms: Arc<FakeRooms>,
}

pub fn fixture(config: Config) -> Fixture {
    let users = Arc::new(FakeUsers::default());
    let rooms = Arc::new(FakeRooms::default());
    let state = AppState::new(Arc::new(config), rooms.clone(), users.clone(), VERSION);
    Fixture {
        state,
        users,
        rooms,
    }
}

/// Fields of one captured access log event.
pub type AccessRecord = HashMap<String, String>;

/// Layer collecting access log events.
#[derive(Clone, Default)]
pub struct AccessCapture {
    records: Arc<Mutex<Vec<AccessRecord>>>,
}

impl AccessCapture {
    pub fn records(&self) -> Vec<AccessRecord> {
        self.records.lock().unwrap().clone()
    }
}

struct FieldVisitor<'a>(&'a mut AccessRecord);

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

impl<S: Subscriber> Layer<S> for AccessCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ACCESS_LOG_TARGET {
            return;
        }
        let mut record = AccessRecord::new();
        event.record(&mut FieldVisitor(&mut record));
        self.records.lock().unwrap().push(record);
    }
}

/// Install a thread-local subscriber capturing access logs. Works with the
/// default current-thread `#[tokio::test]` runtime.
pub fn capture_access_log() -> (AccessCapture, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let capture = AccessCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

/// Layer collecting the message of every event, whatever its target.
#[derive(Clone, Default)]
pub struct MessageCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MessageCapture {
    pub fn contains(&self, message: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m == message)
    }
}

impl<S: Subscriber> Layer<S> for MessageCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut record = AccessRecord::new();
        event.record(&mut FieldVisitor(&mut record));
        if let Some(message) = record.remove("message") {
            self.messages.lock().unwrap().push(message);
        }
    }
}

/// Like [`capture_access_log`], for log messages.
pub fn capture_messages() -> (MessageCapture, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let capture = MessageCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
