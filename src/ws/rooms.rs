//! WebSocket entry point and the room manager loop.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Query, Request,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::auth::UserStore;
use crate::config::{AuthMode, Config};
use crate::http::middleware::cors::origin_allowed;
use crate::observability::metrics;
use crate::turn::RelayCredentials;
use crate::ws::registry::{Event, Registry, OUTBOX_CAPACITY};
use crate::ws::RoomManager;

#[derive(Debug, Deserialize)]
struct StreamParams {
    #[serde(default)]
    room: String,
}

/// Room manager backed by an in-process [`Registry`].
pub struct Rooms {
    config: Arc<Config>,
    users: Arc<dyn UserStore>,
    relay: Arc<dyn RelayCredentials>,
    events: mpsc::UnboundedSender<Event>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
}

impl Rooms {
    pub fn new(
        relay: Arc<dyn RelayCredentials>,
        users: Arc<dyn UserStore>,
        config: Arc<Config>,
    ) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        Self {
            config,
            users,
            relay,
            events,
            inbox: Mutex::new(Some(inbox)),
        }
    }

    async fn handshake(&self, request: Request) -> Response {
        let (mut parts, _body) = request.into_parts();

        if !origin_allowed(&self.config, &parts.headers, &parts.uri) {
            let origin = parts.headers.get(header::ORIGIN);
            tracing::debug!(origin = ?origin, "WebSocket origin rejected");
            return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
        }

        let user = self.users.current_user(&parts.headers);
        if self.config.auth_mode == AuthMode::All && user.is_none() {
            return (StatusCode::UNAUTHORIZED, "Login required").into_response();
        }

        let params = match Query::<StreamParams>::try_from_uri(&parts.uri) {
            Ok(Query(params)) => params,
            Err(rejection) => return rejection.into_response(),
        };
        if params.room.is_empty() {
            return (StatusCode::BAD_REQUEST, "Missing room").into_response();
        }

        let upgrade: WebSocketUpgrade =
            match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
                Ok(upgrade) => upgrade,
                Err(rejection) => return rejection.into_response(),
            };

        let events = self.events.clone();
        upgrade.on_upgrade(move |socket| session(socket, params.room, user, events))
    }

    async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let inbox = self
            .inbox
            .lock()
            .map(|mut inbox| inbox.take())
            .unwrap_or(None);
        let Some(mut inbox) = inbox else {
            tracing::warn!("Room manager already started");
            return;
        };

        let mut registry = Registry::new(
            self.config.auth_mode,
            self.config.close_room_when_owner_leaves,
            Arc::clone(&self.relay),
        );
        tracing::info!("Room manager started");

        loop {
            tokio::select! {
                event = inbox.recv() => {
                    let Some(event) = event else { break };
                    registry.handle(event);
                    metrics::set_sessions_active(registry.session_count());
                    metrics::set_rooms_active(registry.room_count());
                }
                _ = shutdown.recv() => break,
            }
        }

        registry.close_all();
        metrics::set_sessions_active(0);
        metrics::set_rooms_active(0);
        tracing::info!("Room manager stopped");
    }
}

impl RoomManager for Rooms {
    fn upgrade(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(self.handshake(request))
    }

    fn start(self: Arc<Self>, shutdown: broadcast::Receiver<()>) -> BoxFuture<'static, ()> {
        Box::pin(self.run(shutdown))
    }
}

/// Pump one socket: inbound frames become events, the outbox feeds the
/// socket until the registry drops it.
async fn session(
    socket: WebSocket,
    room: String,
    user: Option<String>,
    events: mpsc::UnboundedSender<Event>,
) {
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut pending) = mpsc::channel::<String>(OUTBOX_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(text) = pending.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    if events
        .send(Event::Join {
            session: id,
            room,
            user,
            outbox,
        })
        .is_ok()
    {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    let event = Event::Text {
                        session: id,
                        text: text.as_str().to_owned(),
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        let _ = events.send(Event::Leave { session: id });
    }

    if let Err(e) = writer.await {
        tracing::warn!(session = %id, error = %e, "WebSocket writer failed");
    }
}
