//! Room bookkeeping owned by the room manager loop.
//!
//! The registry is plain synchronous state. Socket tasks talk to it through
//! [`Event`]s and receive serialized [`Outgoing`] messages on their outbox;
//! dropping an outbox closes the socket. Outboxes are bounded; a session whose
//! queue is full is disconnected instead of buffering without limit.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use crate::config::AuthMode;
use crate::turn::{IceServer, RelayCredentials};

/// Messages a session may have queued before it counts as stalled.
pub const OUTBOX_CAPACITY: usize = 64;

/// Sender half of a session's outgoing message queue.
pub type Outbox = Sender<String>;

/// Input of the room manager loop.
#[derive(Debug)]
pub enum Event {
    Join {
        session: Uuid,
        room: String,
        user: Option<String>,
        outbox: Outbox,
    },
    Text {
        session: Uuid,
        text: String,
    },
    Leave {
        session: Uuid,
    },
}

/// Messages pushed to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Outgoing<'a> {
    #[serde(rename_all = "camelCase")]
    Joined {
        id: Uuid,
        room: &'a str,
        owner: bool,
        ice_servers: Vec<IceServer>,
    },
    PeerJoined {
        id: Uuid,
        user: Option<&'a str>,
    },
    PeerLeft {
        id: Uuid,
    },
    Message {
        from: Uuid,
        data: &'a str,
    },
    RoomClosed,
    Error {
        message: &'a str,
    },
}

struct Member {
    user: Option<String>,
    outbox: Outbox,
}

struct Room {
    owner: Uuid,
    members: HashMap<Uuid, Member>,
}

/// All open rooms and the sessions inside them.
pub struct Registry {
    auth_mode: AuthMode,
    close_room_when_owner_leaves: bool,
    relay: Arc<dyn RelayCredentials>,
    rooms: HashMap<String, Room>,
    sessions: HashMap<Uuid, String>,
}

impl Registry {
    pub fn new(
        auth_mode: AuthMode,
        close_room_when_owner_leaves: bool,
        relay: Arc<dyn RelayCredentials>,
    ) -> Self {
        Self {
            auth_mode,
            close_room_when_owner_leaves,
            relay,
            rooms: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn handle(&mut self, event: Event) {
        let mut stalled = match event {
            Event::Join {
                session,
                room,
                user,
                outbox,
            } => self.join(session, room, user, outbox),
            Event::Text { session, text } => self.forward(session, &text),
            Event::Leave { session } => self.leave(session),
        };
        // Evicting a session notifies its peers, which may stall more of them.
        while let Some(session) = stalled.pop() {
            tracing::warn!(session = %session, "Outbox full, disconnecting session");
            stalled.extend(self.leave(session));
        }
    }

    /// Disconnect everyone, used when the loop stops.
    pub fn close_all(&mut self) {
        for (_, room) in self.rooms.drain() {
            for member in room.members.values() {
                send(&member.outbox, &Outgoing::RoomClosed);
            }
        }
        self.sessions.clear();
    }

    fn join(
        &mut self,
        session: Uuid,
        room_id: String,
        user: Option<String>,
        outbox: Outbox,
    ) -> Vec<Uuid> {
        let creating = !self.rooms.contains_key(&room_id);
        if creating && self.auth_mode == AuthMode::Turn && user.is_none() {
            tracing::debug!(session = %session, room = %room_id, "Room creation without login refused");
            send(
                &outbox,
                &Outgoing::Error {
                    message: "login required to create a room",
                },
            );
            return Vec::new();
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| Room {
            owner: session,
            members: HashMap::new(),
        });

        let peer_joined = Outgoing::PeerJoined {
            id: session,
            user: user.as_deref(),
        };
        let stalled = broadcast(room, None, &peer_joined);

        let relay_user = user.clone().unwrap_or_else(|| session.to_string());
        send(
            &outbox,
            &Outgoing::Joined {
                id: session,
                room: &room_id,
                owner: room.owner == session,
                ice_servers: vec![self.relay.credentials(&relay_user)],
            },
        );

        tracing::info!(session = %session, room = %room_id, user = ?user, created = creating, "Session joined room");
        room.members.insert(session, Member { user, outbox });
        self.sessions.insert(session, room_id);
        stalled
    }

    fn forward(&self, session: Uuid, text: &str) -> Vec<Uuid> {
        let Some(room) = self
            .sessions
            .get(&session)
            .and_then(|room_id| self.rooms.get(room_id))
        else {
            return Vec::new();
        };
        let message = Outgoing::Message {
            from: session,
            data: text,
        };
        broadcast(room, Some(session), &message)
    }

    fn leave(&mut self, session: Uuid) -> Vec<Uuid> {
        let Some(room_id) = self.sessions.remove(&session) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        let left = room.members.remove(&session);
        tracing::info!(
            session = %session,
            room = %room_id,
            user = ?left.and_then(|m| m.user),
            "Session left room"
        );

        if room.owner == session && self.close_room_when_owner_leaves {
            if let Some(room) = self.rooms.remove(&room_id) {
                for (id, member) in room.members {
                    send(&member.outbox, &Outgoing::RoomClosed);
                    self.sessions.remove(&id);
                }
            }
            tracing::info!(room = %room_id, "Owner left, room closed");
            return Vec::new();
        }

        let stalled = broadcast(room, None, &Outgoing::PeerLeft { id: session });
        if room.members.is_empty() {
            self.rooms.remove(&room_id);
            tracing::debug!(room = %room_id, "Empty room removed");
        }
        stalled
    }
}

/// Send `message` to every member except `skip`, returning stalled sessions.
fn broadcast(room: &Room, skip: Option<Uuid>, message: &Outgoing<'_>) -> Vec<Uuid> {
    room.members
        .iter()
        .filter(|(id, _)| Some(**id) != skip)
        .filter(|(_, member)| !send(&member.outbox, message))
        .map(|(id, _)| *id)
        .collect()
}

/// Queue `message`; false only when the outbox is full.
fn send(outbox: &Outbox, message: &Outgoing<'_>) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode room message");
            return true;
        }
    };
    match outbox.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => false,
        // The socket is already gone; its leave event is on the way.
        Err(TrySendError::Closed(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::sync::mpsc::{channel, Receiver};

    struct StaticRelay;

    impl RelayCredentials for StaticRelay {
        fn credentials(&self, user: &str) -> IceServer {
            IceServer {
                urls: vec!["turn:192.0.2.1:3478".into()],
                username: user.into(),
                credential: "pw".into(),
            }
        }
    }

    fn registry(auth_mode: AuthMode, close_on_owner_leave: bool) -> Registry {
        Registry::new(auth_mode, close_on_owner_leave, Arc::new(StaticRelay))
    }

    fn join(
        registry: &mut Registry,
        room: &str,
        user: Option<&str>,
    ) -> (Uuid, Receiver<String>) {
        join_with_capacity(registry, room, user, OUTBOX_CAPACITY)
    }

    fn join_with_capacity(
        registry: &mut Registry,
        room: &str,
        user: Option<&str>,
        capacity: usize,
    ) -> (Uuid, Receiver<String>) {
        let (outbox, inbox) = channel(capacity);
        let session = Uuid::new_v4();
        registry.handle(Event::Join {
            session,
            room: room.into(),
            user: user.map(String::from),
            outbox,
        });
        (session, inbox)
    }

    fn next(inbox: &mut Receiver<String>) -> Value {
        serde_json::from_str(&inbox.try_recv().expect("message pending")).unwrap()
    }

    #[test]
    fn first_joiner_owns_room_and_gets_credentials() {
        let mut registry = registry(AuthMode::None, true);
        let (id, mut inbox) = join(&mut registry, "r", None);

        let joined = next(&mut inbox);
        assert_eq!(joined["type"], "joined");
        assert_eq!(joined["payload"]["owner"], true);
        assert_eq!(joined["payload"]["iceServers"][0]["username"], id.to_string());
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn text_is_forwarded_to_other_members_only() {
        let mut registry = registry(AuthMode::None, true);
        let (a, mut a_inbox) = join(&mut registry, "r", Some("alice"));
        let (_b, mut b_inbox) = join(&mut registry, "r", None);
        let (_c, mut other_room) = join(&mut registry, "elsewhere", None);
        next(&mut a_inbox); // joined
        assert_eq!(next(&mut a_inbox)["type"], "peerJoined");
        next(&mut b_inbox); // joined
        next(&mut other_room); // joined

        registry.handle(Event::Text {
            session: a,
            text: "offer".into(),
        });
        let message = next(&mut b_inbox);
        assert_eq!(message["type"], "message");
        assert_eq!(message["payload"]["from"], a.to_string());
        assert_eq!(message["payload"]["data"], "offer");
        assert!(a_inbox.try_recv().is_err());
        assert!(other_room.try_recv().is_err());
    }

    #[test]
    fn owner_leaving_closes_room_when_configured() {
        let mut registry = registry(AuthMode::None, true);
        let (owner, _owner_inbox) = join(&mut registry, "r", None);
        let (_guest, mut guest_inbox) = join(&mut registry, "r", None);
        next(&mut guest_inbox);

        registry.handle(Event::Leave { session: owner });
        assert_eq!(next(&mut guest_inbox)["type"], "roomClosed");
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.session_count(), 0);
        // Outbox dropped by the registry.
        assert!(matches!(
            guest_inbox.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn owner_leaving_keeps_room_otherwise() {
        let mut registry = registry(AuthMode::None, false);
        let (owner, _owner_inbox) = join(&mut registry, "r", None);
        let (guest, mut guest_inbox) = join(&mut registry, "r", None);
        next(&mut guest_inbox);

        registry.handle(Event::Leave { session: owner });
        let left = next(&mut guest_inbox);
        assert_eq!(left["type"], "peerLeft");
        assert_eq!(registry.room_count(), 1);

        registry.handle(Event::Leave { session: guest });
        assert_eq!(registry.room_count(), 0);
        // Unknown sessions are ignored.
        registry.handle(Event::Leave { session: guest });
    }

    #[test]
    fn turn_mode_requires_login_to_create_room() {
        let mut registry = registry(AuthMode::Turn, true);
        let (_, mut anonymous) = join(&mut registry, "r", None);
        assert_eq!(next(&mut anonymous)["type"], "error");
        assert_eq!(registry.room_count(), 0);

        let (_, mut alice) = join(&mut registry, "r", Some("alice"));
        assert_eq!(next(&mut alice)["type"], "joined");
        let (_, mut guest) = join(&mut registry, "r", None);
        assert_eq!(next(&mut guest)["type"], "joined");
    }

    #[test]
    fn close_all_notifies_everyone() {
        let mut registry = registry(AuthMode::None, false);
        let (_, mut a) = join(&mut registry, "one", None);
        let (_, mut b) = join(&mut registry, "two", None);
        next(&mut a);
        next(&mut b);

        registry.close_all();
        assert_eq!(next(&mut a)["type"], "roomClosed");
        assert_eq!(next(&mut b)["type"], "roomClosed");
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn stalled_session_is_disconnected() {
        let mut registry = registry(AuthMode::None, true);
        let (owner, mut owner_inbox) = join(&mut registry, "r", None);
        // Capacity 1 is used up by the joined message, which is never read.
        let (slow, mut slow_inbox) = join_with_capacity(&mut registry, "r", None, 1);
        next(&mut owner_inbox); // joined
        assert_eq!(next(&mut owner_inbox)["type"], "peerJoined");

        registry.handle(Event::Text {
            session: owner,
            text: "offer".into(),
        });

        assert_eq!(registry.session_count(), 1);
        let left = next(&mut owner_inbox);
        assert_eq!(left["type"], "peerLeft");
        assert_eq!(left["payload"]["id"], slow.to_string());

        assert_eq!(next(&mut slow_inbox)["type"], "joined");
        assert!(matches!(
            slow_inbox.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
