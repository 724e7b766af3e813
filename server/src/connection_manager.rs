//! Connection registry for the session coordinator
//!
//! This module tracks every socket that has completed the handshake:
//! - Connection lifecycle (register, bind to a room, remove)
//! - The bounded outbound queue each connection's writer task drains
//! - The identity resolved at handshake time
//! - Capacity limits
//! - Clients too slow to keep up with their queue
//!
//! Connection ids double as player ids, so a connection is a player in at most
//! one room for its whole lifetime.

use crate::identity::Identity;
use crate::profile::Profile;
use log::{debug, info, warn};
use shared::{PlayerId, ServerEvent};
use std::cell::Cell;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// The reactor's end of a connection's writer
#[derive(Debug)]
pub struct Outbound {
    /// Events for the writer task
    pub queue: mpsc::Sender<ServerEvent>,
    /// Dropped together with the connection, which tells the socket task to
    /// hang up
    pub hangup: oneshot::Sender<()>,
}

impl Outbound {
    /// Creates the queue and hangup pair for one connection.
    pub fn channel(
        capacity: usize,
    ) -> (Outbound, mpsc::Receiver<ServerEvent>, oneshot::Receiver<()>) {
        let (queue, events) = mpsc::channel(capacity);
        let (hangup, hung_up) = oneshot::channel();
        (Outbound { queue, hangup }, events, hung_up)
    }
}

/// A connected socket and its session state
///
/// Each connection holds:
/// - The queue feeding its writer task
/// - The identity resolved from its handshake token
/// - The room it has joined, once it has joined one
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier, also used as the player id
    pub id: PlayerId,
    pub outbound: Outbound,
    pub identity: Identity,
    /// Room this connection is bound to
    pub room_id: Option<String>,
    pub connected_at: Instant,
    /// Set once an event could not be queued because the queue was full
    stalled: Cell<bool>,
}

impl Connection {
    pub fn new(id: PlayerId, outbound: Outbound, identity: Identity) -> Self {
        Self {
            id,
            outbound,
            identity,
            room_id: None,
            connected_at: Instant::now(),
            stalled: Cell::new(false),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Manages all live connections
///
/// The ConnectionManager is owned by the session coordinator and is only ever
/// touched from the reactor task, so it needs no locking.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Live connections indexed by id
    connections: HashMap<PlayerId, Connection>,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ConnectionManager {
    /// Creates an empty registry with the given capacity limit
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_connections,
        }
    }

    /// Registers a connection that has completed its handshake
    ///
    /// Returns false if the server is at capacity or the id is already taken.
    pub fn add(&mut self, id: PlayerId, outbound: Outbound, identity: Identity) -> bool {
        if self.connections.len() >= self.max_connections || self.connections.contains_key(&id) {
            return false;
        }

        info!(
            "Connection {} registered ({}), total connections: {}",
            id,
            match &identity.uid {
                Some(uid) => format!("user {}", uid),
                None => "guest".to_string(),
            },
            self.connections.len() + 1
        );
        self.connections.insert(id, Connection::new(id, outbound, identity));
        true
    }

    /// Removes a connection and returns its final state
    pub fn remove(&mut self, id: PlayerId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        info!(
            "Connection {} closed after {:.1}s",
            id,
            connection.uptime().as_secs_f32()
        );
        Some(connection)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Room the connection is bound to, if any
    pub fn room_of(&self, id: PlayerId) -> Option<&str> {
        self.connections.get(&id)?.room_id.as_deref()
    }

    /// Binds a connection to a room. A connection binds at most once.
    pub fn bind(&mut self, id: PlayerId, room_id: &str) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) if connection.room_id.is_none() => {
                connection.room_id = Some(room_id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Queues an event for a connection's writer task
    ///
    /// Returns false when the connection is unknown, its writer is gone or
    /// its queue is full. A full queue marks the connection as stalled; the
    /// disconnect event for a vanished writer arrives separately.
    pub fn send(&self, id: PlayerId, event: ServerEvent) -> bool {
        let connection = match self.connections.get(&id) {
            Some(connection) => connection,
            None => return false,
        };

        match connection.outbound.queue.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                if !connection.stalled.replace(true) {
                    warn!("Outbound queue for connection {} is full, disconnecting", id);
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Writer for connection {} is gone, dropping event", id);
                false
            }
        }
    }

    /// Connections that fell behind and have to be dropped
    pub fn stalled(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .connections
            .values()
            .filter(|c| c.stalled.get())
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Replaces the profile attached to a connection after a profile change
    pub fn set_profile(&mut self, id: PlayerId, profile: Profile) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) => {
                connection.identity.uid = Some(profile.uid.clone());
                connection.identity.profile = Some(profile);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
