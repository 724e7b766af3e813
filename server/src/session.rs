//! Session coordinator: the single reactor that owns all room state
//!
//! Every inbound protocol event, timer expiry and profile-store completion is
//! a [`ReactorEvent`] on one queue. [`SessionCoordinator::handle`] processes
//! each event to completion before the next, so rooms and connections are
//! never shared between tasks. Blocking profile-store work runs on
//! `spawn_blocking` and reports back through the same queue; the results are
//! re-validated against the current membership when they arrive.

use crate::config::ServerConfig;
use crate::connection_manager::{ConnectionManager, Outbound};
use crate::identity::Identity;
use crate::profile::{Profile, ProfileStore};
use crate::room::{Player, Room};
use crate::room_store::{normalize_room_code, random_room_code, RoomStore};
use crate::scoring::{persist_awards, round_awards, PendingAward, PersistedAward};
use crate::season::{SeasonId, SeasonKeeper};
use crate::spawn::find_spawn_point;
use crate::utils::{get_timestamp, random_avatar, random_color, sanitize_player_name};
use chrono::Utc;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    is_valid_card, ClientEvent, PlayerId, Request, Response, ServerEvent, ThrowableKind,
    MAX_MESSAGE_LEN, MAX_STORY_LEN, ROOM_NOT_FOUND,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything the reactor reacts to
#[derive(Debug)]
pub enum ReactorEvent {
    /// A connection finished its handshake
    Connected {
        conn: PlayerId,
        outbound: Outbound,
        identity: Identity,
    },
    Event {
        conn: PlayerId,
        event: ClientEvent,
    },
    Request {
        conn: PlayerId,
        request_id: u32,
        request: Request,
    },
    Disconnected {
        conn: PlayerId,
    },
    ThrowableExpired {
        room_id: String,
        throwable_id: u64,
    },
    /// Award persistence for a revealed round has finished
    AwardsPersisted {
        room_id: String,
        awards: Vec<PersistedAward>,
    },
    /// A profile was created or edited on behalf of a connection
    ProfileChanged {
        conn: PlayerId,
        profile: Profile,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    UnknownConnection(PlayerId),
    NotInRoom(PlayerId),
    RoomVanished(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownConnection(id) => write!(f, "unknown connection {}", id),
            SessionError::NotInRoom(id) => write!(f, "connection {} has not joined a room", id),
            SessionError::RoomVanished(room_id) => {
                write!(f, "room {} is bound but no longer exists", room_id)
            }
        }
    }
}

impl std::error::Error for SessionError {}

pub struct SessionCoordinator {
    rooms: RoomStore,
    connections: ConnectionManager,
    store: Arc<dyn ProfileStore>,
    seasons: Arc<SeasonKeeper>,
    reactor_tx: mpsc::UnboundedSender<ReactorEvent>,
    /// room id -> throwable id -> pending expiry task
    expiry_tasks: HashMap<String, HashMap<u64, JoinHandle<()>>>,
    throwable_ttl: Duration,
    rng: StdRng,
}

impl SessionCoordinator {
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn ProfileStore>,
        seasons: Arc<SeasonKeeper>,
        reactor_tx: mpsc::UnboundedSender<ReactorEvent>,
    ) -> Self {
        Self {
            rooms: RoomStore::new(),
            connections: ConnectionManager::new(config.max_connections),
            store,
            seasons,
            reactor_tx,
            expiry_tasks: HashMap::new(),
            throwable_ttl: config.throwable_ttl,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the random source, for reproducible room codes and spawns.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Number of throwables in a room still waiting to expire
    pub fn pending_expiries(&self, room_id: &str) -> usize {
        self.expiry_tasks.get(room_id).map_or(0, HashMap::len)
    }

    /// Drains the reactor queue until shutdown or until every sender is gone.
    pub async fn run(mut self, mut reactor_rx: mpsc::UnboundedReceiver<ReactorEvent>) {
        info!("Session coordinator started");
        while let Some(event) = reactor_rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        for (_, tasks) in self.expiry_tasks.drain() {
            for (_, task) in tasks {
                task.abort();
            }
        }
        info!("Session coordinator stopped");
    }

    /// Processes one event. Returns false on shutdown.
    pub fn handle(&mut self, event: ReactorEvent) -> bool {
        let result = match event {
            ReactorEvent::Connected {
                conn,
                outbound,
                identity,
            } => {
                self.on_connected(conn, outbound, identity);
                Ok(())
            }
            ReactorEvent::Event { conn, event } => {
                let name = event.name();
                self.on_event(conn, event).map_err(|e| (name, e))
            }
            ReactorEvent::Request {
                conn,
                request_id,
                request,
            } => self
                .on_request(conn, request_id, request)
                .map_err(|e| ("request", e)),
            ReactorEvent::Disconnected { conn } => {
                self.on_disconnected(conn).map_err(|e| ("disconnect", e))
            }
            ReactorEvent::ThrowableExpired {
                room_id,
                throwable_id,
            } => {
                self.on_throwable_expired(&room_id, throwable_id);
                Ok(())
            }
            ReactorEvent::AwardsPersisted { room_id, awards } => {
                self.on_awards_persisted(&room_id, awards);
                Ok(())
            }
            ReactorEvent::ProfileChanged { conn, profile } => self
                .on_profile_changed(conn, profile)
                .map_err(|e| ("profileChanged", e)),
            ReactorEvent::Shutdown => {
                info!("Session coordinator shutting down");
                return false;
            }
        };

        if let Err((name, e)) = result {
            match e {
                SessionError::UnknownConnection(_) | SessionError::NotInRoom(_) => {
                    debug!("Ignoring {}: {}", name, e)
                }
                SessionError::RoomVanished(_) => error!("Failed to handle {}: {}", name, e),
            }
        }
        self.drop_stalled();
        true
    }

    /// Disconnects every client whose outbound queue overflowed, including
    /// clients that overflow on the departures this broadcasts.
    fn drop_stalled(&mut self) {
        loop {
            let stalled = self.connections.stalled();
            if stalled.is_empty() {
                return;
            }
            for conn in stalled {
                if let Err(e) = self.on_disconnected(conn) {
                    error!("Failed to drop stalled connection {}: {}", conn, e);
                }
            }
        }
    }

    fn on_connected(&mut self, conn: PlayerId, outbound: Outbound, identity: Identity) {
        let welcome = ServerEvent::Welcome {
            connection_id: conn,
            profile: identity.profile.as_ref().map(Profile::view),
            needs_display_name: identity.needs_display_name(),
        };

        let queue = outbound.queue.clone();
        if self.connections.add(conn, outbound, identity) {
            self.connections.send(conn, welcome);
        } else {
            warn!("Rejecting connection {}: server full", conn);
            let rejected = ServerEvent::Rejected {
                reason: "Server full".to_string(),
            };
            if let Err(e) = queue.try_send(rejected) {
                debug!("Could not tell connection {} it was rejected: {}", conn, e);
            }
        }
    }

    fn on_event(&mut self, conn: PlayerId, event: ClientEvent) -> Result<(), SessionError> {
        match event {
            ClientEvent::CreateRoom {
                player_name,
                avatar,
            } => self.create_room(conn, &player_name, avatar),
            ClientEvent::JoinRoom {
                room_id,
                player_name,
                avatar,
            } => self.join_room(conn, &room_id, &player_name, avatar),
            ClientEvent::Move { x, y } => {
                let (room, connections) = self.room_of(conn)?;
                if room.move_player(conn, x, y) {
                    broadcast_state(connections, room);
                }
                Ok(())
            }
            ClientEvent::SelectCard(value) => self.select_card(conn, &value),
            ClientEvent::RevealCards => self.reveal_cards(conn),
            ClientEvent::ResetRound => self.reset_round(conn),
            ClientEvent::ThrowItem {
                kind,
                target_x,
                target_y,
            } => self.throw_item(conn, kind, target_x, target_y),
            ClientEvent::PerformAction(action) => self.perform_action(conn, &action),
            ClientEvent::UpdateStory(story) => self.update_story(conn, story),
            ClientEvent::TransferHost(target) => self.transfer_host(conn, target),
            ClientEvent::SendMessage(text) => self.send_message(conn, &text),
        }
    }

    /// Splits out the caller's room and the connection registry.
    fn room_of(&mut self, conn: PlayerId) -> Result<(&mut Room, &ConnectionManager), SessionError> {
        let connection = self
            .connections
            .get(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let room_id = connection
            .room_id
            .as_deref()
            .ok_or(SessionError::NotInRoom(conn))?;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| SessionError::RoomVanished(room_id.to_string()))?;
        Ok((room, &self.connections))
    }

    /// True when the connection exists and has not joined a room yet.
    fn ensure_unbound(&self, conn: PlayerId) -> Result<bool, SessionError> {
        let connection = self
            .connections
            .get(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        if let Some(room_id) = &connection.room_id {
            debug!("Connection {} is already in room {}", conn, room_id);
            return Ok(false);
        }
        Ok(true)
    }

    fn create_room(
        &mut self,
        conn: PlayerId,
        player_name: &str,
        avatar: Option<String>,
    ) -> Result<(), SessionError> {
        if !self.ensure_unbound(conn)? {
            return Ok(());
        }

        let rng = &mut self.rng;
        let room_id = self.rooms.create_with(|| random_room_code(rng));
        self.admit(conn, &room_id, player_name, avatar)
    }

    fn join_room(
        &mut self,
        conn: PlayerId,
        room_id: &str,
        player_name: &str,
        avatar: Option<String>,
    ) -> Result<(), SessionError> {
        if !self.ensure_unbound(conn)? {
            return Ok(());
        }

        let room_id = normalize_room_code(room_id);
        if !self.rooms.contains(&room_id) {
            info!("Connection {} tried to join unknown room {}", conn, room_id);
            self.connections
                .send(conn, ServerEvent::Error(ROOM_NOT_FOUND.to_string()));
            return Ok(());
        }
        self.admit(conn, &room_id, player_name, avatar)
    }

    /// Places the caller in an existing room and announces it.
    fn admit(
        &mut self,
        conn: PlayerId,
        room_id: &str,
        player_name: &str,
        avatar: Option<String>,
    ) -> Result<(), SessionError> {
        let profile = self
            .connections
            .get(conn)
            .ok_or(SessionError::UnknownConnection(conn))?
            .identity
            .profile
            .clone();
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| SessionError::RoomVanished(room_id.to_string()))?;

        let (x, y) = find_spawn_point(&mut self.rng, &room.positions());
        let color = random_color(&mut self.rng);
        let player = match &profile {
            Some(profile) => {
                let mut player = Player::new(
                    conn,
                    profile.display_name.clone(),
                    profile.avatar.clone(),
                    color,
                    x,
                    y,
                );
                player.uid = Some(profile.uid.clone());
                player.points = profile.points;
                player.is_registered = profile.is_registered;
                player
            }
            None => {
                let avatar = match avatar.map(|a| a.trim().to_string()) {
                    Some(a) if !a.is_empty() => a,
                    _ => random_avatar(&mut self.rng),
                };
                Player::new(conn, sanitize_player_name(player_name), avatar, color, x, y)
            }
        };

        let name = room.add_player(player).name.clone();
        info!(
            "Player {} ({}) joined room {} at ({:.0}, {:.0}), players: {}",
            name,
            conn,
            room_id,
            x,
            y,
            room.len()
        );

        self.connections.bind(conn, room_id);
        self.connections.send(
            conn,
            ServerEvent::RoomJoined {
                room_id: room_id.to_string(),
                player_id: conn,
                profile: profile.as_ref().map(Profile::view),
            },
        );
        broadcast_state(&self.connections, room);
        Ok(())
    }

    fn select_card(&mut self, conn: PlayerId, value: &str) -> Result<(), SessionError> {
        if !is_valid_card(value) {
            warn!("Dropping invalid card '{}' from {}", value, conn);
            return Ok(());
        }

        let (room, connections) = self.room_of(conn)?;
        if room.select_card(conn, value) {
            broadcast_state(connections, room);
        } else {
            debug!("Card selection by {} ignored, unchanged or already revealed", conn);
        }
        Ok(())
    }

    fn reveal_cards(&mut self, conn: PlayerId) -> Result<(), SessionError> {
        let (room, connections) = self.room_of(conn)?;
        if !room.is_game_master(conn) {
            debug!("Reveal by non-leader {} in room {} ignored", conn, room.id);
            return Ok(());
        }
        let votes = match room.reveal() {
            Some(votes) => votes,
            None => {
                debug!("Room {} already revealed", room.id);
                return Ok(());
            }
        };

        let awards = round_awards(room.len(), &votes);
        let pending: Vec<PendingAward> = awards
            .iter()
            .filter_map(|award| {
                let uid = room.player(award.player_id)?.uid.clone()?;
                Some(PendingAward {
                    player_id: award.player_id,
                    uid,
                    points: award.points,
                })
            })
            .collect();

        info!(
            "Room {} revealed {} votes, {} awards",
            room.id,
            votes.len(),
            awards.len()
        );
        broadcast_state(connections, room);
        if !awards.is_empty() {
            broadcast(connections, room, ServerEvent::PointsAwarded(awards));
        }

        let room_id = room.id.clone();
        if !pending.is_empty() {
            self.persist_round(room_id, pending);
        }
        Ok(())
    }

    fn persist_round(&self, room_id: String, pending: Vec<PendingAward>) {
        let store = Arc::clone(&self.store);
        let reactor_tx = self.reactor_tx.clone();
        let season_id = SeasonId::current().to_string();

        tokio::task::spawn_blocking(move || {
            let awards = persist_awards(store.as_ref(), &pending, &season_id, &room_id, Utc::now());
            if reactor_tx
                .send(ReactorEvent::AwardsPersisted { room_id, awards })
                .is_err()
            {
                debug!("Reactor stopped before awards were persisted");
            }
        });
    }

    fn reset_round(&mut self, conn: PlayerId) -> Result<(), SessionError> {
        let (room, connections) = self.room_of(conn)?;
        if !room.is_game_master(conn) {
            debug!("Reset by non-leader {} in room {} ignored", conn, room.id);
            return Ok(());
        }

        let dropped = room.reset_round();
        broadcast_state(connections, room);
        let room_id = room.id.clone();

        if let Some(tasks) = self.expiry_tasks.get_mut(&room_id) {
            for id in dropped {
                if let Some(task) = tasks.remove(&id) {
                    task.abort();
                }
            }
        }
        debug!("Room {} reset", room_id);
        Ok(())
    }

    fn throw_item(
        &mut self,
        conn: PlayerId,
        kind: ThrowableKind,
        target_x: f32,
        target_y: f32,
    ) -> Result<(), SessionError> {
        let (room, connections) = self.room_of(conn)?;
        let throwable = match room.add_throwable(conn, kind, target_x, target_y, get_timestamp()) {
            Some(throwable) => throwable,
            None => return Err(SessionError::NotInRoom(conn)),
        };
        broadcast(connections, room, ServerEvent::ItemThrown(throwable.view()));
        let room_id = room.id.clone();

        let reactor_tx = self.reactor_tx.clone();
        let ttl = self.throwable_ttl;
        let expiring_room = room_id.clone();
        let throwable_id = throwable.id;
        let task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = reactor_tx.send(ReactorEvent::ThrowableExpired {
                room_id: expiring_room,
                throwable_id,
            });
        });
        self.expiry_tasks
            .entry(room_id)
            .or_default()
            .insert(throwable_id, task);
        Ok(())
    }

    fn on_throwable_expired(&mut self, room_id: &str, throwable_id: u64) {
        if let Some(tasks) = self.expiry_tasks.get_mut(room_id) {
            tasks.remove(&throwable_id);
        }
        match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.remove_throwable(throwable_id);
            }
            None => debug!("Throwable {} expired after room {} closed", throwable_id, room_id),
        }
    }

    fn perform_action(&mut self, conn: PlayerId, action: &str) -> Result<(), SessionError> {
        let (room, connections) = self.room_of(conn)?;
        broadcast(
            connections,
            room,
            ServerEvent::PlayerAction {
                player_id: conn,
                action: action.to_string(),
                timestamp: get_timestamp(),
            },
        );
        Ok(())
    }

    fn update_story(&mut self, conn: PlayerId, story: String) -> Result<(), SessionError> {
        if story.chars().count() > MAX_STORY_LEN {
            warn!("Dropping oversized story from {}", conn);
            return Ok(());
        }

        let (room, connections) = self.room_of(conn)?;
        if !room.is_game_master(conn) {
            debug!("Story update by non-leader {} in room {} ignored", conn, room.id);
            return Ok(());
        }
        room.set_story(story);
        broadcast_state(connections, room);
        Ok(())
    }

    fn transfer_host(&mut self, conn: PlayerId, target: PlayerId) -> Result<(), SessionError> {
        let (room, connections) = self.room_of(conn)?;
        if room.transfer_leader(conn, target) {
            info!("Room {} game master moved from {} to {}", room.id, conn, target);
            broadcast_state(connections, room);
        } else {
            debug!("Host transfer {} -> {} in room {} ignored", conn, target, room.id);
        }
        Ok(())
    }

    fn send_message(&mut self, conn: PlayerId, text: &str) -> Result<(), SessionError> {
        let len = text.chars().count();
        if len == 0 || len > MAX_MESSAGE_LEN {
            warn!("Dropping chat message from {} ({} chars)", conn, len);
            return Ok(());
        }

        let (room, connections) = self.room_of(conn)?;
        if room.add_message(conn, text.to_string(), get_timestamp()).is_some() {
            broadcast_state(connections, room);
        }
        Ok(())
    }

    fn on_disconnected(&mut self, conn: PlayerId) -> Result<(), SessionError> {
        let connection = self
            .connections
            .remove(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let room_id = match connection.room_id {
            Some(room_id) => room_id,
            None => return Ok(()),
        };
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| SessionError::RoomVanished(room_id.clone()))?;

        if let Some(departure) = room.remove_player(conn) {
            info!(
                "Player {} ({}) left room {}, players: {}",
                departure.player.name,
                conn,
                room_id,
                room.len()
            );
        }

        if room.is_empty() {
            self.rooms.remove_if_empty(&room_id);
            if let Some(tasks) = self.expiry_tasks.remove(&room_id) {
                for (_, task) in tasks {
                    task.abort();
                }
            }
        } else {
            broadcast_state(&self.connections, room);
        }
        Ok(())
    }

    fn on_awards_persisted(&mut self, room_id: &str, awards: Vec<PersistedAward>) {
        let room = match self.rooms.get_mut(room_id) {
            Some(room) => room,
            None => {
                debug!("Room {} closed before its awards were saved", room_id);
                return;
            }
        };

        let mut changed = false;
        for award in awards {
            // The player may have left, or the id reused by nobody else.
            let still_here = room
                .player(award.player_id)
                .map_or(false, |p| p.uid.as_deref() == Some(award.uid.as_str()));
            if still_here {
                changed |= room.set_player_points(award.player_id, award.total_points);
            }
        }
        if changed {
            broadcast_state(&self.connections, room);
        }
    }

    fn on_profile_changed(&mut self, conn: PlayerId, profile: Profile) -> Result<(), SessionError> {
        if !self.connections.set_profile(conn, profile.clone()) {
            return Err(SessionError::UnknownConnection(conn));
        }
        match self.room_of(conn) {
            Ok((room, connections)) => {
                if room.sync_profile(conn, &profile) {
                    broadcast_state(connections, room);
                }
                Ok(())
            }
            Err(SessionError::NotInRoom(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn on_request(
        &mut self,
        conn: PlayerId,
        request_id: u32,
        request: Request,
    ) -> Result<(), SessionError> {
        let uid = self
            .connections
            .get(conn)
            .ok_or(SessionError::UnknownConnection(conn))?
            .identity
            .uid
            .clone();

        match request {
            Request::CheckDisplayName(name) => {
                self.respond_with(conn, request_id, move |store| {
                    let available = match store.is_display_name_available(&name, uid.as_deref()) {
                        Ok(available) => available,
                        Err(e) => {
                            error!("Display name check failed: {}", e);
                            false
                        }
                    };
                    (Response::DisplayNameAvailability { available }, None)
                })
            }
            Request::GetLeaderboard => {
                let seasons = Arc::clone(&self.seasons);
                self.respond_with(conn, request_id, move |_| {
                    let response = match seasons.leaderboard(Utc::now().date_naive()) {
                        Ok((season, leaderboard)) => Response::Leaderboard {
                            season: Some(season),
                            leaderboard,
                        },
                        Err(e) => {
                            error!("Failed to load leaderboard: {}", e);
                            Response::Leaderboard {
                                season: None,
                                leaderboard: Vec::new(),
                            }
                        }
                    };
                    (response, None)
                })
            }
            Request::CreateProfile { display_name } => {
                let uid = match uid {
                    Some(uid) => uid,
                    None => return self.reply(conn, request_id, Response::failed("Not authenticated")),
                };
                let current_avatar = match self.room_of(conn) {
                    Ok((room, _)) => room.player(conn).map(|p| p.avatar.clone()),
                    Err(_) => None,
                };
                let avatar = current_avatar.unwrap_or_else(|| random_avatar(&mut self.rng));

                self.respond_with(conn, request_id, move |store| {
                    outcome(store.create_profile(&uid, &display_name, &avatar))
                })
            }
            Request::UpdateDisplayName(display_name) => {
                let uid = match uid {
                    Some(uid) => uid,
                    None => return self.reply(conn, request_id, Response::failed("Not authenticated")),
                };
                self.respond_with(conn, request_id, move |store| {
                    outcome(store.update_display_name(&uid, &display_name))
                })
            }
            Request::UpdateAvatar(avatar) => {
                let uid = match uid {
                    Some(uid) => uid,
                    None => return self.reply(conn, request_id, Response::failed("Not authenticated")),
                };
                self.respond_with(conn, request_id, move |store| {
                    outcome(store.update_avatar(&uid, avatar.trim()))
                })
            }
        }
        Ok(())
    }

    fn reply(&self, conn: PlayerId, request_id: u32, response: Response) -> Result<(), SessionError> {
        self.connections
            .send(conn, ServerEvent::Response { request_id, response });
        Ok(())
    }

    /// Runs `work` against the profile store off the reactor. The response is
    /// written straight to the caller's queue; a changed profile is posted
    /// back to the reactor so the caller's player can be updated.
    fn respond_with<F>(&self, conn: PlayerId, request_id: u32, work: F)
    where
        F: FnOnce(&dyn ProfileStore) -> (Response, Option<Profile>) + Send + 'static,
    {
        let queue = match self.connections.get(conn) {
            Some(connection) => connection.outbound.queue.clone(),
            None => return,
        };
        let store = Arc::clone(&self.store);
        let reactor_tx = self.reactor_tx.clone();

        tokio::task::spawn_blocking(move || {
            let (response, changed) = work(store.as_ref());
            if let Some(profile) = changed {
                let _ = reactor_tx.send(ReactorEvent::ProfileChanged { conn, profile });
            }
            if let Err(e) = queue.try_send(ServerEvent::Response {
                request_id,
                response,
            }) {
                warn!("Dropping response {} for connection {}: {}", request_id, conn, e);
            }
        });
    }
}

fn outcome(result: Result<Profile, crate::profile::StoreError>) -> (Response, Option<Profile>) {
    match result {
        Ok(profile) => (Response::ok(), Some(profile)),
        Err(e) => {
            warn!("Profile request failed: {}", e);
            (Response::failed(e.to_string()), None)
        }
    }
}

/// Sends every member their own view of the room.
fn broadcast_state(connections: &ConnectionManager, room: &Room) {
    for player in room.players() {
        connections.send(player.id, ServerEvent::RoomState(room.snapshot_for(player.id)));
    }
}

fn broadcast(connections: &ConnectionManager, room: &Room, event: ServerEvent) {
    for player in room.players() {
        connections.send(player.id, event.clone());
    }
}
