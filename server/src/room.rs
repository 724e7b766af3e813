//! Room and player state
//!
//! A [`Room`] owns its players, the vote round state, in-flight throwables and
//! the chat backlog. All mutation goes through methods on `Room` so the room
//! invariants hold after every call:
//! - a non-empty room has exactly one game master
//! - cards cannot change while revealed
//! - at most [`MAX_MESSAGES`] chat messages are retained

use crate::profile::Profile;
use log::info;
use shared::{
    ChatMessageView, PlayerId, PlayerView, RoomSnapshot, ThrowableKind, ThrowableView,
    MAX_MESSAGES,
};
use std::collections::{HashMap, VecDeque};

/// A participant in exactly one room
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub x: f32,
    pub y: f32,
    pub card: Option<String>,
    pub is_game_master: bool,
    pub color: String,
    /// Stable identity of a registered or signed-in profile; `None` for guests
    pub uid: Option<String>,
    pub points: u64,
    pub is_registered: bool,
    /// Position in the room's join order, used for leader succession
    pub join_seq: u64,
}

impl Player {
    pub fn new(id: PlayerId, name: String, avatar: String, color: String, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            avatar,
            x,
            y,
            card: None,
            is_game_master: false,
            color,
            uid: None,
            points: 0,
            is_registered: false,
            join_seq: 0,
        }
    }

    fn view(&self, viewer: PlayerId, revealed: bool) -> PlayerView {
        let visible = revealed || self.id == viewer;
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            avatar: self.avatar.clone(),
            card: if visible { self.card.clone() } else { None },
            has_voted: self.card.is_some(),
            is_game_master: self.is_game_master,
            color: self.color.clone(),
            points: self.points,
            is_registered: self.is_registered,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Throwable {
    pub id: u64,
    pub kind: ThrowableKind,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub thrower_id: PlayerId,
    pub timestamp: u64,
}

impl Throwable {
    pub fn view(&self) -> ThrowableView {
        ThrowableView {
            id: self.id,
            kind: self.kind,
            x: self.x,
            y: self.y,
            target_x: self.target_x,
            target_y: self.target_y,
            thrower_id: self.thrower_id,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub player_id: PlayerId,
    pub player_name: String,
    pub text: String,
    pub timestamp: u64,
}

/// Result of removing a player from a room
#[derive(Debug)]
pub struct Departure {
    pub player: Player,
    /// Set when the departing player led the room and someone else took over
    pub new_leader: Option<PlayerId>,
}

#[derive(Debug)]
pub struct Room {
    pub id: String,
    players: HashMap<PlayerId, Player>,
    cards_revealed: bool,
    current_story: Option<String>,
    throwables: Vec<Throwable>,
    messages: VecDeque<ChatMessage>,
    next_join_seq: u64,
    next_item_id: u64,
}

impl Room {
    pub fn new(id: String) -> Self {
        Self {
            id,
            players: HashMap::new(),
            cards_revealed: false,
            current_story: None,
            throwables: Vec::new(),
            messages: VecDeque::new(),
            next_join_seq: 0,
            next_item_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn cards_revealed(&self) -> bool {
        self.cards_revealed
    }

    pub fn current_story(&self) -> Option<&str> {
        self.current_story.as_deref()
    }

    pub fn throwables(&self) -> &[Throwable] {
        &self.throwables
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Players in join order
    pub fn players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.join_seq);
        players
    }

    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.players.values().map(|p| (p.x, p.y)).collect()
    }

    pub fn game_master(&self) -> Option<PlayerId> {
        self.players
            .values()
            .find(|p| p.is_game_master)
            .map(|p| p.id)
    }

    pub fn is_game_master(&self, id: PlayerId) -> bool {
        self.players.get(&id).map_or(false, |p| p.is_game_master)
    }

    fn next_item_id(&mut self) -> u64 {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    /// Adds a player. The first player of an empty room becomes game master;
    /// otherwise the current leader is kept.
    pub fn add_player(&mut self, mut player: Player) -> &Player {
        player.join_seq = self.next_join_seq;
        self.next_join_seq += 1;
        player.is_game_master = self.players.is_empty();
        if player.is_game_master {
            info!("Player {} is now game master of room {}", player.name, self.id);
        }

        let id = player.id;
        self.players.insert(id, player);
        &self.players[&id]
    }

    /// Removes a player and, if they led the room, promotes the earliest-joined
    /// remaining player.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Departure> {
        let player = self.players.remove(&id)?;

        let mut new_leader = None;
        if player.is_game_master {
            if let Some(successor) = self.players.values_mut().min_by_key(|p| p.join_seq) {
                successor.is_game_master = true;
                new_leader = Some(successor.id);
                info!(
                    "Player {} inherits game master of room {}",
                    successor.name, self.id
                );
            }
        }

        Some(Departure { player, new_leader })
    }

    /// Positions are taken verbatim from the client.
    pub fn move_player(&mut self, id: PlayerId, x: f32, y: f32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.x = x;
                player.y = y;
                true
            }
            None => false,
        }
    }

    /// Sets a player's card. A no-op once cards are revealed. Returns true
    /// only when the card actually changed.
    pub fn select_card(&mut self, id: PlayerId, value: &str) -> bool {
        if self.cards_revealed {
            return false;
        }
        match self.players.get_mut(&id) {
            Some(player) if player.card.as_deref() != Some(value) => {
                player.card = Some(value.to_string());
                true
            }
            _ => false,
        }
    }

    /// Reveals the round and returns the votes cast, in join order. Returns
    /// `None` when the round was already revealed.
    pub fn reveal(&mut self) -> Option<Vec<(PlayerId, String)>> {
        if self.cards_revealed {
            return None;
        }
        self.cards_revealed = true;

        Some(
            self.players()
                .into_iter()
                .filter_map(|p| p.card.clone().map(|card| (p.id, card)))
                .collect(),
        )
    }

    /// Starts a new round: hides cards, clears every vote and drops all
    /// throwables. Returns the ids of the throwables dropped.
    pub fn reset_round(&mut self) -> Vec<u64> {
        self.cards_revealed = false;
        for player in self.players.values_mut() {
            player.card = None;
        }
        self.throwables.drain(..).map(|t| t.id).collect()
    }

    /// Launches a throwable from the thrower's current position.
    pub fn add_throwable(
        &mut self,
        thrower_id: PlayerId,
        kind: ThrowableKind,
        target_x: f32,
        target_y: f32,
        timestamp: u64,
    ) -> Option<Throwable> {
        let (x, y) = {
            let thrower = self.players.get(&thrower_id)?;
            (thrower.x, thrower.y)
        };

        let throwable = Throwable {
            id: self.next_item_id(),
            kind,
            x,
            y,
            target_x,
            target_y,
            thrower_id,
            timestamp,
        };
        self.throwables.push(throwable.clone());
        Some(throwable)
    }

    pub fn remove_throwable(&mut self, id: u64) -> bool {
        let before = self.throwables.len();
        self.throwables.retain(|t| t.id != id);
        self.throwables.len() != before
    }

    pub fn set_story(&mut self, story: String) {
        self.current_story = Some(story);
    }

    /// Moves the game master flag from `from` to `to`. Both must be members and
    /// `from` must currently lead.
    pub fn transfer_leader(&mut self, from: PlayerId, to: PlayerId) -> bool {
        if from == to || !self.is_game_master(from) || !self.players.contains_key(&to) {
            return false;
        }

        if let Some(current) = self.players.get_mut(&from) {
            current.is_game_master = false;
        }
        if let Some(target) = self.players.get_mut(&to) {
            target.is_game_master = true;
        }
        true
    }

    /// Appends a chat message, evicting the oldest past the retention limit.
    pub fn add_message(&mut self, player_id: PlayerId, text: String, timestamp: u64) -> Option<u64> {
        let player_name = self.players.get(&player_id)?.name.clone();
        let id = self.next_item_id();

        self.messages.push_back(ChatMessage {
            id,
            player_id,
            player_name,
            text,
            timestamp,
        });
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_front();
        }
        Some(id)
    }

    pub fn set_player_points(&mut self, id: PlayerId, points: u64) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.points = points;
                true
            }
            None => false,
        }
    }

    /// Copies display identity and score from a freshly loaded profile.
    pub fn sync_profile(&mut self, id: PlayerId, profile: &Profile) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.name = profile.display_name.clone();
                player.avatar = profile.avatar.clone();
                player.points = profile.points;
                player.is_registered = profile.is_registered;
                player.uid = Some(profile.uid.clone());
                true
            }
            None => false,
        }
    }

    /// Renders the full room state as seen by `viewer`.
    pub fn snapshot_for(&self, viewer: PlayerId) -> RoomSnapshot {
        RoomSnapshot {
            players: self
                .players()
                .into_iter()
                .map(|p| p.view(viewer, self.cards_revealed))
                .collect(),
            cards_revealed: self.cards_revealed,
            current_story: self.current_story.clone(),
            throwables: self.throwables.iter().map(Throwable::view).collect(),
            messages: self
                .messages
                .iter()
                .map(|m| ChatMessageView {
                    id: m.id,
                    player_id: m.player_id,
                    player_name: m.player_name.clone(),
                    text: m.text.clone(),
                    timestamp: m.timestamp,
                })
                .collect(),
        }
    }
}
