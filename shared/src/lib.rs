//! Wire protocol shared by the pointing-party server and its clients.
//!
//! Every message on the wire is one of [`ClientMessage`] (client to server) or
//! [`ServerEvent`] (server to client), wrapped in a length-prefixed bincode
//! frame (see [`codec`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod codec;

pub use codec::{encode_frame, read_frame, write_frame, FrameError};

pub const PROTOCOL_VERSION: u32 = 1;

pub const MAX_MESSAGES: usize = 50;
pub const MAX_MESSAGE_LEN: usize = 1000;
pub const MAX_STORY_LEN: usize = 10_000;
pub const MAX_NAME_LEN: usize = 32;
pub const THROWABLE_TTL_MS: u64 = 3000;

/// Cards a player may vote with. Anything parseable as a number counts as a
/// numeric vote when scoring.
pub const CARD_DECK: [&str; 10] = ["0", "1", "2", "3", "5", "8", "13", "21", "?", "☕"];

pub const ROOM_NOT_FOUND: &str = "Room not found. Please check the room code and try again.";

/// Connection-scoped identifier; doubles as the player id inside a room.
pub type PlayerId = u64;

pub fn is_valid_card(value: &str) -> bool {
    CARD_DECK.contains(&value)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrowableKind {
    Tomato,
    Confetti,
    Ball,
    Paper,
}

impl ThrowableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrowableKind::Tomato => "tomato",
            ThrowableKind::Confetti => "confetti",
            ThrowableKind::Ball => "ball",
            ThrowableKind::Paper => "paper",
        }
    }
}

impl fmt::Display for ThrowableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThrowableKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "tomato" => Ok(ThrowableKind::Tomato),
            "confetti" => Ok(ThrowableKind::Confetti),
            "ball" => Ok(ThrowableKind::Ball),
            "paper" => Ok(ThrowableKind::Paper),
            other => Err(format!("unknown throwable '{}'", other)),
        }
    }
}

/// A player as seen by one particular recipient of a room snapshot.
///
/// `card` is only populated when the recipient is allowed to see it: after the
/// reveal, or when the recipient owns the card. `has_voted` is always accurate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub avatar: String,
    pub card: Option<String>,
    pub has_voted: bool,
    pub is_game_master: bool,
    pub color: String,
    pub points: u64,
    pub is_registered: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ThrowableView {
    pub id: u64,
    pub kind: ThrowableKind,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub thrower_id: PlayerId,
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessageView {
    pub id: u64,
    pub player_id: PlayerId,
    pub player_name: String,
    pub text: String,
    pub timestamp: u64,
}

/// Full authoritative room state. Sent whole after every mutation, never diffed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub players: Vec<PlayerView>,
    pub cards_revealed: bool,
    pub current_story: Option<String>,
    pub throwables: Vec<ThrowableView>,
    pub messages: Vec<ChatMessageView>,
}

impl RoomSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn game_master(&self) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.is_game_master)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfileView {
    pub uid: String,
    pub display_name: String,
    pub avatar: String,
    pub points: u64,
    pub season_points: u64,
    pub is_registered: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PointsAward {
    pub player_id: PlayerId,
    pub points: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub uid: String,
    pub display_name: String,
    pub avatar: String,
    pub season_points: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeasonInfo {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
}

/// Real-time room protocol events sent by a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientEvent {
    CreateRoom {
        player_name: String,
        avatar: Option<String>,
    },
    JoinRoom {
        room_id: String,
        player_name: String,
        avatar: Option<String>,
    },
    Move {
        x: f32,
        y: f32,
    },
    SelectCard(String),
    RevealCards,
    ResetRound,
    ThrowItem {
        kind: ThrowableKind,
        target_x: f32,
        target_y: f32,
    },
    PerformAction(String),
    UpdateStory(String),
    TransferHost(PlayerId),
    SendMessage(String),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CreateRoom { .. } => "createRoom",
            ClientEvent::JoinRoom { .. } => "joinRoom",
            ClientEvent::Move { .. } => "move",
            ClientEvent::SelectCard(_) => "selectCard",
            ClientEvent::RevealCards => "revealCards",
            ClientEvent::ResetRound => "resetRound",
            ClientEvent::ThrowItem { .. } => "throwItem",
            ClientEvent::PerformAction(_) => "performAction",
            ClientEvent::UpdateStory(_) => "updateStory",
            ClientEvent::TransferHost(_) => "transferHost",
            ClientEvent::SendMessage(_) => "sendMessage",
        }
    }
}

/// Request/response calls that are not scoped to a room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Request {
    CheckDisplayName(String),
    GetLeaderboard,
    CreateProfile { display_name: String },
    UpdateDisplayName(String),
    UpdateAvatar(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Response {
    DisplayNameAvailability {
        available: bool,
    },
    Leaderboard {
        season: Option<SeasonInfo>,
        leaderboard: Vec<LeaderboardEntry>,
    },
    Outcome {
        success: bool,
        error: Option<String>,
    },
}

impl Response {
    pub fn ok() -> Self {
        Response::Outcome {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Response::Outcome {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientMessage {
    /// Must be the first frame on a connection.
    Hello {
        client_version: u32,
        token: Option<String>,
    },
    Event(ClientEvent),
    Request {
        request_id: u32,
        request: Request,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerEvent {
    Welcome {
        connection_id: PlayerId,
        profile: Option<ProfileView>,
        needs_display_name: bool,
    },
    Rejected {
        reason: String,
    },
    RoomJoined {
        room_id: String,
        player_id: PlayerId,
        profile: Option<ProfileView>,
    },
    RoomState(RoomSnapshot),
    ItemThrown(ThrowableView),
    PlayerAction {
        player_id: PlayerId,
        action: String,
        timestamp: u64,
    },
    PointsAwarded(Vec<PointsAward>),
    Error(String),
    Response {
        request_id: u32,
        response: Response,
    },
}
