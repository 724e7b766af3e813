//! # Planning Poker Session Server
//!
//! This library provides the authoritative server for real-time planning
//! poker rooms. It owns every room, applies client events in arrival order and
//! pushes the resulting room state to each member.
//!
//! ## Core Responsibilities
//!
//! ### Room Coordination
//! Players create or join rooms by a six-character code, move their avatars
//! around a shared canvas, pick estimation cards and chat. The room's game
//! master reveals and resets rounds, edits the story under estimation and can
//! hand the role to another member.
//!
//! ### Scoring
//! When cards are revealed in a room of three or more players, votes that
//! match the most common numeric estimate earn 3 points and other numeric
//! votes earn 1. Points of signed-in players are persisted to their profile
//! and to the running two-week season.
//!
//! ### Identity
//! A client may present a token on connect. Tokens resolve to persistent
//! profiles; anything that fails to resolve plays as a guest.
//!
//! ## Architecture Design
//!
//! ### Single Reactor
//! All state lives in one [`session::SessionCoordinator`] driven by one task.
//! Socket readers, expiry timers and profile-store jobs only ever post
//! [`session::ReactorEvent`]s to its queue, so no room state is shared
//! between tasks and no locks are taken on the hot path.
//!
//! ### TCP Framing
//! Each connection carries length-prefixed bincode frames (see
//! [`shared::codec`]). A connection opens with a hello frame naming its
//! protocol version and optional token.
//!
//! ## Module Organization
//!
//! - `room`, `room_store`: room state, invariants and the room registry
//! - `session`, `connection_manager`: the reactor and its connection table
//! - `scoring`, `season`: round scoring, award persistence and leaderboards
//! - `profile`, `identity`: the profile store boundary and token resolution
//! - `spawn`, `utils`: spawn placement and small helpers
//! - `network`, `config`: sockets, handshake and server settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::profile::MemoryProfileStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryProfileStore::new());
//!     let server = Server::bind(ServerConfig::default(), store).await?;
//!
//!     // Accepts connections until the reactor is shut down
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection_manager;
pub mod identity;
pub mod network;
pub mod profile;
pub mod room;
pub mod room_store;
pub mod scoring;
pub mod season;
pub mod session;
pub mod spawn;
pub mod utils;
