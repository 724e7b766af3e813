//! # Planning Poker Client Library
//!
//! Client-side pieces for talking to the session server: the connection with
//! its handshake, parsing of typed commands, and plain-text rendering of room
//! updates.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Opens the TCP connection, performs the hello handshake and exposes the
//! event stream. A background task reads frames so receiving can be raced
//! against other input.
//!
//! ### Commands Module (`commands`)
//! Turns a line of user input into a room event or an auxiliary request.
//!
//! ### View Module (`view`)
//! Keeps the latest room snapshot and describes each server event as text.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Connection;
//! use shared::{ClientEvent, ServerEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connection = Connection::connect("127.0.0.1:3000", None).await?;
//!     connection
//!         .send_event(ClientEvent::CreateRoom {
//!             player_name: "Ada".to_string(),
//!             avatar: None,
//!         })
//!         .await?;
//!
//!     while let Some(event) = connection.recv().await {
//!         if let ServerEvent::RoomJoined { room_id, .. } = event {
//!             println!("share this code: {}", room_id);
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod network;
pub mod view;
