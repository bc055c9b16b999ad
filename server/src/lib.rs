//! # Blob Arena Server Library
//!
//! This library provides the authoritative server for the blob arena. It owns
//! the canonical world, turns client requests into state changes, and
//! broadcasts a full snapshot of every player on a fixed tick so clients can
//! interpolate between them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server is the only place positions change. Clients send a heading and
//! a magnitude; the tick integrates velocity and moves each player's anchor
//! and blobs inside the square map.
//!
//! ### Session Management
//! Handles the lifecycle of every WebSocket connection:
//! - Spawning a player with the lowest free id and a random color
//! - Announcing new players to everyone and catching the newcomer up
//! - Validating movement requests and closing on protocol violations
//! - Removing the player and recycling its id on disconnect
//!
//! ### State Broadcasting
//! Every tick sends one `updatePlayers` snapshot to each spawned session.
//! There is no delta compression or interest filtering, which keeps the
//! player cap small.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One `tokio::select!` loop owns the [`world::World`] and processes
//! connection events and tick firings sequentially. Connection tasks only
//! decode and encode frames, so the tick never observes a half-applied
//! spawn or disconnect.
//!
//! ### WebSocket Transport
//! Each message is a single binary frame holding a `[tag, payload]` pair
//! encoded by the `shared` protocol module. Frames that fail to decode close
//! the connection; unknown tags are skipped.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! Player registry, id pool, static xp pickups and the connection mapping.
//!
//! ### Session Module (`session`)
//! Per-connection state machine producing addressed outgoing messages.
//!
//! ### Tick Module (`tick`)
//! Converts measured tick intervals into logical time and builds snapshots.
//!
//! ### Network Module (`network`)
//! Listener, connection tasks, and the main event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::GameConfig;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut server = Server::new("127.0.0.1:8080", GameConfig::default()).await?;
//!
//!     // Accepts WebSocket clients and runs the 67 ms tick until the process exits
//!     server.run().await
//! }
//! ```

pub mod network;
pub mod session;
pub mod tick;
pub mod utils;
pub mod world;
