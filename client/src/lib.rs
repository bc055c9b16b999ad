//! # Blob Arena Client Library
//!
//! This library provides the client side of the blob arena: a WebSocket
//! connection to the authoritative server, a mirror of the world it
//! describes, pointer input, and a macroquad renderer.
//!
//! ## Architecture Overview
//!
//! The client never simulates. The server broadcasts a snapshot of every
//! player on each tick and the client smooths between the last two samples
//! of every blob so movement looks continuous at any frame rate.
//!
//! ### Interpolation
//! Each blob keeps its previous and confirmed server positions plus the time
//! the confirmed one arrived. A frame renders the linear blend between them,
//! reaching the confirmed position one tick period after receipt and then
//! holding there until the next sample.
//!
//! ### Input Pacing
//! The pointer offset from the screen centre becomes a heading and a
//! magnitude. The client sends it once per received snapshot, so input
//! traffic follows the server tick rather than the frame rate.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client world mirror: players, their blob shadows, xp pickups, and
//! which player is our own.
//!
//! ### Interpolation Module (`interpolation`)
//! The per-blob shadow and the interpolation factor.
//!
//! ### Input Module (`input`)
//! Pointer sampling and the `move` message built from it.
//!
//! ### Network Module (`network`)
//! Runs the WebSocket on a dedicated thread and hands decoded messages to
//! the frame loop through a channel drained once per frame.
//!
//! ### Rendering Module (`rendering`)
//! Camera-centred drawing of the grid, pickups and player blobs.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientWorld;
//! use client::network::{self, NetworkEvent};
//! use shared::ClientMessage;
//! use std::time::Instant;
//!
//! let handle = network::connect("127.0.0.1:8080")?;
//! handle.send(ClientMessage::Spawn { name: "Alice".to_string() });
//!
//! let mut world = ClientWorld::new();
//! for event in handle.drain() {
//!     if let NetworkEvent::Message(message) = event {
//!         world.apply(message, Instant::now());
//!     }
//! }
//! world.sample(Instant::now());
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod game;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod rendering;
