//! Authoritative world registry
//!
//! The [`World`] owns everything the simulation reads and writes:
//! - the bounded player id pool, always handing out the lowest free id
//! - live players in join order
//! - the static set of xp pickups scattered at startup
//! - the connection ↔ player mapping used to address broadcasts
//!
//! The world is owned by the server event loop and passed explicitly to
//! session handlers and the tick, so it needs no internal locking.

use crate::utils::random_point;
use log::info;
use rand::Rng;
use shared::{Blob, GameConfig, Player, PlayerId};
use std::collections::HashMap;
use thiserror::Error;

/// Server-local identifier of one transport connection.
pub type ConnectionId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("player id pool exhausted ({capacity} ids in use)")]
    Exhausted { capacity: u32 },
}

/// Bounded pool of reusable player ids
///
/// Free ids are kept sorted ascending so the lowest one is always reused
/// first. Releasing an id that is already free, or outside the pool, is a
/// no-op.
#[derive(Debug, Clone)]
pub struct IdPool {
    free: Vec<PlayerId>,
    capacity: u32,
}

impl IdPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).collect(),
            capacity,
        }
    }

    pub fn allocate(&mut self) -> Option<PlayerId> {
        if self.free.is_empty() {
            None
        } else {
            Some(self.free.remove(0))
        }
    }

    pub fn release(&mut self, id: PlayerId) {
        if id >= self.capacity {
            return;
        }
        if let Err(position) = self.free.binary_search(&id) {
            self.free.insert(position, id);
        }
    }

    /// Number of ids that can still be allocated
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// All live game state: players, xp pickups, and who is connected as whom.
pub struct World {
    config: GameConfig,
    ids: IdPool,
    /// Live players in join order
    players: Vec<Player>,
    xp_blobs: Vec<Blob>,
    connections: HashMap<ConnectionId, PlayerId>,
}

impl World {
    /// Creates an empty world and scatters the configured number of xp blobs.
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Self {
        let xp_blobs = (0..config.xp_blob_count)
            .map(|id| Blob::xp_pickup(id as u32, random_point(rng, config.map_size)))
            .collect::<Vec<_>>();

        info!(
            "World created: {}x{} map, {} xp blobs, {} player slots",
            config.map_size,
            config.map_size,
            xp_blobs.len(),
            config.id_pool_capacity
        );

        Self {
            ids: IdPool::new(config.id_pool_capacity),
            config,
            players: Vec::new(),
            xp_blobs,
            connections: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn allocate_id(&mut self) -> Result<PlayerId, RegistryError> {
        self.ids.allocate().ok_or(RegistryError::Exhausted {
            capacity: self.ids.capacity(),
        })
    }

    pub fn release_id(&mut self, id: PlayerId) {
        self.ids.release(id);
    }

    /// Adds a freshly spawned player and binds it to its connection.
    pub fn add_player(&mut self, connection: ConnectionId, player: Player) {
        debug_assert!(self.find_player(player.id).is_none());
        self.connections.insert(connection, player.id);
        self.players.push(player);
    }

    /// Removes a player and its connection binding. The id is not released.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        self.connections.retain(|_, player_id| *player_id != id);
        Some(self.players.remove(index))
    }

    pub fn find_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn find_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn all_players(&self) -> &[Player] {
        &self.players
    }

    pub fn xp_blobs(&self) -> &[Blob] {
        &self.xp_blobs
    }

    pub fn player_for_connection(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&connection).copied()
    }

    /// Connections that currently own a player. These receive broadcasts.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    /// Runs one physics step of `dt` logical units on every live player.
    pub fn advance(&mut self, dt: f32) {
        for player in &mut self.players {
            player.step(dt, &self.config);
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
