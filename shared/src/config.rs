//! Simulation constants and the process-wide game configuration.
//!
//! Every value here is fixed at process start. The server binary layers its
//! command line flags over [`GameConfig::default`]; nothing is reconfigured
//! while the world is running.

use std::time::Duration;

/// Side length of the square arena, in world units.
pub const MAP_SIZE: f32 = 8192.0;

/// Velocity gained per logical time unit while a direction is held.
pub const PLAYER_ACCELERATION: f32 = 1.006;

/// Maximum absolute velocity on each axis.
pub const MAX_VELOCITY: f32 = 67.0;

/// The dt, in logical units, that one nominal tick represents.
pub const LOGICAL_STEP: f32 = 33.0;

/// Nominal server tick period in milliseconds.
pub const TICK_PERIOD_MS: u64 = 67;

/// Number of player ids available; also the player capacity of a world.
pub const ID_POOL_CAPACITY: u32 = 60;

/// Number of free xp blobs scattered over the map at startup.
pub const XP_BLOB_COUNT: usize = 6767;

/// Base radius of a blob owned by a player.
pub const PLAYER_BLOB_BASE_RADIUS: f32 = 35.0;

/// Base radius of a free xp blob.
pub const XP_BLOB_BASE_RADIUS: f32 = 5.0;

/// Starter blobs roll their xp in `[0, STARTER_XP_MAX)`.
pub const STARTER_XP_MAX: f32 = 10.0;

/// Pointer distance (in screen pixels) that maps to a move magnitude of 1.
pub const POINTER_MAGNITUDE_SCALE: f32 = 250.0;

/// Per-step velocity decay applied while no direction is held.
pub fn player_deceleration() -> f32 {
    0.993_f32.powi(200)
}

/// Simulation parameters shared by the server world and the physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub map_size: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub max_velocity: f32,
    pub tick_period: Duration,
    pub id_pool_capacity: u32,
    pub xp_blob_count: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_size: MAP_SIZE,
            acceleration: PLAYER_ACCELERATION,
            deceleration: player_deceleration(),
            max_velocity: MAX_VELOCITY,
            tick_period: Duration::from_millis(TICK_PERIOD_MS),
            id_pool_capacity: ID_POOL_CAPACITY,
            xp_blob_count: XP_BLOB_COUNT,
        }
    }
}
