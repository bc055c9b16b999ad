//! Blob and player model plus the pure movement step the server runs every tick.

use crate::config::{GameConfig, LOGICAL_STEP, PLAYER_BLOB_BASE_RADIUS, XP_BLOB_BASE_RADIUS};

pub type PlayerId = u32;
pub type BlobId = u32;

/// A vector in 2D world space. Positive y points down the map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians).
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Clamps each axis independently to `[min, max]`.
    pub fn clamp_axes(&self, min: f32, max: f32) -> Vec2 {
        Vec2 {
            x: self.x.clamp(min, max),
            y: self.y.clamp(min, max),
        }
    }

    /// Linear interpolation from `self` toward `other`.
    pub fn lerp(&self, other: &Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Radius of a blob: a fixed base by kind plus growth from its xp.
pub fn blob_radius(is_player_blob: bool, xp: f32) -> f32 {
    let base = if is_player_blob {
        PLAYER_BLOB_BASE_RADIUS
    } else {
        XP_BLOB_BASE_RADIUS
    };
    base + xp.sqrt() * 2.0
}

/// A circular body, either part of a player's avatar or a free xp pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub id: BlobId,
    pub position: Vec2,
    /// Position relative to the owning player's anchor. Zero for pickups.
    pub offset: Vec2,
    /// Set once at creation; nothing consumes or grows it yet.
    pub xp: f32,
    pub owned: bool,
}

impl Blob {
    /// A player-owned blob sitting at `offset` from its player's anchor.
    pub fn owned(id: BlobId, anchor: Vec2, offset: Vec2, xp: f32) -> Self {
        Self {
            id,
            position: anchor.add(&offset),
            offset,
            xp,
            owned: true,
        }
    }

    /// A free pickup. Pickups never move and carry no xp in this version.
    pub fn xp_pickup(id: BlobId, position: Vec2) -> Self {
        Self {
            id,
            position,
            offset: Vec2::ZERO,
            xp: 0.0,
            owned: false,
        }
    }

    pub fn radius(&self) -> f32 {
        blob_radius(self.owned, self.xp)
    }
}

/// A live avatar: an anchor with velocity plus the blobs it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Displacement multiplier, the last magnitude sent by the client.
    pub speed: f32,
    /// Heading in radians; `None` lets the velocity decay.
    pub move_dir: Option<f32>,
    pub blobs: Vec<Blob>,
}

impl Player {
    /// Creates a player at `position` with a single starter blob on the anchor.
    pub fn new(
        id: PlayerId,
        name: String,
        color: String,
        position: Vec2,
        starter_xp: f32,
    ) -> Self {
        Self {
            id,
            name,
            color,
            position,
            velocity: Vec2::ZERO,
            speed: 0.0,
            move_dir: None,
            blobs: vec![Blob::owned(0, position, Vec2::ZERO, starter_xp)],
        }
    }

    /// Applies a client movement request. The magnitude is clamped to `[0, 1]`.
    pub fn set_movement(&mut self, direction: Option<f32>, magnitude: f32) {
        self.move_dir = direction;
        self.speed = magnitude.clamp(0.0, 1.0);
    }

    /// Advances the player by `dt` logical time units.
    ///
    /// Velocity accelerates toward the held direction or decays toward zero,
    /// is clamped per axis to the configured maximum, and moves the anchor by
    /// `velocity * speed`. Blobs are then placed at their offsets from the
    /// new anchor. Anchor and blobs are each clamped to the map.
    pub fn step(&mut self, dt: f32, config: &GameConfig) {
        match self.move_dir {
            Some(direction) => {
                let thrust = Vec2::from_angle(direction).scale(config.acceleration * dt);
                self.velocity = self.velocity.add(&thrust);
            }
            None => {
                let decay = config.deceleration.powf(dt / LOGICAL_STEP);
                self.velocity = self.velocity.scale(decay);
            }
        }

        self.velocity = self
            .velocity
            .clamp_axes(-config.max_velocity, config.max_velocity);

        self.position = self
            .position
            .add(&self.velocity.scale(self.speed))
            .clamp_axes(0.0, config.map_size);

        for blob in &mut self.blobs {
            blob.position = self
                .position
                .add(&blob.offset)
                .clamp_axes(0.0, config.map_size);
        }
    }
}
