//! Render-side smoothing between authoritative position samples

use shared::Vec2;
use std::time::{Duration, Instant};

/// Time a blob takes to glide from its previous to its confirmed position.
pub const INTERPOLATION_WINDOW: Duration = Duration::from_millis(67);

/// Interpolation fraction for a sample received at `last_update`.
///
/// Grows linearly over [`INTERPOLATION_WINDOW`] and holds at 1 afterwards;
/// positions are never extrapolated.
pub fn interpolation_factor(last_update: Instant, now: Instant) -> f32 {
    let elapsed = now.saturating_duration_since(last_update);
    (elapsed.as_secs_f32() / INTERPOLATION_WINDOW.as_secs_f32()).clamp(0.0, 1.0)
}

/// Client-side shadow of one blob's server position
#[derive(Debug, Clone, PartialEq)]
pub struct BlobShadow {
    pub confirmed: Vec2,
    pub previous: Vec2,
    pub last_update: Option<Instant>,
    pub rendered: Vec2,
    pub radius: f32,
}

impl BlobShadow {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            confirmed: position,
            previous: position,
            last_update: None,
            rendered: position,
            radius,
        }
    }

    /// Records a new authoritative sample received at `at`.
    pub fn confirm(&mut self, position: Vec2, radius: f32, at: Instant) {
        self.previous = self.confirmed;
        self.confirmed = position;
        self.radius = radius;
        self.last_update = Some(at);
    }

    /// Updates and returns the position to draw this frame.
    pub fn sample(&mut self, now: Instant) -> Vec2 {
        self.rendered = match self.last_update {
            Some(last_update) => {
                let t = interpolation_factor(last_update, now);
                self.previous.lerp(&self.confirmed, t)
            }
            None => self.confirmed,
        };
        self.rendered
    }
}
