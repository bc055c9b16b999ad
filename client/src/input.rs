//! Pointer input turned into movement requests

use macroquad::prelude::{mouse_position, screen_height, screen_width};
use shared::config::POINTER_MAGNITUDE_SCALE;
use shared::ClientMessage;

/// Heading and magnitude for a pointer offset from the screen centre.
///
/// The magnitude is the distance scaled so that 250 px is full speed; the
/// server clamps anything larger.
pub fn pointer_to_movement(dx: f32, dy: f32) -> (f32, f32) {
    let direction = dy.atan2(dx);
    let magnitude = (dx * dx + dy * dy).sqrt() / POINTER_MAGNITUDE_SCALE;
    (direction, magnitude)
}

/// Tracks the pointer and produces the `move` message for each snapshot
#[derive(Debug, Default)]
pub struct InputManager {
    // None until the pointer has moved at least once
    movement: Option<(f32, f32)>,
    last_pointer: Option<(f32, f32)>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pointer position relative to a screen of the given size.
    pub fn pointer_moved(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let dx = x - width / 2.0;
        let dy = y - height / 2.0;
        self.movement = Some(pointer_to_movement(dx, dy));
    }

    /// Samples the macroquad pointer once per frame.
    pub fn update(&mut self) {
        let pointer = mouse_position();
        let moved = self.last_pointer.map_or(false, |last| last != pointer);
        self.last_pointer = Some(pointer);

        if moved || self.movement.is_some() {
            self.pointer_moved(pointer.0, pointer.1, screen_width(), screen_height());
        }
    }

    /// The message to send in response to a tick snapshot
    pub fn move_message(&self) -> ClientMessage {
        match self.movement {
            Some((direction, magnitude)) => ClientMessage::Move {
                direction: Some(direction),
                magnitude,
            },
            None => ClientMessage::Move {
                direction: None,
                magnitude: 0.0,
            },
        }
    }
}
