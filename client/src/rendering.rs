use crate::game::ClientWorld;
use macroquad::prelude::*;
use shared::config::MAP_SIZE;

/// Spacing of the background grid in world units
pub const GRID_SPACING: f32 = 32.0;

const BACKGROUND: Color = Color::new(0.96, 0.96, 0.96, 1.0);
const GRID_COLOR: Color = Color::new(0.85, 0.85, 0.85, 1.0);
const XP_BLOB_COLOR: Color = RED;
const FALLBACK_PLAYER_COLOR: Color = GRAY;

/// Parses a `#RRGGBB` color string.
pub fn parse_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::from_rgba(channel(0)?, channel(2)?, channel(4)?, 255))
}

/// Screen offsets of the grid lines along one axis.
///
/// `origin` is the world coordinate at the screen edge; lines sit on world
/// multiples of `spacing`.
pub fn grid_lines(origin: f32, extent: f32, spacing: f32) -> impl Iterator<Item = f32> {
    let first = (-origin).rem_euclid(spacing);
    let count = ((extent - first) / spacing).floor().max(-1.0) as i64 + 1;
    (0..count).map(move |i| first + i as f32 * spacing)
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn render(&mut self, world: &ClientWorld, connected: bool) {
        self.width = screen_width();
        self.height = screen_height();

        clear_background(BACKGROUND);

        let focus = world
            .camera_focus()
            .unwrap_or(shared::Vec2::new(MAP_SIZE / 2.0, MAP_SIZE / 2.0));
        let origin_x = focus.x - self.width / 2.0;
        let origin_y = focus.y - self.height / 2.0;

        self.draw_grid(origin_x, origin_y);

        for blob in world.xp_blobs() {
            let x = blob.rendered.x - origin_x;
            let y = blob.rendered.y - origin_y;
            if self.is_visible(x, y, blob.radius) {
                draw_circle(x, y, blob.radius, XP_BLOB_COLOR);
            }
        }

        for player in world.players() {
            let color = parse_color(&player.color).unwrap_or(FALLBACK_PLAYER_COLOR);
            for blob in player.blobs.values() {
                let x = blob.rendered.x - origin_x;
                let y = blob.rendered.y - origin_y;
                if !self.is_visible(x, y, blob.radius) {
                    continue;
                }
                draw_circle(x, y, blob.radius, color);
                draw_circle_lines(x, y, blob.radius, 2.0, DARKGRAY);
            }

            if let Some(first) = player.blobs.values().next() {
                let size = measure_text(&player.name, None, 20, 1.0);
                draw_text(
                    &player.name,
                    first.rendered.x - origin_x - size.width / 2.0,
                    first.rendered.y - origin_y + size.height / 2.0,
                    20.0,
                    WHITE,
                );
            }
        }

        self.draw_ui(world, connected);
    }

    fn is_visible(&self, x: f32, y: f32, radius: f32) -> bool {
        x + radius >= 0.0 && y + radius >= 0.0 && x - radius <= self.width && y - radius <= self.height
    }

    fn draw_grid(&self, origin_x: f32, origin_y: f32) {
        for x in grid_lines(origin_x, self.width, GRID_SPACING) {
            draw_line(x, 0.0, x, self.height, 1.0, GRID_COLOR);
        }
        for y in grid_lines(origin_y, self.height, GRID_SPACING) {
            draw_line(0.0, y, self.width, y, 1.0, GRID_COLOR);
        }
    }

    fn draw_ui(&self, world: &ClientWorld, connected: bool) {
        let status_color = if connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, status_color);
        draw_text("CON", 20.0, 18.0, 12.0, BLACK);

        let player_text = format!("{} players", world.player_count());
        draw_text(&player_text, 10.0, 34.0, 12.0, BLACK);
    }
}
