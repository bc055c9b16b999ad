use rand::Rng;
use shared::Vec2;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

// Random "#RRGGBB" color for a new player
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut color = String::with_capacity(7);
    color.push('#');
    for _ in 0..6 {
        color.push(HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char);
    }
    color
}

// Uniform point in [0, map_size)^2
pub fn random_point<R: Rng + ?Sized>(rng: &mut R, map_size: f32) -> Vec2 {
    Vec2::new(rng.gen::<f32>() * map_size, rng.gen::<f32>() * map_size)
}
