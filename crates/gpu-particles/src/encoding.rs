//! Particle state texel encoding.
//!
//! One RGBA8 texel per particle. Each axis is split into a high byte
//! (`floor(p·255)`) and a low byte (`round(fract(p·255)·255)`): R/G hold
//! the low bytes of x/y, B/A the high bytes. In normalized channels the
//! shaders decode `pos = lo / 255 + hi`, which recovers the position to
//! within `1 / 255²`.

use rand::Rng;

/// Side of the square state texture holding `count` particles.
pub fn particle_resolution(count: usize) -> u32 {
    (count as f64).sqrt().ceil().max(1.0) as u32
}

/// Encode a position in `[0, 1)²`; values outside wrap.
pub fn encode_position(pos: [f32; 2]) -> [u8; 4] {
    let split = |p: f32| {
        let p = p.rem_euclid(1.0) * 255.0;
        let hi = p.floor();
        let lo = ((p - hi) * 255.0).round();
        (lo as u8, hi as u8)
    };
    let (x_lo, x_hi) = split(pos[0]);
    let (y_lo, y_hi) = split(pos[1]);
    [x_lo, y_lo, x_hi, y_hi]
}

pub fn decode_position(texel: [u8; 4]) -> [f32; 2] {
    let axis = |lo: u8, hi: u8| lo as f32 / (255.0 * 255.0) + hi as f32 / 255.0;
    [axis(texel[0], texel[2]), axis(texel[1], texel[3])]
}

/// Initial state: every byte uniformly random in `0..255`.
pub fn random_state(resolution: u32, rng: &mut impl Rng) -> Vec<u8> {
    let len = (resolution as usize).pow(2) * 4;
    (0..len).map(|_| rng.gen_range(0..255u8)).collect()
}
