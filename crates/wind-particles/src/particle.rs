//! Canvas particle.

/// A particle in screen space. `(xt, yt)` is the pending target of the
/// current frame's stroke.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub xt: f64,
    pub yt: f64,
    pub age: f64,
}

impl Particle {
    pub fn new(age: f64) -> Self {
        Self {
            age,
            ..Self::default()
        }
    }

    pub fn at(x: f64, y: f64, age: f64) -> Self {
        Self {
            x,
            y,
            xt: x,
            yt: y,
            age,
        }
    }
}
