//! Bilinear weighting of four lattice corners.

/// Blend four corner values with fractional offsets `x`, `y` in `[0, 1]`.
///
/// `g00` is the (fi, fj) corner, `g10` the (fi+1, fj) corner, `g01` the
/// (fi, fj+1) corner and `g11` the (fi+1, fj+1) corner.
#[inline]
pub fn bilinear(x: f64, y: f64, g00: f64, g10: f64, g01: f64, g11: f64) -> f64 {
    let rx = 1.0 - x;
    let ry = 1.0 - y;
    g00 * rx * ry + g10 * x * ry + g01 * rx * y + g11 * x * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners() {
        assert_eq!(bilinear(0.0, 0.0, 1.0, 2.0, 3.0, 4.0), 1.0);
        assert_eq!(bilinear(1.0, 0.0, 1.0, 2.0, 3.0, 4.0), 2.0);
        assert_eq!(bilinear(0.0, 1.0, 1.0, 2.0, 3.0, 4.0), 3.0);
        assert_eq!(bilinear(1.0, 1.0, 1.0, 2.0, 3.0, 4.0), 4.0);
    }

    #[test]
    fn test_center() {
        assert_eq!(bilinear(0.5, 0.5, 1.0, 2.0, 3.0, 4.0), 2.5);
    }
}
