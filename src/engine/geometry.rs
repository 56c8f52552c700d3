// src/engine/geometry.rs
//
// Aspect-preserving box math. Pure functions, no image access.

/// Scale `src_w`x`src_h` into a `req_w`x`req_h` box, preserving aspect ratio.
///
/// With `within = true` the result fits inside the box (`out_w <= req_w` and
/// `out_h <= req_h`); with `within = false` it covers the box
/// (`out_w >= req_w` and `out_h >= req_h`). One side always matches the box
/// exactly; the other is rounded half-up.
///
/// Arithmetic is done in 128-bit integers, so any `u32` inputs are safe.
/// Results are never 0 and saturate at `u32::MAX`.
///
/// ```
/// use thumbgate::engine::scale_aspect;
/// assert_eq!(scale_aspect(400, 300, 200, 200, true), (200, 150));
/// assert_eq!(scale_aspect(400, 300, 200, 200, false), (267, 200));
/// ```
pub fn scale_aspect(src_w: u32, src_h: u32, req_w: u32, req_h: u32, within: bool) -> (u32, u32) {
    let (sw, sh) = (u128::from(src_w.max(1)), u128::from(src_h.max(1)));
    let (rw, rh) = (u128::from(req_w), u128::from(req_h));

    // Width is the limiting side when the box is relatively narrower than the
    // source (fit), or relatively wider (cover).
    let width_bound = (rw * sh <= rh * sw) == within;

    let (out_w, out_h) = if width_bound {
        (rw, div_round_half_up(sh * rw, sw))
    } else {
        (div_round_half_up(sw * rh, sh), rh)
    };
    (clamp_dimension(out_w), clamp_dimension(out_h))
}

fn div_round_half_up(num: u128, den: u128) -> u128 {
    (2 * num + den) / (2 * den)
}

fn clamp_dimension(value: u128) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_landscape_into_square() {
        assert_eq!(scale_aspect(400, 300, 200, 200, true), (200, 150));
    }

    #[test]
    fn test_fit_portrait_into_square() {
        assert_eq!(scale_aspect(300, 400, 200, 200, true), (150, 200));
    }

    #[test]
    fn test_cover_landscape_square() {
        // 400 * 200 / 300 = 266.67
        assert_eq!(scale_aspect(400, 300, 200, 200, false), (267, 200));
    }

    #[test]
    fn test_same_aspect_is_exact() {
        assert_eq!(scale_aspect(1600, 900, 320, 180, true), (320, 180));
        assert_eq!(scale_aspect(1600, 900, 320, 180, false), (320, 180));
    }

    #[test]
    fn test_rounds_half_up() {
        // 3 * 1 / 2 = 1.5 -> 2
        assert_eq!(scale_aspect(2, 3, 1, 10, true), (1, 2));
        // 5 * 1 / 4 = 1.25 -> 1
        assert_eq!(scale_aspect(4, 5, 1, 10, true), (1, 1));
    }

    #[test]
    fn test_never_returns_zero() {
        assert_eq!(scale_aspect(32766, 2, 1, 1, true), (1, 1));
        assert_eq!(scale_aspect(2, 32766, 1, 1, true), (1, 1));
    }

    #[test]
    fn test_crop_request_scaled_to_source() {
        // Oversized square crop request against a 400x300 source.
        assert_eq!(scale_aspect(2000, 2000, 400, 300, true), (300, 300));
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let (w, h) = scale_aspect(1, u32::MAX, u32::MAX, u32::MAX, false);
        assert_eq!(h, u32::MAX);
        assert_eq!(w, u32::MAX);
        let (w, h) = scale_aspect(u32::MAX, 1, 2, u32::MAX, false);
        assert_eq!(w, u32::MAX);
        assert_eq!(h, u32::MAX);
    }

    #[test]
    fn test_upscale_fit() {
        assert_eq!(scale_aspect(10, 5, 100, 100, true), (100, 50));
    }
}
