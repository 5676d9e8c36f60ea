//! The distance-to-level selection law.
//!
//! `level_f = LOD_LOG2_SCALE * ln(C / d^2) + resolution_adjustment`,
//! clamped to `[0, RUNTIME_LOD_LEVELS - 1]`. Closer blocks and higher
//! screen resolutions both push the selected level up.

use lodcloud_core::constants::{
    LOD_DISTANCE_CONSTANT, LOD_LOG2_SCALE, LOD_REFERENCE_PIXELS, RUNTIME_LOD_LEVELS,
};

/// Highest level the runtime ever selects (levels `1..=MAX_LEVEL`
/// carry a per-block payload; level `0` means "show the resident
/// aggregate and hide this block's overlay").
pub const MAX_LEVEL: u32 = RUNTIME_LOD_LEVELS - 1;

/// Unclamped level for a block `distance_sq` away from the viewer, at
/// the given screen pixel count.
///
/// `distance_sq <= 0.0` is treated as "at the viewer" and returns
/// `f64::INFINITY`, which clamps to [`MAX_LEVEL`] in [`select_level`].
#[must_use]
pub fn level_f(distance_sq: f64, screen_pixels: f64) -> f64 {
    let resolution_adjustment = LOD_LOG2_SCALE * (screen_pixels / LOD_REFERENCE_PIXELS).ln();
    if distance_sq <= 0.0 {
        return f64::INFINITY;
    }
    LOD_LOG2_SCALE * (LOD_DISTANCE_CONSTANT / distance_sq).ln() + resolution_adjustment
}

/// The clamped integer level a block at `distance_sq` should be
/// streamed at, given the current screen pixel count.
#[must_use]
pub fn select_level(distance_sq: f64, screen_pixels: f64) -> u32 {
    let level = level_f(distance_sq, screen_pixels);
    if level.is_sign_negative() || level.is_nan() {
        return 0;
    }
    (level.floor() as u32).min(MAX_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_PIXELS: f64 = LOD_REFERENCE_PIXELS;

    #[test]
    fn closer_never_selects_a_lower_level() {
        let distances = [1.0, 4.0, 9.0, 25.0, 100.0, 1_000.0, 100_000.0];
        for window in distances.windows(2) {
            let (closer, farther) = (window[0], window[1]);
            assert!(
                level_f(closer, REFERENCE_PIXELS) >= level_f(farther, REFERENCE_PIXELS),
                "level_f({closer}) should be >= level_f({farther})"
            );
        }
    }

    #[test]
    fn close_block_clamps_to_max_level() {
        // S6: viewer at distance 5 m from every block centre selects
        // level 6 (MAX_LEVEL) for every block.
        assert_eq!(select_level(5.0 * 5.0, REFERENCE_PIXELS), MAX_LEVEL);
    }

    #[test]
    fn far_block_clamps_to_zero() {
        // S6: at distance 10_000 m, every block selects level 0.
        assert_eq!(select_level(10_000.0 * 10_000.0, REFERENCE_PIXELS), 0);
    }

    #[test]
    fn higher_resolution_selects_finer_levels_at_the_same_distance() {
        let low_res = select_level(900.0, REFERENCE_PIXELS);
        let high_res = select_level(900.0, REFERENCE_PIXELS * 4.0);
        assert!(high_res >= low_res);
    }

    #[test]
    fn zero_distance_clamps_to_max_level() {
        assert_eq!(select_level(0.0, REFERENCE_PIXELS), MAX_LEVEL);
    }
}
