//! Weighted variant selection.

use rand::Rng;

use crate::campaign::{AbTestConfig, CONTROL_VARIANT};

/// Picks a variant for a draw in `[1, 100]`.
///
/// Walks the allocation (control first) accumulating percentages and
/// returns the first variant whose cumulative share reaches the draw.
/// Draws beyond the cumulative total fall through to control.
pub fn pick_variant(ab_test: &AbTestConfig, draw: u8) -> String {
    if !ab_test.is_active() {
        return CONTROL_VARIANT.to_string();
    }

    let mut cumulative: u32 = 0;
    for (variant_id, percent) in ab_test.allocations() {
        cumulative += percent as u32;
        if cumulative >= draw as u32 {
            return variant_id.to_string();
        }
    }

    CONTROL_VARIANT.to_string()
}

/// Draws a uniform integer in `[1, 100]`.
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=100)
}

/// Picks a variant with a fresh random draw.
pub fn assign_random<R: Rng + ?Sized>(ab_test: &AbTestConfig, rng: &mut R) -> String {
    pick_variant(ab_test, draw(rng))
}
