//! Render quality selection.
//!
//! Picks the PDF render scale from the page's physical size, its content
//! class (vector drawing vs scanned sheet) and the source byte size. The
//! policy is an ordered table of predicate/tier rows evaluated top to
//! bottom; the first matching row wins. A pixel-area ceiling then caps the
//! chosen scale so a wall-sized sheet cannot render into an unbounded
//! raster.

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Hard ceiling on the projected raster area, in pixels.
pub const MAX_PIXEL_AREA: u64 = 300_000_000;

/// Byte size at or above which a vector PDF is considered detail-heavy.
pub const LARGE_VECTOR_BYTES: u64 = 512 * 1024;

/// Render quality derived once per job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityProfile {
    /// Multiplier applied to the page's point dimensions when rasterizing
    pub scale_factor: f32,

    /// Resulting render density (`scale_factor` × 72, after any ceiling cut)
    pub effective_dpi: u32,

    /// The pixel-area ceiling this profile was clamped against
    pub max_pixel_area: u64,
}

/// Source page traits the tier predicates see.
#[derive(Debug, Clone, Copy)]
struct PageTraits {
    long_side_in: f64,
    is_vector: bool,
    byte_size: u64,
}

/// One row of the quality policy: a predicate and the tier it selects.
struct TierRule {
    name: &'static str,
    matches: fn(&PageTraits) -> bool,
    scale_factor: f32,
}

/// Ordered policy table, first match wins. The final row matches anything,
/// so selection always succeeds.
const TIER_TABLE: &[TierRule] = &[
    TierRule {
        name: "highest",
        matches: |p| p.long_side_in >= 36.0,
        scale_factor: 8.0,
    },
    TierRule {
        name: "high",
        matches: |p| p.long_side_in >= 24.0,
        scale_factor: 6.0,
    },
    TierRule {
        name: "high",
        matches: |p| p.long_side_in >= 17.0 && p.is_vector && p.byte_size >= LARGE_VECTOR_BYTES,
        scale_factor: 6.0,
    },
    TierRule {
        name: "reduced",
        matches: |p| p.long_side_in >= 17.0,
        scale_factor: 3.0,
    },
    TierRule {
        name: "elevated",
        matches: |p| p.long_side_in >= 11.0 && p.is_vector && p.byte_size >= LARGE_VECTOR_BYTES,
        scale_factor: 5.0,
    },
    TierRule {
        name: "nominal",
        matches: |p| p.long_side_in >= 11.0 && p.is_vector,
        scale_factor: 4.0,
    },
    TierRule {
        name: "reduced",
        matches: |p| p.long_side_in >= 11.0,
        scale_factor: 3.0,
    },
    TierRule {
        name: "lowest",
        matches: |_| true,
        scale_factor: 2.0,
    },
];

/// Select the render quality for a page.
///
/// Pure and infallible: non-finite or negative inputs are clamped to zero
/// and fall through to the lowest tier. After tier selection the scale is
/// reduced, if needed, so the projected pixel area stays at or below
/// [`MAX_PIXEL_AREA`].
pub fn select(
    page_width_in: f64,
    page_height_in: f64,
    is_vector_content: bool,
    source_byte_size: u64,
) -> QualityProfile {
    let width_in = sanitize(page_width_in);
    let height_in = sanitize(page_height_in);

    let traits = PageTraits {
        long_side_in: width_in.max(height_in),
        is_vector: is_vector_content,
        byte_size: source_byte_size,
    };

    // The last row is a catch-all, so find() cannot come up empty.
    let rule = TIER_TABLE
        .iter()
        .find(|rule| (rule.matches)(&traits))
        .unwrap_or(&TIER_TABLE[TIER_TABLE.len() - 1]);

    let mut scale = rule.scale_factor as f64;

    let area_at = |scale: f64| {
        let w = width_in * POINTS_PER_INCH * scale;
        let h = height_in * POINTS_PER_INCH * scale;
        w * h
    };

    let area = area_at(scale);
    if area > MAX_PIXEL_AREA as f64 {
        scale *= (MAX_PIXEL_AREA as f64 / area).sqrt();
    }

    tracing::debug!(
        tier = rule.name,
        scale_factor = scale,
        long_side_in = traits.long_side_in,
        is_vector = traits.is_vector,
        byte_size = traits.byte_size,
        "selected render quality"
    );

    QualityProfile {
        scale_factor: scale as f32,
        effective_dpi: (scale * POINTS_PER_INCH).round() as u32,
        max_pixel_area: MAX_PIXEL_AREA,
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_sized_sheet_gets_highest_tier() {
        // 40x20in at scale 8 projects ~2.7e8 px, just under the ceiling
        let profile = select(40.0, 20.0, true, 2_000_000);
        assert_eq!(profile.scale_factor, 8.0);
        assert_eq!(profile.effective_dpi, 576);
    }

    #[test]
    fn test_arch_d_gets_high_tier() {
        // 24x36 landscape: long side 36 hits the highest tier, a 24x30
        // stays in the high tier
        let profile = select(30.0, 24.0, false, 100_000);
        assert_eq!(profile.scale_factor, 6.0);
        assert_eq!(profile.effective_dpi, 432);
    }

    #[test]
    fn test_tabloid_plus_depends_on_content() {
        // 17-24in vector with a heavy byte size keeps the high tier
        let vector = select(22.0, 17.0, true, 1_500_000);
        assert_eq!(vector.scale_factor, 6.0);

        // Scanned sheets of the same size drop to the reduced tier
        let scanned = select(22.0, 17.0, false, 1_500_000);
        assert_eq!(scanned.scale_factor, 3.0);

        // Vector but tiny byte size also drops
        let sparse = select(22.0, 17.0, true, 40_000);
        assert_eq!(sparse.scale_factor, 3.0);
    }

    #[test]
    fn test_letter_vector_700kb_is_elevated() {
        // Letter-class vector drawing with a substantial byte size gets the
        // elevated tier, not the nominal one
        let profile = select(8.5, 11.0, true, 700 * 1024);
        assert_eq!(profile.scale_factor, 5.0);
        assert_eq!(profile.effective_dpi, 360);
    }

    #[test]
    fn test_letter_small_vector_is_nominal() {
        let profile = select(8.5, 11.0, true, 120_000);
        assert_eq!(profile.scale_factor, 4.0);
        assert_eq!(profile.effective_dpi, 288);
    }

    #[test]
    fn test_letter_scanned_is_reduced() {
        let profile = select(8.5, 11.0, false, 3_000_000);
        assert_eq!(profile.scale_factor, 3.0);
    }

    #[test]
    fn test_small_page_is_lowest_tier() {
        let profile = select(6.0, 4.0, true, 5_000_000);
        assert_eq!(profile.scale_factor, 2.0);
        assert_eq!(profile.effective_dpi, 144);
    }

    #[test]
    fn test_pixel_ceiling_reduces_scale() {
        // 60x48in at scale 8 projects far beyond the ceiling
        let profile = select(60.0, 48.0, true, 10_000_000);
        assert!(profile.scale_factor < 8.0);

        let w = 60.0 * POINTS_PER_INCH * profile.scale_factor as f64;
        let h = 48.0 * POINTS_PER_INCH * profile.scale_factor as f64;
        // Allow rounding slack from the f32 narrowing
        assert!(w * h <= MAX_PIXEL_AREA as f64 * 1.001);
        assert_eq!(
            profile.effective_dpi,
            (profile.scale_factor as f64 * POINTS_PER_INCH).round() as u32
        );
    }

    #[test]
    fn test_degenerate_inputs_are_clamped() {
        let profile = select(f64::NAN, -3.0, false, 0);
        assert_eq!(profile.scale_factor, 2.0);

        let profile = select(f64::INFINITY, 10.0, false, 0);
        assert_eq!(profile.scale_factor, 2.0);
    }

    #[test]
    fn test_first_match_wins_over_later_rows() {
        // A 40in vector heavyweight matches both the highest and the
        // 17in-vector rows; the earlier row must win
        let profile = select(40.0, 10.0, true, 5_000_000);
        assert_eq!(profile.scale_factor, 8.0);
    }
}
