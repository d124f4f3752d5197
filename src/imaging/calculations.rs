//! Pure calculation functions for image dimensions and encoder settings.
//!
//! All functions here are pure and testable without any I/O or images.
//! Ratios are compared by cross-multiplying in `u64` so results never drift
//! by a pixel through floating-point rounding.

/// Calculate the proportional fit of `source` inside a `max` bounding box.
///
/// Returns `None` when no resize is needed: the image already fits and
/// `allow_enlarge` is off, or the scaled result would equal the source.
/// New dimensions are truncated, never rounded up, so the result can never
/// exceed the box.
///
/// # Examples
/// ```
/// # use rasterkit::imaging::calculations::calculate_fit_dimensions;
/// // 2000x1000 into an 800x800 box is limited by width → 800x400
/// assert_eq!(calculate_fit_dimensions((2000, 1000), (800, 800), false), Some((800, 400)));
///
/// // Already fits and enlarging is off → untouched
/// assert_eq!(calculate_fit_dimensions((300, 200), (800, 800), false), None);
/// ```
pub fn calculate_fit_dimensions(
    source: (u32, u32),
    max: (u32, u32),
    allow_enlarge: bool,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (max_w, max_h) = max;

    let exceeds = src_w > max_w || src_h > max_h;
    let smaller = src_w < max_w || src_h < max_h;
    if !exceeds && !(allow_enlarge && smaller) {
        return None;
    }

    let (w, h) = (src_w as u64, src_h as u64);
    let (mw, mh) = (max_w as u64, max_h as u64);

    // ratio = min(mw / w, mh / h)
    let fitted = if mw * h <= mh * w {
        // Width is the limiting edge
        (mw, h * mw / w)
    } else {
        // Height is the limiting edge
        (w * mh / h, mh)
    };
    let fitted = (fitted.0 as u32, fitted.1 as u32);

    (fitted != source).then_some(fitted)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// One dimension matches the target exactly, the other overshoots (or
/// matches). Truncation is safe here: the overshooting edge is strictly
/// larger than the target in real numbers, so its floor is still at least
/// the target. Small sources are scaled up.
///
/// Returns `None` when the overshooting edge does not fit in a `u32`.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0 as u64, target.1 as u64);

    if src_w * tgt_h > tgt_w * src_h {
        // Source is wider: height will match, width will exceed
        let width = u32::try_from(src_w * tgt_h / src_h).ok()?;
        Some((width, target.1))
    } else {
        // Source is taller (or same aspect): width will match, height will exceed
        let height = u32::try_from(src_h * tgt_w / src_w).ok()?;
        Some((target.0, height))
    }
}

/// Offset that centers a `target`-sized window inside `resized`.
pub fn center_offset(resized: u32, target: u32) -> u32 {
    resized.saturating_sub(target) / 2
}

/// Map a 0–100 quality onto PNG's 0–9 compression effort.
///
/// `level = ceil((100 - quality) * 9 / 100)`, so higher quality means less
/// compression work. Out-of-range input yields level 0.
pub fn png_compression_level(quality: i32) -> u8 {
    if !(0..=100).contains(&quality) {
        return 0;
    }
    (((100 - quality) * 9 + 99) / 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_fit_dimensions tests
    // =========================================================================

    #[test]
    fn fit_landscape_limited_by_width() {
        assert_eq!(
            calculate_fit_dimensions((2000, 1000), (800, 800), false),
            Some((800, 400))
        );
    }

    #[test]
    fn fit_portrait_limited_by_height() {
        assert_eq!(
            calculate_fit_dimensions((1000, 3000), (800, 600), false),
            Some((200, 600))
        );
    }

    #[test]
    fn fit_truncates_instead_of_rounding() {
        // 999 * 500 / 1000 = 499.5 → 499
        assert_eq!(
            calculate_fit_dimensions((1000, 999), (500, 500), false),
            Some((500, 499))
        );
    }

    #[test]
    fn fit_one_edge_over_box() {
        // Only height exceeds; ratio = 400/500
        assert_eq!(
            calculate_fit_dimensions((300, 500), (800, 400), false),
            Some((240, 400))
        );
    }

    #[test]
    fn fit_no_op_when_inside_box() {
        assert_eq!(calculate_fit_dimensions((300, 200), (800, 800), false), None);
        assert_eq!(calculate_fit_dimensions((800, 800), (800, 800), false), None);
    }

    #[test]
    fn fit_enlarges_when_allowed() {
        assert_eq!(
            calculate_fit_dimensions((300, 200), (900, 900), true),
            Some((900, 600))
        );
    }

    #[test]
    fn fit_enlarge_with_edge_on_box_is_no_op() {
        // ratio = min(2, 1) = 1 → same size
        assert_eq!(calculate_fit_dimensions((400, 800), (800, 800), true), None);
    }

    // =========================================================================
    // calculate_fill_dimensions tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500; height matches, width = 500 * 4/3 = 666.67 → 666
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), Some((666, 500)));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), Some((500, 666)));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 300)), Some((400, 300)));
    }

    #[test]
    fn fill_upscales_small_source() {
        // 100x100 (1:1) → 50x200 (1:4): source is wider, height matches 200
        assert_eq!(calculate_fill_dimensions((100, 100), (50, 200)), Some((200, 200)));
    }

    #[test]
    fn fill_always_covers_target() {
        for source in [(1, 1), (7, 3), (3, 7), (1920, 1080), (33, 1000)] {
            for target in [(1, 1), (5, 9), (9, 5), (400, 500), (1000, 3)] {
                let (w, h) = calculate_fill_dimensions(source, target).unwrap();
                assert!(
                    w >= target.0 && h >= target.1,
                    "{source:?} → {target:?} gave {w}x{h}"
                );
            }
        }
    }

    #[test]
    fn fill_overflowing_edge_is_none() {
        // A 1-pixel-tall strip filled to a tall target needs a width beyond u32.
        assert_eq!(calculate_fill_dimensions((u32::MAX, 1), (1, 2)), None);
        assert_eq!(calculate_fill_dimensions((1, u32::MAX), (2, 1)), None);
        assert_eq!(
            calculate_fill_dimensions((u32::MAX, 1), (1, 1)),
            Some((u32::MAX, 1))
        );
    }

    // =========================================================================
    // center_offset / png_compression_level tests
    // =========================================================================

    #[test]
    fn center_offset_truncates() {
        assert_eq!(center_offset(666, 400), 133);
        assert_eq!(center_offset(401, 400), 0);
        assert_eq!(center_offset(400, 400), 0);
    }

    #[test]
    fn png_level_boundaries() {
        assert_eq!(png_compression_level(0), 9);
        assert_eq!(png_compression_level(50), 5);
        assert_eq!(png_compression_level(100), 0);
        assert_eq!(png_compression_level(99), 1);
    }

    #[test]
    fn png_level_out_of_range_is_zero() {
        assert_eq!(png_compression_level(-1), 0);
        assert_eq!(png_compression_level(101), 0);
    }
}
