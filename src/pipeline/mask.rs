//! Mask construction from configured watermark regions.
//!
//! Masks are pure functions of frame geometry and configuration: no randomness
//! and no dependency on frame content, so the same inputs always rasterize to
//! the same mask sequence.

use crate::media::types::{Mask, WatermarkRegion};

/// Build one occlusion mask per frame for the given region profile.
///
/// Every region grows by `expand` pixels on all sides (saturating at zero) and
/// clamps to `[0, width-1] x [0, height-1]` inclusive. Overlapping regions
/// union. Regions lying entirely outside the frame contribute nothing.
pub fn build_masks(
    width: u32,
    height: u32,
    regions: &[WatermarkRegion],
    expand: u32,
    frame_count: usize,
) -> Vec<Mask> {
    let mut template = Mask::new_blank(width, height);

    for region in regions {
        let x0 = region.xmin.saturating_sub(expand);
        let y0 = region.ymin.saturating_sub(expand);
        if x0 >= width || y0 >= height {
            continue;
        }
        let x1 = region.xmax.saturating_add(expand).min(width - 1);
        let y1 = region.ymax.saturating_add(expand).min(height - 1);

        template.fill_rect(x0, y0, x1, y1);
    }

    vec![template; frame_count]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_count(mask: &Mask) -> usize {
        let mut count = 0;
        for y in 0..mask.height() {
            for x in 0..mask.width() {
                if mask.is_set(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn one_mask_per_frame() {
        let regions = [WatermarkRegion::new(10, 10, 20, 20)];
        let masks = build_masks(64, 64, &regions, 2, 7);
        assert_eq!(masks.len(), 7);
        assert_eq!(masks[0], masks[6]);
    }

    #[test]
    fn mask_is_margin_superset_of_region() {
        let region = WatermarkRegion::new(10, 10, 20, 20);
        let masks = build_masks(64, 64, &[region], 3, 1);
        let mask = &masks[0];

        // The region itself and the expanded border are set
        assert!(mask.is_set(10, 10));
        assert!(mask.is_set(20, 20));
        assert!(mask.is_set(7, 7));
        assert!(mask.is_set(23, 23));

        // One past the margin is clear
        assert!(!mask.is_set(6, 10));
        assert!(!mask.is_set(24, 20));
    }

    #[test]
    fn expansion_clamps_to_frame_bounds() {
        // Region hugging the bottom-right corner; expansion must not escape
        let region = WatermarkRegion::new(60, 60, 63, 63);
        let masks = build_masks(64, 64, &[region], 10, 1);
        let mask = &masks[0];

        assert!(mask.is_set(63, 63));
        assert!(mask.is_set(50, 50));
        assert_eq!(mask.width(), 64);
        assert_eq!(mask.height(), 64);
        // (64 - 50)^2 pixels: clamped at the frame edge
        assert_eq!(set_count(mask), 14 * 14);
    }

    #[test]
    fn expansion_saturates_at_origin() {
        let region = WatermarkRegion::new(2, 2, 5, 5);
        let masks = build_masks(32, 32, &[region], 10, 1);
        assert!(masks[0].is_set(0, 0));
        assert!(masks[0].is_set(15, 15));
        assert!(!masks[0].is_set(16, 16));
    }

    #[test]
    fn overlapping_regions_union() {
        let regions = [
            WatermarkRegion::new(0, 0, 10, 10),
            WatermarkRegion::new(5, 5, 15, 15),
        ];
        let masks = build_masks(32, 32, &regions, 0, 1);
        let mask = &masks[0];

        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(15, 15));
        assert!(mask.is_set(7, 7));
        // Union area: 11*11 + 11*11 - 6*6 overlap
        assert_eq!(set_count(mask), 121 + 121 - 36);
    }

    #[test]
    fn region_outside_frame_is_skipped() {
        let region = WatermarkRegion::new(100, 100, 120, 120);
        let masks = build_masks(64, 64, &[region], 5, 1);
        assert!(masks[0].is_blank());
    }

    #[test]
    fn no_regions_means_blank_masks() {
        let masks = build_masks(64, 64, &[], 20, 3);
        assert_eq!(masks.len(), 3);
        assert!(masks.iter().all(Mask::is_blank));
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let regions = [WatermarkRegion::new(8, 8, 24, 16)];
        let first = build_masks(48, 48, &regions, 4, 2);
        let second = build_masks(48, 48, &regions, 4, 2);
        assert_eq!(first, second);
    }
}
