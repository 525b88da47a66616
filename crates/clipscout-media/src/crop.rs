//! Centered crop rectangles per target aspect ratio.
//!
//! Pure geometry: no detection is involved, the crop is always centered.

use tracing::debug;

use clipscout_models::{AspectRatio, CropRegion, CropRegions, ValidationError};

use crate::error::MediaResult;

/// Crop planner for a fixed source frame size.
#[derive(Debug, Clone, Copy)]
pub struct CropPlanner {
    frame_width: u32,
    frame_height: u32,
}

impl CropPlanner {
    pub fn new(frame_width: u32, frame_height: u32) -> MediaResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(ValidationError::InvalidDimensions {
                width: frame_width,
                height: frame_height,
            }
            .into());
        }
        Ok(Self {
            frame_width,
            frame_height,
        })
    }

    /// Largest centered rectangle with the target ratio.
    pub fn region_for(&self, aspect: AspectRatio) -> CropRegion {
        let w = self.frame_width as f64;
        let h = self.frame_height as f64;

        if aspect.is_square() {
            let side = w.min(h);
            return CropRegion::new((w - side) / 2.0, (h - side) / 2.0, side, side);
        }

        // Compare w/h against aw/ah without going through floats.
        let source_wider = self.frame_width as u64 * aspect.height as u64
            > self.frame_height as u64 * aspect.width as u64;

        if source_wider {
            let width = h * aspect.width as f64 / aspect.height as f64;
            CropRegion::new((w - width) / 2.0, 0.0, width, h)
        } else {
            let height = w * aspect.height as f64 / aspect.width as f64;
            CropRegion::new(0.0, (h - height) / 2.0, w, height)
        }
    }

    /// Regions for each of `aspects`, keyed by ratio tag.
    pub fn plan(&self, aspects: &[AspectRatio]) -> CropRegions {
        let regions: CropRegions = aspects
            .iter()
            .map(|&aspect| (aspect.tag(), self.region_for(aspect)))
            .collect();

        debug!(
            width = self.frame_width,
            height = self.frame_height,
            regions = regions.len(),
            "Planned crop regions"
        );
        regions
    }

    /// Regions for the standard `16:9`, `9:16` and `1:1` targets.
    pub fn plan_default(&self) -> CropRegions {
        self.plan(AspectRatio::TARGETS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_on_landscape_1080p() {
        let planner = CropPlanner::new(1920, 1080).unwrap();
        assert_eq!(
            planner.region_for(AspectRatio::SQUARE),
            CropRegion::new(420.0, 0.0, 1080.0, 1080.0)
        );
    }

    #[test]
    fn test_portrait_on_landscape_keeps_fraction() {
        let planner = CropPlanner::new(1920, 1080).unwrap();
        let region = planner.region_for(AspectRatio::PORTRAIT);
        assert_eq!(region.width, 607.5);
        assert_eq!(region.height, 1080.0);
        assert_eq!(region.x, 656.25);
        assert_eq!(region.y, 0.0);
    }

    #[test]
    fn test_matching_ratio_is_full_frame() {
        let planner = CropPlanner::new(1920, 1080).unwrap();
        assert_eq!(
            planner.region_for(AspectRatio::LANDSCAPE),
            CropRegion::new(0.0, 0.0, 1920.0, 1080.0)
        );
    }

    #[test]
    fn test_landscape_on_portrait_crops_height() {
        let planner = CropPlanner::new(1080, 1920).unwrap();
        let region = planner.region_for(AspectRatio::LANDSCAPE);
        assert_eq!(region.width, 1080.0);
        assert_eq!(region.height, 607.5);
        assert_eq!(region.y, 656.25);
    }

    #[test]
    fn test_plan_default_regions_fit_frame() {
        for (w, h) in [(1920, 1080), (1080, 1920), (720, 720), (641, 359)] {
            let planner = CropPlanner::new(w, h).unwrap();
            let regions = planner.plan_default();
            assert_eq!(regions.len(), 3);
            for (tag, region) in &regions {
                assert!(region.fits_within(w, h), "{tag} outside {w}x{h}: {region:?}");
            }
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = CropPlanner::new(1280, 536).unwrap();
        assert_eq!(planner.plan_default(), planner.plan_default());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(CropPlanner::new(0, 1080).is_err());
    }
}
