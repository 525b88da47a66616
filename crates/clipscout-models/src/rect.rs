use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Crop regions keyed by aspect ratio tag (`"16:9"`, `"9:16"`, `"1:1"`).
pub type CropRegions = BTreeMap<String, CropRegion>;

/// A crop rectangle in source-pixel coordinates.
///
/// Coordinates stay fractional; rounding is left to whoever renders the crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropRegion {
    /// X coordinate of the top-left corner
    pub x: f64,
    /// Y coordinate of the top-left corner
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// Create a new crop region.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check the rectangle lies inside a `frame_width` x `frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= frame_width as f64
            && self.y + self.height <= frame_height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within() {
        assert!(CropRegion::new(420.0, 0.0, 1080.0, 1080.0).fits_within(1920, 1080));
        assert!(!CropRegion::new(1000.0, 0.0, 1080.0, 1080.0).fits_within(1920, 1080));
        assert!(!CropRegion::new(-1.0, 0.0, 10.0, 10.0).fits_within(1920, 1080));
    }
}
