use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entrance::EntranceStrategy;
use crate::error::SolveError;

/// How the corner selection is turned into an axis aligned image
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectifyMode {
    /// Mask the quadrilateral and crop to its bounding box
    #[default]
    Crop,
    /// Warp the quadrilateral onto a rectangle with a homography
    Perspective,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntranceConfig {
    pub strategy: EntranceStrategy,
    /// Fraction of every edge ignored at both ends by the derivative scan
    pub margin_fraction: f64,
    /// Side of the probe square used by the boundary square scan
    pub square_size: usize,
}

impl Default for EntranceConfig {
    fn default() -> Self {
        Self {
            strategy: EntranceStrategy::Derivative,
            margin_fraction: 0.03,
            square_size: 18,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing keys keep their default values
pub struct SolverConfig {
    pub rectify: RectifyMode,
    /// The solving grid is this many times smaller than the cropped photo
    pub downscale: u32,
    pub threshold_block_size: u32,
    pub threshold_constant: i16,
    /// Gaussian kernel size, 1 disables the blur
    pub blur_kernel_size: u32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub square_epsilon: f64,
    /// Pixels removed from each side of the refined maze rectangle
    pub refine_inset: u32,
    /// Trailing columns sealed on rows without any wall
    pub seal_margin: usize,
    pub entrance: EntranceConfig,
    pub bloom_divisor: f64,
    pub marker_color: [u8; 4],
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rectify: RectifyMode::Crop,
            downscale: 2,
            threshold_block_size: 25,
            threshold_constant: 30,
            blur_kernel_size: 3,
            square_epsilon: 0.01,
            refine_inset: 0,
            seal_margin: 20,
            entrance: EntranceConfig::default(),
            bloom_divisor: 50_000.0,
            marker_color: [255, 0, 0, 255],
        }
    }
}

impl SolverConfig {
    pub fn from_json(json: &str) -> Result<Self, SolveError> {
        let config: SolverConfig =
            serde_json::from_str(json).map_err(|e| SolveError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SolveError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SolveError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let invalid = |msg: &str| Err(SolveError::InvalidConfig(msg.to_string()));

        if self.downscale == 0 {
            return invalid("downscale must be at least 1");
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return invalid("threshold_block_size must be odd and at least 3");
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return invalid("blur_kernel_size must be odd");
        }
        if !(self.square_epsilon > 0.0) {
            return invalid("square_epsilon must be positive");
        }
        if !(0.0..0.5).contains(&self.entrance.margin_fraction) {
            return invalid("entrance.margin_fraction must be in [0, 0.5)");
        }
        if self.entrance.square_size == 0 {
            return invalid("entrance.square_size must be at least 1");
        }
        if !(self.bloom_divisor > 0.0) {
            return invalid("bloom_divisor must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(SolverConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SolverConfig::from_json(
            r#"{ "downscale": 3, "rectify": "perspective", "entrance": { "strategy": "boundary_square" } }"#,
        )
        .unwrap();

        assert_eq!(config.downscale, 3);
        assert_eq!(config.rectify, RectifyMode::Perspective);
        assert_eq!(config.entrance.strategy, EntranceStrategy::BoundarySquare);
        assert_eq!(config.entrance.square_size, 18);
        assert_eq!(config.threshold_block_size, 25);
        assert_eq!(config.seal_margin, 20);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for json in [
            r#"{ "downscale": 0 }"#,
            r#"{ "threshold_block_size": 24 }"#,
            r#"{ "blur_kernel_size": 2 }"#,
            r#"{ "entrance": { "margin_fraction": 0.7 } }"#,
            r#"{ "bloom_divisor": 0 }"#,
            r#"{ "downscale": "two" }"#,
        ] {
            assert!(
                matches!(SolverConfig::from_json(json), Err(SolveError::InvalidConfig(_))),
                "{}",
                json
            );
        }
    }
}
