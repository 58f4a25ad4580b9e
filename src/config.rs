use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// All tunable constants of the grid reader.
///
/// Every field has a default tuned for the canonical working scale (input
/// downscaled to at most 600 px wide). A JSON file only needs to name the
/// values it overrides:
///
/// ```json
/// { "glyphs": { "max_height": 60 }, "classifier": { "k": 3 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub input: InputConfig,
    pub preprocess: PreprocessConfig,
    pub boundary: BoundaryMode,
    pub quad: QuadConfig,
    pub rectify: RectifyConfig,
    pub lines: LineConfig,
    pub glyphs: GlyphConfig,
    pub classifier: ClassifierConfig,
}

impl GridConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GridError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GridError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Images wider than this are shrunk by the integer ratio `width / max_width`.
    /// Zero disables shrinking.
    pub max_width: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { max_width: 600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Box blur radius; 1 gives a 3x3 kernel, 0 disables blurring.
    pub blur_radius: u32,
    /// Adaptive threshold neighbourhood radius; 7 gives a 15x15 window.
    pub threshold_block_radius: u32,
    /// A pixel is foreground when it exceeds its local mean by more than this.
    pub threshold_offset: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_radius: 1,
            threshold_block_radius: 7,
            threshold_offset: 2,
        }
    }
}

/// How the mask used to find the outer grid boundary is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Same binarization as every other stage.
    #[default]
    Adaptive,
    /// Blur followed by Canny with thresholds `(low, 2 * low)`.
    Canny { low: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadConfig {
    /// Polygon simplification tolerance as a fraction of the contour perimeter.
    pub approx_ratio: f64,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self { approx_ratio: 0.05 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Inset of the canonical square from the image border, in pixels.
    pub margin: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self { margin: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Structuring element length is `extent / length_divisor`.
    pub length_divisor: u32,
    /// Rectangles whose centerlines are this close are merged into one line.
    pub merge_tolerance: f32,
    /// Merged lines spanning less than this fraction of the shorter image side
    /// are dropped (long glyph strokes survive the directional opening).
    pub min_span_ratio: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            length_divisor: 25,
            merge_tolerance: 5.0,
            min_span_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Added around each glyph bounding box before cropping.
    pub crop_margin: u32,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            min_width: 4,
            max_width: 40,
            min_height: 12,
            max_height: 45,
            crop_margin: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of neighbours voting on a label.
    pub k: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { k: 5 }
    }
}
