pub mod cells;
pub mod contours;
pub mod glyphs;
pub mod lines;
pub mod morphology;
pub mod overlay;
pub mod preprocessing;
pub mod quad;
pub mod rectify;

use image::DynamicImage;
use log::{debug, info, warn};

use crate::classify::DigitClassifier;
use crate::config::GridConfig;
use crate::error::{Result, Stage};
use crate::grid::{Grid, assemble};
use crate::models::{
    Axis, Confidence, Contour, GlyphCandidate, GridLineSet, PositionedDigit, Quadrilateral,
};
use crate::pipeline::DebugArtifacts;

use self::lines::GridLines;
use self::rectify::Rectification;

/// Everything read from one photo.
#[derive(Debug, Clone)]
pub struct GridReading {
    pub grid: Grid,
    /// Boundary in the (scale-normalized) input image.
    pub quadrilateral: Quadrilateral,
    /// Lines in rectified coordinates.
    pub horizontal: GridLineSet,
    pub vertical: GridLineSet,
    /// Glyph-sized blobs found in the grid.
    pub glyphs: usize,
    /// Glyphs whose center fell outside every cell.
    pub unplaced: usize,
    /// Glyphs read in a cell that already held a digit.
    pub duplicates: usize,
}

/// Grid detection orchestrator: boundary, rectification, lines, glyphs, digits.
#[derive(Debug, Clone, Default)]
pub struct GridDetector {
    pub config: GridConfig,
}

impl GridDetector {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// Read the grid in `img` with a trained classifier.
    pub fn detect(&self, img: &DynamicImage, classifier: &DigitClassifier) -> Result<GridReading> {
        self.run(img, classifier, None)
    }

    /// Same as [`GridDetector::detect`], also returning the intermediate images.
    pub fn detect_with_debug(
        &self,
        img: &DynamicImage,
        classifier: &DigitClassifier,
    ) -> Result<(GridReading, DebugArtifacts)> {
        let mut artifacts = DebugArtifacts::default();
        let reading = self.run(img, classifier, Some(&mut artifacts))?;
        Ok((reading, artifacts))
    }

    /// Contours of the boundary mask of `img` (useful for debugging).
    pub fn get_contours(&self, img: &DynamicImage) -> Result<Vec<Contour>> {
        let mask = preprocessing::boundary_mask(img, self.config.boundary, &self.config.preprocess)?;
        Ok(contours::find_contours(&mask))
    }

    /// Outer boundary of the grid in `img`.
    pub fn find_boundary(&self, img: &DynamicImage) -> Result<Quadrilateral> {
        quad::find_quadrilateral(&self.get_contours(img)?, &self.config.quad)
    }

    /// Boundary search followed by perspective correction.
    pub fn rectify(&self, img: &DynamicImage) -> Result<Rectification> {
        let quad = self.find_boundary(img)?;
        rectify::rectify(img, &quad, &self.config.rectify)
    }

    fn run(
        &self,
        img: &DynamicImage,
        classifier: &DigitClassifier,
        mut debug: Option<&mut DebugArtifacts>,
    ) -> Result<GridReading> {
        let config = &self.config;
        preprocessing::ensure_not_empty(img, Stage::Preprocess)?;
        // fail before any image work when there is nothing to classify with
        classifier.model()?;

        let img = preprocessing::normalize_scale(img, config.input.max_width);
        debug!("working image {}x{}", img.width(), img.height());

        let mask = preprocessing::boundary_mask(&img, config.boundary, &config.preprocess)?;
        let all_contours = contours::find_contours(&mask);
        debug!("found {} contours", all_contours.len());
        let quadrilateral = quad::find_quadrilateral(&all_contours, &config.quad)?;
        if let Some(artifacts) = debug.as_deref_mut() {
            artifacts.push("binary", DynamicImage::ImageLuma8(mask.clone()));
            artifacts.push(
                "contours",
                DynamicImage::ImageRgb8(overlay::draw_contours(&mask, &all_contours, &quadrilateral)),
            );
        }

        let rectification = rectify::rectify(&img, &quadrilateral, &config.rectify)?;
        let rectified_gray = preprocessing::to_grayscale(&rectification.image);
        let rectified_binary = preprocessing::binarize(&rectification.image, &config.preprocess)?;

        let grid_lines = lines::detect_grid_lines(&rectified_binary, &config.lines)?;
        debug!(
            "{} horizontal and {} vertical lines",
            grid_lines.horizontal.len(),
            grid_lines.vertical.len()
        );
        let cleaned = grid_lines.remove_from(&rectified_binary);
        let glyphs = glyphs::find_glyph_candidates(&cleaned, &rectified_gray, &config.glyphs);

        if let Some(artifacts) = debug.as_deref_mut() {
            push_rectified(artifacts, &rectification, &rectified_binary, &grid_lines, &glyphs);
        }

        let size = grid_lines
            .horizontal
            .intervals()
            .max(grid_lines.vertical.intervals());
        let mut digits = Vec::with_capacity(glyphs.len());
        let mut unplaced = 0;
        for glyph in &glyphs {
            let Some((row, col)) =
                cells::locate_cell(&glyph.bbox, &grid_lines.horizontal, &grid_lines.vertical)
            else {
                debug!("glyph at {:?} is outside every cell", glyph.bbox);
                unplaced += 1;
                continue;
            };
            let prediction = classifier.classify(&glyph.image)?;
            if prediction.confidence == Confidence::Uncertain {
                warn!(
                    "cell ({row}, {col}) read as {} with only {}/{} votes",
                    prediction.label, prediction.votes, prediction.neighbours
                );
            }
            digits.push(PositionedDigit {
                row,
                col,
                label: prediction.label,
                confidence: prediction.confidence,
            });
        }

        let grid = assemble(size, &digits);
        info!(
            "read {} digits into a {size}x{size} grid ({} glyphs, {} unplaced, {} duplicates)",
            grid.filled(),
            glyphs.len(),
            unplaced,
            grid.duplicates()
        );
        Ok(GridReading {
            quadrilateral,
            horizontal: grid_lines.horizontal,
            vertical: grid_lines.vertical,
            glyphs: glyphs.len(),
            unplaced,
            duplicates: grid.duplicates(),
            grid,
        })
    }
}

fn push_rectified(
    artifacts: &mut DebugArtifacts,
    rectification: &Rectification,
    binary: &image::GrayImage,
    grid_lines: &GridLines,
    glyphs: &[GlyphCandidate],
) {
    let gray = rectification.image.to_luma8();
    artifacts.push("rectified", rectification.image.clone());
    artifacts.push("rectified_binary", DynamicImage::ImageLuma8(binary.clone()));
    for (name, axis) in [
        ("horizontal_lines", Axis::Horizontal),
        ("vertical_lines", Axis::Vertical),
    ] {
        artifacts.push(
            name,
            DynamicImage::ImageLuma8(overlay::line_mask_view(grid_lines, axis)),
        );
    }
    artifacts.push(
        "grid_lines",
        DynamicImage::ImageRgb8(overlay::draw_grid_lines(&gray, grid_lines)),
    );
    artifacts.push(
        "glyphs",
        DynamicImage::ImageRgb8(overlay::draw_glyphs(&gray, glyphs)),
    );
}
