use std::fmt;
use std::path::PathBuf;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Contours,
    Quadrilateral,
    Rectify,
    GridLines,
    Glyphs,
    Classify,
    Training,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocess => "preprocess",
            Stage::Contours => "contours",
            Stage::Quadrilateral => "quadrilateral",
            Stage::Rectify => "rectify",
            Stage::GridLines => "grid lines",
            Stage::Glyphs => "glyphs",
            Stage::Classify => "classify",
            Stage::Training => "training",
            Stage::Config => "config",
        };
        f.write_str(name)
    }
}

/// Errors returned by the grid reader.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("[{stage}] image has no pixel data")]
    EmptyImage { stage: Stage },
    #[error("[quadrilateral] grid boundary approximation has {vertices} vertices, expected 4")]
    GridBoundaryAmbiguous { vertices: usize },
    #[error("[rectify] perspective transform is degenerate: {reason}")]
    Rectification { reason: String },
    #[error("[classify] classifier has not been trained")]
    ModelNotTrained,
    #[error("[training] training data unavailable at {}: {reason}", path.display())]
    TrainingDataUnavailable { path: PathBuf, reason: String },
    #[error("[training] sample {index} rejected: {reason}")]
    InvalidSample { index: usize, reason: String },
    #[error("[classify] feature extraction failed: {0}")]
    Features(String),
    #[error("[classify] persisted model is invalid: {0}")]
    ModelFormat(String),
    #[error("[config] {0}")]
    Config(String),
}

impl GridError {
    /// Stage in which the error was raised.
    pub fn stage(&self) -> Stage {
        match self {
            GridError::EmptyImage { stage } => *stage,
            GridError::GridBoundaryAmbiguous { .. } => Stage::Quadrilateral,
            GridError::Rectification { .. } => Stage::Rectify,
            GridError::ModelNotTrained | GridError::Features(_) | GridError::ModelFormat(_) => {
                Stage::Classify
            }
            GridError::TrainingDataUnavailable { .. } | GridError::InvalidSample { .. } => {
                Stage::Training
            }
            GridError::Config(_) => Stage::Config,
        }
    }

    pub(crate) fn training_data(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        GridError::TrainingDataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
