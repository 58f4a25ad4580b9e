pub mod classify;
pub mod config;
pub mod detection;
pub mod error;
pub mod grid;
pub mod models;
pub mod pipeline;

pub use classify::{
    ClassifierModel, DigitClassifier, DirectoryDataset, InMemoryDataset, Prediction,
    TrainingDataProvider, shuffle_and_split,
};
pub use config::{BoundaryMode, GridConfig};
pub use detection::{GridDetector, GridReading};
pub use error::{GridError, Result, Stage};
pub use grid::{Grid, assemble};
pub use models::{
    Axis, BoundingBox, Confidence, Contour, GlyphCandidate, GridLineSet, LabeledSample, Line,
    PositionedDigit, Quadrilateral,
};
pub use pipeline::{BatchExecutor, DebugArtifacts, DebugConfig};
