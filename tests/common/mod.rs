#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from seegrid for tests
pub use seegrid::{
    Axis, BoundingBox, Confidence, DigitClassifier, GridConfig, GridDetector, GridError,
    GridLineSet, LabeledSample, Line, PositionedDigit, Quadrilateral,
};
pub use seegrid::models::Point;
