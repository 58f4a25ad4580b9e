pub mod features;
pub mod knn;
pub mod training;

pub use knn::{ClassifierModel, DigitClassifier, Prediction};
pub use training::{DirectoryDataset, InMemoryDataset, TrainingDataProvider, shuffle_and_split};
