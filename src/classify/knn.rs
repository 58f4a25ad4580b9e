use std::sync::Arc;

use image::GrayImage;
use log::{debug, info};
use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

use crate::classify::features::{FEATURE_LEN, describe, describe_image};
use crate::classify::training::TrainingDataProvider;
use crate::error::{GridError, Result};
use crate::models::{Confidence, LabeledSample};

const MODEL_FORMAT: &str = "seegrid-knn";
const MODEL_VERSION: u32 = 1;

/// Descriptors of the reference glyphs, one row per sample, with their labels.
///
/// Built once and never mutated; share it behind an `Arc` between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierModel {
    features: DMatrix<f32>,
    labels: Vec<u8>,
}

/// Outcome of a k-nearest-neighbour vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub label: u8,
    pub confidence: Confidence,
    /// Neighbours that voted for `label`.
    pub votes: usize,
    /// Neighbours that took part in the vote.
    pub neighbours: usize,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    format: String,
    version: u32,
    feature_len: usize,
    labels: Vec<u8>,
    /// Row-major, `labels.len() * feature_len` values.
    features: Vec<f32>,
}

impl ClassifierModel {
    /// Describe every sample and stack the descriptors into the feature matrix.
    pub fn train(samples: &[LabeledSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(GridError::training_data("<samples>", "no labeled samples"));
        }
        let mut rows = Vec::with_capacity(samples.len() * FEATURE_LEN);
        let mut labels = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            if sample.label > 9 {
                return Err(GridError::InvalidSample {
                    index,
                    reason: format!("label {} is not a digit", sample.label),
                });
            }
            let descriptor = describe_image(&sample.image).map_err(|e| GridError::InvalidSample {
                index,
                reason: e.to_string(),
            })?;
            rows.extend_from_slice(&descriptor);
            labels.push(sample.label);
        }
        info!("trained model on {} samples", labels.len());
        Ok(Self {
            features: DMatrix::from_row_slice(labels.len(), FEATURE_LEN, &rows),
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.features.ncols()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn features(&self) -> &DMatrix<f32> {
        &self.features
    }

    /// Indices and squared Euclidean distances of the `k` rows closest to
    /// `query`, closest first. Equal distances keep row order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let query = RowDVector::from_row_slice(query);
        let mut distances: Vec<(usize, f32)> = (0..self.features.nrows())
            .map(|i| (i, (self.features.row(i) - &query).norm_squared()))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }

    /// Majority label among the `k` nearest rows. A tie goes to the label
    /// whose first voter is closest; any disagreement marks the result uncertain.
    pub fn vote(&self, query: &[f32], k: usize) -> Result<Prediction> {
        if query.len() != self.feature_len() {
            return Err(GridError::Features(format!(
                "query has {} values, model rows have {}",
                query.len(),
                self.feature_len()
            )));
        }
        let neighbours = self.nearest(query, k.max(1));
        let mut counts = [0usize; 10];
        for &(row, _) in &neighbours {
            counts[self.labels[row] as usize] += 1;
        }

        let mut best: Option<(u8, usize)> = None;
        for &(row, _) in &neighbours {
            let label = self.labels[row];
            let votes = counts[label as usize];
            if best.is_none_or(|(_, best_votes)| votes > best_votes) {
                best = Some((label, votes));
            }
        }
        let (label, votes) = best.ok_or(GridError::ModelNotTrained)?;
        let confidence = if votes == neighbours.len() {
            Confidence::Certain
        } else {
            Confidence::Uncertain
        };
        Ok(Prediction {
            label,
            confidence,
            votes,
            neighbours: neighbours.len(),
        })
    }

    /// Serialize the feature matrix and labels.
    pub fn save(&self) -> Result<Vec<u8>> {
        let (rows, cols) = self.features.shape();
        let mut features = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            features.extend(self.features.row(r).iter().copied());
        }
        let file = ModelFile {
            format: MODEL_FORMAT.to_string(),
            version: MODEL_VERSION,
            feature_len: cols,
            labels: self.labels.clone(),
            features,
        };
        serde_json::to_vec(&file).map_err(|e| GridError::ModelFormat(e.to_string()))
    }

    /// Rebuild a model written by [`ClassifierModel::save`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let file: ModelFile =
            serde_json::from_slice(bytes).map_err(|e| GridError::ModelFormat(e.to_string()))?;
        if file.format != MODEL_FORMAT || file.version != MODEL_VERSION {
            return Err(GridError::ModelFormat(format!(
                "unsupported model {} v{}",
                file.format, file.version
            )));
        }
        if file.labels.is_empty() {
            return Err(GridError::ModelFormat("model has no samples".to_string()));
        }
        if file.feature_len != FEATURE_LEN {
            return Err(GridError::ModelFormat(format!(
                "feature length {} does not match descriptor length {FEATURE_LEN}",
                file.feature_len
            )));
        }
        if file.features.len() != file.labels.len() * file.feature_len {
            return Err(GridError::ModelFormat(format!(
                "{} feature values for {} samples of length {}",
                file.features.len(),
                file.labels.len(),
                file.feature_len
            )));
        }
        if let Some(bad) = file.labels.iter().find(|&&l| l > 9) {
            return Err(GridError::ModelFormat(format!("label {bad} is not a digit")));
        }
        Ok(Self {
            features: DMatrix::from_row_slice(file.labels.len(), file.feature_len, &file.features),
            labels: file.labels,
        })
    }
}

/// k-nearest-neighbour digit classifier over HOG descriptors.
#[derive(Debug, Clone)]
pub struct DigitClassifier {
    k: usize,
    model: Option<Arc<ClassifierModel>>,
}

impl DigitClassifier {
    /// An untrained classifier voting among `k` neighbours.
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            model: None,
        }
    }

    pub fn with_model(model: Arc<ClassifierModel>, k: usize) -> Self {
        Self {
            k: k.max(1),
            model: Some(model),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&Arc<ClassifierModel>> {
        self.model.as_ref().ok_or(GridError::ModelNotTrained)
    }

    pub fn train(&mut self, samples: &[LabeledSample]) -> Result<()> {
        self.model = Some(Arc::new(ClassifierModel::train(samples)?));
        Ok(())
    }

    pub fn train_from(&mut self, provider: &dyn TrainingDataProvider) -> Result<()> {
        let samples = provider.samples()?;
        self.train(&samples)
    }

    pub fn classify(&self, glyph: &GrayImage) -> Result<Prediction> {
        self.classify_with_k(glyph, self.k)
    }

    pub fn classify_with_k(&self, glyph: &GrayImage, k: usize) -> Result<Prediction> {
        let model = self.model()?;
        let prediction = model.vote(&describe(glyph)?, k)?;
        debug!(
            "classified glyph as {} ({}/{} votes)",
            prediction.label, prediction.votes, prediction.neighbours
        );
        Ok(prediction)
    }

    /// Fraction of `samples` whose predicted label matches their own.
    pub fn evaluate(&self, samples: &[LabeledSample]) -> Result<f32> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for sample in samples {
            if self.classify(&sample.image.to_luma8())?.label == sample.label {
                correct += 1;
            }
        }
        Ok(correct as f32 / samples.len() as f32)
    }
}
