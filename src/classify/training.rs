use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{GridError, Result};
use crate::models::LabeledSample;

/// Source of labeled reference glyphs.
pub trait TrainingDataProvider {
    fn samples(&self) -> Result<Vec<LabeledSample>>;
}

/// Samples already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    samples: Vec<LabeledSample>,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }
}

impl TrainingDataProvider for InMemoryDataset {
    fn samples(&self) -> Result<Vec<LabeledSample>> {
        Ok(self.samples.clone())
    }
}

/// One sub-directory per digit, named `0` to `9`, holding image files of that digit.
///
/// Other directories and non-image files are ignored. Samples come back
/// sorted by path so training is reproducible.
#[derive(Debug, Clone)]
pub struct DirectoryDataset {
    root: PathBuf,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

impl DirectoryDataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn label_dirs(&self) -> Result<Vec<(u8, PathBuf)>> {
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| GridError::training_data(&self.root, e))?;
        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GridError::training_data(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let label = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|&l| l <= 9);
            match label {
                Some(label) => dirs.push((label, path)),
                None => debug!("skipping {}: not a digit directory", path.display()),
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl TrainingDataProvider for DirectoryDataset {
    fn samples(&self) -> Result<Vec<LabeledSample>> {
        let mut samples = Vec::new();
        for (label, dir) in self.label_dirs()? {
            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
                .map_err(|e| GridError::training_data(&dir, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image_file(p))
                .collect();
            files.sort();
            for file in files {
                let image = image::open(&file).map_err(|e| GridError::training_data(&file, e))?;
                samples.push(LabeledSample::new(label, image));
            }
        }
        if samples.is_empty() {
            return Err(GridError::training_data(
                &self.root,
                "no images found in digit directories",
            ));
        }
        info!("loaded {} training samples from {}", samples.len(), self.root.display());
        Ok(samples)
    }
}

/// Shuffle with a fixed seed and split into `(train, holdout)`, the holdout
/// taking `holdout_ratio` of the samples (rounded down).
pub fn shuffle_and_split(
    mut samples: Vec<LabeledSample>,
    holdout_ratio: f32,
    seed: u64,
) -> (Vec<LabeledSample>, Vec<LabeledSample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    let holdout = ((samples.len() as f32) * holdout_ratio.clamp(0.0, 1.0)) as usize;
    let train = samples.split_off(holdout);
    (train, samples)
}
