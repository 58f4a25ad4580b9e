use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc;

use anyhow::Result;
use image::DynamicImage;
use log::{debug, info};

use crate::classify::DigitClassifier;
use crate::detection::{GridDetector, GridReading};

/// Intermediate images of one detection run, in the order they were produced.
#[derive(Debug, Clone, Default)]
pub struct DebugArtifacts {
    images: Vec<(String, DynamicImage)>,
}

impl DebugArtifacts {
    pub fn push(&mut self, name: impl Into<String>, image: DynamicImage) {
        self.images.push((name.into(), image));
    }

    pub fn get(&self, name: &str) -> Option<&DynamicImage> {
        self.images
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, image)| image)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// File name an artifact is saved under, e.g. `03_rectified.png`.
    pub fn file_name(index: usize, name: &str) -> String {
        format!("{:02}_{}.png", index, name.to_lowercase().replace(' ', "_"))
    }
}

/// Where debug images go.
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent; it is created if missing.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Write every artifact as `NN_<name>.png`, returning the written paths.
    pub fn save(&self, artifacts: &DebugArtifacts) -> Result<Vec<PathBuf>> {
        self.save_into(&self.output_dir, artifacts)
    }

    fn save_into(&self, dir: &Path, artifacts: &DebugArtifacts) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(artifacts.len());
        for (index, (name, image)) in artifacts.images.iter().enumerate() {
            let path = dir.join(DebugArtifacts::file_name(index, name));
            image
                .save(&path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image {}: {}", path.display(), e))?;
            debug!("saved {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Runs one detector over many images on a pool of worker threads.
///
/// Workers pull images from a shared channel; the trained model is shared
/// read-only between them. Results come back in input order.
pub struct BatchExecutor {
    detector: GridDetector,
    classifier: DigitClassifier,
    workers: usize,
}

impl BatchExecutor {
    pub fn new(detector: GridDetector, classifier: DigitClassifier, workers: usize) -> Self {
        Self {
            detector,
            classifier,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn execute(&self, images: Vec<DynamicImage>) -> Result<Vec<crate::Result<GridReading>>> {
        let total = images.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let (job_sender, job_receiver) = mpsc::channel::<(usize, DynamicImage)>();
        for job in images.into_iter().enumerate() {
            job_sender
                .send(job)
                .map_err(|e| anyhow::anyhow!("Failed to queue image: {}", e))?;
        }
        drop(job_sender);

        let job_receiver = Mutex::new(job_receiver);
        let (result_sender, result_receiver) = mpsc::channel();
        let workers = self.workers.min(total);
        info!("processing {total} images on {workers} workers");

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let jobs = &job_receiver;
                let results = result_sender.clone();
                scope.spawn(move || {
                    loop {
                        let job = match jobs.lock() {
                            Ok(receiver) => receiver.recv(),
                            Err(_) => break,
                        };
                        let Ok((index, image)) = job else { break };
                        debug!("worker {worker} took image {index}");
                        let outcome = self.detector.detect(&image, &self.classifier);
                        if results.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_sender);

        let mut slots: Vec<Option<crate::Result<GridReading>>> = (0..total).map(|_| None).collect();
        for (index, outcome) in result_receiver {
            slots[index] = Some(outcome);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or_else(|| anyhow::anyhow!("No result for image {}", index)))
            .collect()
    }
}
