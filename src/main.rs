use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use image::ImageReader;
use log::info;

use seegrid::{
    BatchExecutor, ClassifierModel, DebugConfig, DigitClassifier, DirectoryDataset, GridConfig,
    GridDetector, TrainingDataProvider, shuffle_and_split,
};

#[derive(Parser)]
#[command(name = "seegrid")]
#[command(about = "Locate a printed square grid in a photo and read the digits in its cells")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the grid in one image
    Read {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        #[command(flatten)]
        model: ModelSource,

        /// JSON file overriding detection parameters
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
    /// Train a classifier from a directory of labeled digits and save it
    Train {
        /// Directory with one sub-directory per digit
        #[arg(long, value_name = "DIR")]
        training_dir: PathBuf,

        /// Where to write the model
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Fraction of samples held out for the accuracy report
        #[arg(long, default_value_t = 0.2)]
        holdout: f32,

        /// Shuffle seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Neighbours used when scoring the holdout
        #[arg(short, default_value_t = 5)]
        k: usize,
    },
    /// Read many images concurrently
    Batch {
        #[arg(value_name = "IMAGES", required = true)]
        image_paths: Vec<PathBuf>,

        #[command(flatten)]
        model: ModelSource,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ModelSource {
    /// Train on this directory of labeled digits before reading
    #[arg(long, value_name = "DIR")]
    training_dir: Option<PathBuf>,

    /// Load a model written by `seegrid train`
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,
}

impl ModelSource {
    fn classifier(&self, k: usize) -> anyhow::Result<DigitClassifier> {
        let mut classifier = DigitClassifier::new(k);
        if let Some(path) = &self.model {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read model {}", path.display()))?;
            let model = ClassifierModel::load(&bytes)?;
            info!("loaded model with {} samples from {}", model.len(), path.display());
            classifier = DigitClassifier::with_model(Arc::new(model), k);
        } else if let Some(dir) = &self.training_dir {
            classifier.train_from(&DirectoryDataset::new(dir))?;
        }
        Ok(classifier)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GridConfig> {
    match path {
        Some(path) => Ok(GridConfig::from_json_file(path)?),
        None => Ok(GridConfig::default()),
    }
}

fn load_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match args.command {
        Command::Read {
            image_path,
            model,
            config,
            debug_out,
        } => {
            let config = load_config(config.as_deref())?;
            // check the debug directory before spending time on training
            let debug = debug_out.map(DebugConfig::new).transpose()?;
            let classifier = model.classifier(config.classifier.k)?;
            let img = load_image(&image_path)?;
            info!("Image loaded: {}x{}", img.width(), img.height());

            let detector = GridDetector::new(config);
            let reading = match &debug {
                Some(debug) => {
                    let (reading, artifacts) = detector.detect_with_debug(&img, &classifier)?;
                    let written = debug.save(&artifacts)?;
                    info!("saved {} debug images to {}", written.len(), debug.output_dir.display());
                    reading
                }
                None => detector.detect(&img, &classifier)?,
            };

            println!("{}", reading.grid);
            for (row, col) in reading.grid.uncertain_cells() {
                println!("uncertain: row {row}, col {col}");
            }
        }
        Command::Train {
            training_dir,
            output,
            holdout,
            seed,
            k,
        } => {
            let samples = DirectoryDataset::new(&training_dir).samples()?;
            let (train, test) = shuffle_and_split(samples, holdout, seed);
            let mut classifier = DigitClassifier::new(k);
            classifier.train(&train)?;
            if !test.is_empty() {
                let accuracy = classifier.evaluate(&test)?;
                println!(
                    "holdout accuracy: {:.1}% on {} samples",
                    accuracy * 100.0,
                    test.len()
                );
            }
            let bytes = classifier.model()?.save()?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("Failed to write model {}", output.display()))?;
            println!("model with {} samples saved to {}", train.len(), output.display());
        }
        Command::Batch {
            image_paths,
            model,
            config,
            workers,
        } => {
            let config = load_config(config.as_deref())?;
            let classifier = model.classifier(config.classifier.k)?;
            let images = image_paths
                .iter()
                .map(|path| load_image(path))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let executor = BatchExecutor::new(GridDetector::new(config), classifier, workers);
            let results = executor.execute(images)?;
            for (path, result) in image_paths.iter().zip(results) {
                println!("== {}", path.display());
                match result {
                    Ok(reading) => println!("{}", reading.grid),
                    Err(e) => println!("error: {e}\n"),
                }
            }
        }
    }

    Ok(())
}
