mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::*;
use image::{DynamicImage, GrayImage};
use seegrid::classify::features::{FEATURE_LEN, describe};
use seegrid::{
    ClassifierModel, DirectoryDataset, InMemoryDataset, TrainingDataProvider, shuffle_and_split,
};
use tempfile::TempDir;

#[test]
fn descriptor_has_fixed_length_for_any_glyph_size() {
    assert_eq!(FEATURE_LEN, 324);
    assert_eq!(describe(&render_digit(3, 1, 0)).unwrap().len(), FEATURE_LEN);
    for (w, h) in [(8, 20), (32, 32), (70, 45)] {
        // a flat patch has no gradients at all
        let descriptor = describe(&GrayImage::from_pixel(w, h, WHITE)).unwrap();
        assert_eq!(descriptor.len(), FEATURE_LEN);
        assert!(descriptor.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn empty_glyph_cannot_be_described() {
    assert!(matches!(
        describe(&GrayImage::new(0, 0)),
        Err(GridError::EmptyImage { .. })
    ));
}

#[test]
fn every_training_sample_classifies_as_itself_with_one_neighbour() {
    let samples = synthetic_samples(3..=7);
    let mut classifier = DigitClassifier::new(1);
    classifier.train(&samples).unwrap();

    for sample in &samples {
        let prediction = classifier.classify(&sample.image.to_luma8()).unwrap();
        assert_eq!(prediction.label, sample.label);
        assert_eq!(prediction.confidence, Confidence::Certain);
    }
    assert_eq!(classifier.evaluate(&samples).unwrap(), 1.0);
}

#[test]
fn classifying_before_training_fails() {
    let classifier = DigitClassifier::new(5);
    assert!(!classifier.is_trained());
    let err = classifier.classify(&render_digit(5, 4, 3)).unwrap_err();
    assert!(matches!(err, GridError::ModelNotTrained));
}

#[test]
fn majority_wins_and_disagreement_is_uncertain() {
    let sample = |label, digit| {
        LabeledSample::new(label, DynamicImage::ImageLuma8(render_digit(digit, 4, 3)))
    };
    // three identical copies of a "1" glyph, two of them mislabeled
    let samples = vec![sample(1, 1), sample(7, 1), sample(7, 1), sample(0, 0)];
    let model = ClassifierModel::train(&samples).unwrap();

    let query = describe(&render_digit(1, 4, 3)).unwrap();
    let prediction = model.vote(&query, 3).unwrap();
    assert_eq!(prediction.label, 7);
    assert_eq!(prediction.votes, 2);
    assert_eq!(prediction.neighbours, 3);
    assert_eq!(prediction.confidence, Confidence::Uncertain);

    // equal distances keep training order, so the single "1" is nearest
    assert_eq!(model.vote(&query, 1).unwrap().label, 1);
}

#[test]
fn nearest_neighbours_come_back_closest_first() {
    let model = trained_model();
    let query = describe(&render_digit(8, 5, 3)).unwrap();
    let nearest = model.nearest(&query, 5);

    assert_eq!(nearest.len(), 5);
    for pair in nearest.windows(2) {
        assert!(pair[0].1 <= pair[1].1);
    }
    assert_eq!(model.labels()[nearest[0].0], 8);
    assert_eq!(nearest[0].1, 0.0);
}

#[test]
fn synthetic_digits_are_read_by_majority() {
    let classifier = trained_classifier(5);
    for digit in 0..=9u8 {
        let glyph = render_digit(digit, 4, 2);
        assert_eq!(classifier.classify(&glyph).unwrap().label, digit, "digit {digit}");
    }
}

#[test]
fn invalid_label_is_rejected() {
    let samples = vec![LabeledSample::new(12, DynamicImage::ImageLuma8(render_digit(1, 3, 3)))];
    assert!(matches!(
        ClassifierModel::train(&samples),
        Err(GridError::InvalidSample { index: 0, .. })
    ));
    assert!(matches!(
        ClassifierModel::train(&[]),
        Err(GridError::TrainingDataUnavailable { .. })
    ));
}

#[test]
fn model_survives_save_and_load() {
    let model = trained_model();
    let bytes = model.save().unwrap();
    let loaded = ClassifierModel::load(&bytes).unwrap();

    assert_eq!(loaded.labels(), model.labels());
    assert_eq!(loaded.feature_len(), FEATURE_LEN);
    assert_relative_eq!(loaded.features(), model.features(), epsilon = 1e-6);

    let from_loaded = DigitClassifier::with_model(Arc::new(loaded), 5);
    let glyph = render_digit(4, 6, 2);
    assert_eq!(from_loaded.classify(&glyph).unwrap().label, 4);
}

#[test]
fn corrupt_model_bytes_are_rejected() {
    assert!(matches!(
        ClassifierModel::load(b"not json"),
        Err(GridError::ModelFormat(_))
    ));

    let mut value: serde_json::Value = serde_json::from_slice(&trained_model().save().unwrap()).unwrap();
    value["feature_len"] = serde_json::json!(10);
    let tampered = serde_json::to_vec(&value).unwrap();
    assert!(matches!(
        ClassifierModel::load(&tampered),
        Err(GridError::ModelFormat(_))
    ));
}

#[test]
fn directory_dataset_reads_digit_folders() {
    let dir = TempDir::new().unwrap();
    for digit in [2u8, 5] {
        let label_dir = dir.path().join(digit.to_string());
        std::fs::create_dir(&label_dir).unwrap();
        for scale in 3..=4 {
            render_digit(digit, scale, 3)
                .save(label_dir.join(format!("{scale}.png")))
                .unwrap();
        }
        std::fs::write(label_dir.join("notes.txt"), "ignored").unwrap();
    }
    std::fs::create_dir(dir.path().join("misc")).unwrap();

    let samples = DirectoryDataset::new(dir.path()).samples().unwrap();
    let labels: Vec<u8> = samples.iter().map(|s| s.label).collect();
    assert_eq!(labels, vec![2, 2, 5, 5]);

    let mut classifier = DigitClassifier::new(1);
    classifier.train_from(&DirectoryDataset::new(dir.path())).unwrap();
    assert_eq!(classifier.model().unwrap().len(), 4);
}

#[test]
fn missing_or_empty_dataset_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let missing = DirectoryDataset::new(dir.path().join("nope"));
    assert!(matches!(
        missing.samples(),
        Err(GridError::TrainingDataUnavailable { .. })
    ));

    let empty = DirectoryDataset::new(dir.path());
    let err = empty.samples().unwrap_err();
    assert!(matches!(err, GridError::TrainingDataUnavailable { .. }));
    assert_eq!(err.stage(), seegrid::Stage::Training);
}

#[test]
fn in_memory_dataset_trains_like_a_slice() {
    let provider = InMemoryDataset::new(synthetic_samples(4..=5));
    let mut classifier = DigitClassifier::new(1);
    classifier.train_from(&provider).unwrap();
    assert_eq!(classifier.model().unwrap().len(), 20);
}

#[test]
fn split_is_reproducible_for_a_seed() {
    let labels = |samples: &[LabeledSample]| samples.iter().map(|s| s.label).collect::<Vec<_>>();

    let (train_a, hold_a) = shuffle_and_split(synthetic_samples(3..=4), 0.25, 7);
    let (train_b, hold_b) = shuffle_and_split(synthetic_samples(3..=4), 0.25, 7);
    assert_eq!(hold_a.len(), 5);
    assert_eq!(train_a.len(), 15);
    assert_eq!(labels(&train_a), labels(&train_b));
    assert_eq!(labels(&hold_a), labels(&hold_b));

    let (train, hold) = shuffle_and_split(synthetic_samples(3..=3), 0.0, 1);
    assert_eq!((train.len(), hold.len()), (10, 0));
}
