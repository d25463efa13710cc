//! Integration tests for the hogsvm library
//!
//! These tests run the pipeline end to end: images are described with HOG,
//! a classifier is trained on the descriptors, stored, reloaded and used by
//! the sliding-window detector.

use approx::assert_relative_eq;
use hogsvm::core::{DetectorError, Feature, KernelType, SvmParameter, SENTINEL_INDEX};
use hogsvm::detection::{iou, Detector};
use hogsvm::feature::{self, FeatureExtractor, HogFeatureExtractor, ParametersMap};
use hogsvm::utils::scaling::{fit_transform, ScalingMethod, ScalingParams};
use hogsvm::{encode_feature, file_io, LabeledImageSet, SupportVectorMachine};
use image::{GrayImage, Luma};
use std::io::Cursor;
use tempfile::TempDir;

const SIDE: u32 = 24;

fn vertical_bar(width: u32, height: u32, x0: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        if x >= x0 && x < x0 + 6 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn horizontal_bar(width: u32, height: u32, y0: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |_, y| {
        if y >= y0 && y < y0 + 6 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Vertical bars are positives; horizontal bars and blank crops negatives
fn bar_set() -> LabeledImageSet {
    let mut set = LabeledImageSet::new();
    for k in 0..5 {
        set.push(1.0, vertical_bar(SIDE, SIDE, 3 + 3 * k));
        set.push(-1.0, horizontal_bar(SIDE, SIDE, 3 + 3 * k));
    }
    set.push(-1.0, GrayImage::new(SIDE, SIDE));
    set.push(-1.0, GrayImage::from_pixel(SIDE, SIDE, Luma([200u8])));
    set
}

fn trained_on_bars(extractor: &dyn FeatureExtractor) -> SupportVectorMachine {
    let set = bar_set();
    let features = extractor.extract_all(&set);
    let mut svm = SupportVectorMachine::with_parameter(SvmParameter::default().with_c(10.0));
    svm.train(set.labels(), &features)
        .expect("Training should succeed");
    svm
}

/// Test complete workflow: images -> features -> training -> evaluation
#[test]
fn test_complete_workflow() {
    let extractor = HogFeatureExtractor::default();
    let set = bar_set();
    let features = extractor.extract_all(&set);
    assert!(features.iter().all(|f| f.len() == extractor.dimension(SIDE, SIDE)));

    let svm = trained_on_bars(&extractor);
    let metrics = svm
        .evaluate(set.labels(), &features)
        .expect("Evaluation should succeed");
    assert_eq!(metrics.accuracy(), 1.0);

    let info = svm.info().expect("Model info");
    assert_eq!(info.kernel_type, KernelType::Linear);
    assert_eq!(info.labels, [1.0, -1.0]);
    assert!(info.n_support_vectors > 0 && info.n_support_vectors <= set.len());
    assert_eq!(info.feature_dimension, extractor.dimension(SIDE, SIDE));

    // Unseen positions
    let positive = extractor.extract(&vertical_bar(SIDE, SIDE, 10));
    let negative = extractor.extract(&horizontal_bar(SIDE, SIDE, 10));
    assert!(svm.predict(&positive).unwrap() > 0.0);
    assert!(svm.predict(&negative).unwrap() < 0.0);
}

#[test]
fn test_orthogonal_pair() {
    let mut svm = SupportVectorMachine::new();
    svm.train(
        &[1.0, -1.0],
        &[Feature::new(vec![1.0, 0.0]), Feature::new(vec![0.0, 1.0])],
    )
    .unwrap();

    assert!(svm.predict(&Feature::new(vec![1.0, 0.0])).unwrap() > 0.0);
    assert!(svm.predict(&Feature::new(vec![0.0, 1.0])).unwrap() < 0.0);
}

#[test]
fn test_size_mismatch_keeps_previous_model() {
    let mut svm = SupportVectorMachine::new();
    let features = vec![Feature::new(vec![1.0, 0.0]), Feature::new(vec![0.0, 1.0])];
    svm.train(&[1.0, -1.0], &features).unwrap();
    let query = Feature::new(vec![0.6, 0.2]);
    let before = svm.predict(&query).unwrap();

    match svm.train(&[1.0, -1.0, 1.0], &features) {
        Err(DetectorError::SizeMismatch { labels, features }) => {
            assert_eq!((labels, features), (3, 2));
        }
        other => panic!("Expected SizeMismatch, got {other:?}"),
    }
    assert_eq!(svm.predict(&query).unwrap(), before);

    // Also on a classifier that never had a model
    let mut empty = SupportVectorMachine::new();
    assert!(empty.train(&[1.0], &features).is_err());
    assert!(!empty.is_trained());
}

#[test]
fn test_empty_classifier_reports_no_model() {
    let svm = SupportVectorMachine::new();
    let x = Feature::new(vec![0.0; 4]);

    assert!(matches!(svm.predict(&x), Err(DetectorError::NoModel)));
    assert!(matches!(
        svm.predict_batch(&[x.clone()]),
        Err(DetectorError::NoModel)
    ));
    assert!(matches!(svm.bias_term(), Err(DetectorError::NoModel)));
    assert!(matches!(svm.weights(), Err(DetectorError::NoModel)));
    assert!(matches!(
        svm.save(&mut Vec::new()),
        Err(DetectorError::NoModel)
    ));
}

#[test]
fn test_encoding_has_sentinel() {
    let feature = Feature::new(vec![0.25, 0.0, -3.5, 1.0, 7.0]);
    let row = encode_feature(&feature);

    assert_eq!(row.len(), feature.len() + 1);
    for (i, node) in row[..feature.len()].iter().enumerate() {
        assert_eq!(node.index, i as i32);
        assert_eq!(node.value, feature[i] as f64);
    }
    assert_eq!(row[feature.len()].index, SENTINEL_INDEX);
}

#[test]
fn test_batch_prediction_matches_single() {
    let extractor = HogFeatureExtractor::default();
    let svm = trained_on_bars(&extractor);
    let queries: Vec<Feature> = (0..6)
        .map(|k| extractor.extract(&vertical_bar(SIDE, SIDE, 2 * k)))
        .chain((0..6).map(|k| extractor.extract(&horizontal_bar(SIDE, SIDE, 3 * k))))
        .collect();

    let batch = svm.predict_batch(&queries).unwrap();
    assert_eq!(batch.len(), queries.len());
    for (feature, score) in queries.iter().zip(batch.iter()) {
        assert_eq!(svm.predict(feature).unwrap(), *score);
    }
}

#[test]
fn test_linear_weights_and_bias() {
    let extractor = HogFeatureExtractor::default();
    let svm = trained_on_bars(&extractor);
    let w = svm.weights().unwrap();
    let rho = svm.bias_term().unwrap();
    assert_eq!(w.len(), extractor.dimension(SIDE, SIDE));

    for x0 in [4, 9, 14] {
        let x = extractor.extract(&vertical_bar(SIDE, SIDE, x0));
        assert_relative_eq!(w.dot(&x) - rho, svm.predict(&x).unwrap(), epsilon = 1e-4);
    }
}

#[test]
fn test_save_load_reproduces_predictions() {
    let extractor = HogFeatureExtractor::default();
    let svm = trained_on_bars(&extractor);

    let mut buffer = Vec::new();
    svm.save(&mut buffer).unwrap();
    let mut loaded = SupportVectorMachine::new();
    loaded.load(Cursor::new(buffer)).unwrap();

    for x0 in 0..18 {
        let x = extractor.extract(&vertical_bar(SIDE, SIDE, x0));
        assert_eq!(loaded.predict(&x).unwrap(), svm.predict(&x).unwrap());
        let y = extractor.extract(&horizontal_bar(SIDE, SIDE, x0));
        assert_eq!(loaded.predict(&y).unwrap(), svm.predict(&y).unwrap());
    }
    assert_eq!(loaded.bias_term().unwrap(), svm.bias_term().unwrap());
}

#[test]
fn test_rbf_kernel_solves_xor() {
    let corners = [
        ([1.0f32, 1.0], 1.0),
        ([-1.0, -1.0], 1.0),
        ([1.0, -1.0], -1.0),
        ([-1.0, 1.0], -1.0),
    ];
    let features: Vec<Feature> = corners.iter().map(|(x, _)| Feature::new(x.to_vec())).collect();
    let labels: Vec<f64> = corners.iter().map(|&(_, l)| l).collect();

    let mut svm = SupportVectorMachine::with_parameter(
        SvmParameter::default()
            .with_kernel(KernelType::Rbf)
            .with_gamma(1.0)
            .with_c(10.0),
    );
    svm.train(&labels, &features).unwrap();

    for (feature, &label) in features.iter().zip(labels.iter()) {
        assert_eq!(svm.predict_label(feature).unwrap(), label);
    }
    assert_eq!(
        svm.predict_label(&Feature::new(vec![0.8, 1.2])).unwrap(),
        1.0
    );
}

#[test]
fn test_file_persistence() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("bars.svm");
    let extractor_path = temp_dir.path().join("bars.extractor.json");

    let extractor = feature::create(
        "hog",
        &ParametersMap::new().with("n_angular_bins", 9i64),
    )
    .unwrap();
    let svm = trained_on_bars(extractor.as_ref());

    file_io::save_classifier(&model_path, &svm).unwrap();
    file_io::save_extractor(&extractor_path, extractor.as_ref()).unwrap();

    let loaded_svm = SupportVectorMachine::from_file(&model_path).unwrap();
    let loaded_extractor = file_io::load_extractor(&extractor_path).unwrap();
    assert_eq!(loaded_extractor.parameters(), extractor.parameters());

    let image = vertical_bar(SIDE, SIDE, 7);
    assert_eq!(
        loaded_svm.predict(&loaded_extractor.extract(&image)).unwrap(),
        svm.predict(&extractor.extract(&image)).unwrap()
    );
}

#[test]
fn test_listing_to_classifier() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut listing = String::from("# bars\n");
    for (i, (label, image)) in bar_set().iter().enumerate() {
        let name = format!("crop_{i}.png");
        image.save(temp_dir.path().join(&name)).unwrap();
        listing.push_str(&format!("{label} {name}\n"));
    }
    let listing_path = temp_dir.path().join("train.txt");
    std::fs::write(&listing_path, listing).unwrap();

    let set = LabeledImageSet::from_listing(&listing_path).unwrap();
    assert_eq!(set.len(), bar_set().len());

    let extractor = HogFeatureExtractor::default();
    let features = extractor.extract_all(&set);
    let mut svm = SupportVectorMachine::with_parameter(SvmParameter::default().with_c(10.0));
    svm.train(set.labels(), &features).unwrap();
    assert_eq!(svm.evaluate(set.labels(), &features).unwrap().accuracy(), 1.0);
}

#[test]
fn test_detector_finds_bar() {
    let extractor = HogFeatureExtractor::default();
    let svm = trained_on_bars(&extractor);

    // Bar spanning the full height at x = 30..36
    let scene = vertical_bar(72, 48, 30);
    let detector = Detector::new()
        .with_window(SIDE, SIDE)
        .with_step(6)
        .with_scales(vec![1.0])
        .with_threshold(0.0)
        .with_nms_overlap(0.3);

    let detections = detector.detect(&scene, &extractor, &svm).unwrap();
    assert!(!detections.is_empty(), "The bar should be detected");
    for d in &detections {
        assert!(d.x < 36.0 && d.right() > 30.0, "Detection off the bar: {d:?}");
        assert!(d.response > 0.0);
    }
    for (i, a) in detections.iter().enumerate() {
        for b in &detections[i + 1..] {
            assert!(iou(a, b) <= 0.3);
        }
    }

    // Nothing to find in an empty scene
    let empty = detector
        .detect(&GrayImage::new(72, 48), &extractor, &svm)
        .unwrap();
    assert!(empty.is_empty());
}

/// Scale HOG descriptors before training and apply the same scaling at test time
#[test]
fn test_scaled_features_workflow() {
    let extractor = HogFeatureExtractor::default();
    let set = bar_set();
    let features = extractor.extract_all(&set);

    let (scaled, scaling) = fit_transform(&features, ScalingMethod::default())
        .expect("Scaling should fit");
    assert_eq!(scaling.dimension(), extractor.dimension(SIDE, SIDE));
    assert!(scaled
        .iter()
        .flat_map(|f| f.iter())
        .all(|&v| (-1.0 - 1e-6..=1.0 + 1e-6).contains(&(v as f64))));

    let mut svm = SupportVectorMachine::with_parameter(SvmParameter::default().with_c(10.0));
    svm.train(set.labels(), &scaled).expect("Training should succeed");
    let metrics = svm.evaluate(set.labels(), &scaled).expect("Evaluation");
    assert_eq!(metrics.accuracy(), 1.0);

    let positive = scaling
        .transform(&extractor.extract(&vertical_bar(SIDE, SIDE, 10)))
        .expect("Same dimension");
    let negative = scaling
        .transform(&extractor.extract(&horizontal_bar(SIDE, SIDE, 10)))
        .expect("Same dimension");
    assert!(svm.predict(&positive).unwrap() > 0.0);
    assert!(svm.predict(&negative).unwrap() < 0.0);

    // Standard scores fitted on the same data keep the classes apart too
    let standard = ScalingParams::fit(&features, ScalingMethod::StandardScore).unwrap();
    let standardized = standard.transform_all(&features).unwrap();
    let mut svm = SupportVectorMachine::with_parameter(SvmParameter::default().with_c(10.0));
    svm.train(set.labels(), &standardized).unwrap();
    assert_eq!(svm.evaluate(set.labels(), &standardized).unwrap().accuracy(), 1.0);

    // A descriptor from another window size cannot be scaled
    let wrong = extractor.extract(&vertical_bar(2 * SIDE, SIDE, 10));
    assert!(matches!(
        scaling.transform(&wrong),
        Err(DetectorError::DimensionMismatch { .. })
    ));
}
