//! Compatibility tests for image listings and stored model files

use approx::assert_relative_eq;
use hogsvm::core::{DetectorError, Feature, KernelType};
use hogsvm::{LabeledImageSet, SupportVectorMachine};
use image::{GrayImage, Luma};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, level: u8) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    GrayImage::from_pixel(8, 8, Luma([level])).save(path).unwrap();
}

fn load_model(text: &str) -> hogsvm::core::Result<SupportVectorMachine> {
    let mut svm = SupportVectorMachine::new();
    svm.load(Cursor::new(text.as_bytes()))?;
    Ok(svm)
}

const LINEAR_MODEL: &str = "svm_type c_svc
kernel_type linear
nr_class 2
total_sv 2
rho 0.25
label 1 -1
nr_sv 1 1
SV
1 0:1 1:0
-1 0:0 1:1
";

#[test]
fn test_listing_format_variations() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_image(dir, "a.png", 10);
    write_image(dir, "nested/b.png", 20);
    write_image(dir, "c.png", 30);
    write_image(dir, "d.png", 40);
    let absolute = dir.join("d.png");

    let listing = format!(
        "# comment line\n\
         \n\
         +1 a.png\n\
         -1\tnested/b.png\n\
         \x20\x20 1   c.png  \n\
         -1 {}\n",
        absolute.display()
    );
    let set = LabeledImageSet::from_reader(Cursor::new(listing), dir).unwrap();

    assert_eq!(set.len(), 4);
    assert_eq!(set.labels(), &[1.0, -1.0, 1.0, -1.0]);
    let levels: Vec<u8> = set.images().iter().map(|img| img.get_pixel(0, 0)[0]).collect();
    assert_eq!(levels, vec![10, 20, 30, 40]);
}

#[test]
fn test_listing_with_zero_one_labels() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_image(dir, "p.png", 255);
    write_image(dir, "n.png", 0);

    let set = LabeledImageSet::from_reader(Cursor::new("1 p.png\n0 n.png\n"), dir).unwrap();
    let features = vec![Feature::new(vec![1.0, 0.0]), Feature::new(vec![0.0, 1.0])];

    let mut svm = SupportVectorMachine::new();
    svm.train(set.labels(), &features).unwrap();
    assert_eq!(svm.info().unwrap().labels, [1.0, 0.0]);
    assert_eq!(svm.predict_label(&features[0]).unwrap(), 1.0);
    assert_eq!(svm.predict_label(&features[1]).unwrap(), 0.0);
}

#[test]
fn test_malformed_listing_handling() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_image(dir, "ok.png", 0);

    let cases = [
        "1\n",
        "positive ok.png\n",
        "1 ok.png\nbad\n",
    ];
    for listing in cases {
        assert!(
            matches!(
                LabeledImageSet::from_reader(Cursor::new(listing), dir),
                Err(DetectorError::ParseError(_))
            ),
            "{listing:?} should not parse"
        );
    }

    assert!(LabeledImageSet::from_reader(Cursor::new("1 missing.png\n"), dir).is_err());
    assert!(matches!(
        LabeledImageSet::from_reader(Cursor::new("# nothing\n\n"), dir),
        Err(DetectorError::EmptyDataset)
    ));
}

#[test]
fn test_hand_written_linear_model() {
    let svm = load_model(LINEAR_MODEL).unwrap();

    assert_eq!(svm.feature_dimension(), 2);
    assert_eq!(svm.bias_term().unwrap(), 0.25);
    let x = Feature::new(vec![2.0, 0.5]);
    assert_relative_eq!(svm.predict(&x).unwrap(), 2.0 - 0.5 - 0.25);

    let w = svm.weights().unwrap();
    assert_eq!(&w[..], &[1.0, -1.0]);
}

#[test]
fn test_sparse_rbf_model() {
    // Support vectors omit zero entries
    let text = "svm_type c_svc
kernel_type rbf
gamma 0.5
nr_class 2
total_sv 2
rho 0
label 1 -1
nr_sv 1 1
SV
1 0:1
-1 2:1
";
    let svm = load_model(text).unwrap();
    assert_eq!(svm.info().unwrap().kernel_type, KernelType::Rbf);
    assert_eq!(svm.feature_dimension(), 3);

    let x = Feature::new(vec![1.0, 0.0, 0.0]);
    // |x - sv0|^2 = 0, |x - sv1|^2 = 2
    let expected = 1.0 - (-0.5f64 * 2.0).exp();
    assert_relative_eq!(svm.predict(&x).unwrap(), expected, epsilon = 1e-12);

    // Trailing entries beyond the stored indices are part of a valid input
    let wider = Feature::new(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
    assert_relative_eq!(svm.predict(&wider).unwrap(), expected, epsilon = 1e-12);
    assert!(svm.predict(&Feature::new(vec![1.0, 0.0])).is_err());
}

#[test]
fn test_model_with_probability_section() {
    let text = LINEAR_MODEL.replace("label 1 -1\n", "label 1 -1\nprobA -2\nprobB 0\n");
    let svm = load_model(&text).unwrap();
    assert!(svm.info().unwrap().probability);

    // Decision value 1.0 for this point
    let x = Feature::new(vec![1.25, 0.0]);
    let p = svm.predict_probability(&x).unwrap();
    assert_relative_eq!(p, 1.0 / (1.0 + (-2.0f64).exp()), epsilon = 1e-12);

    let plain = load_model(LINEAR_MODEL).unwrap();
    assert!(plain.predict_probability(&x).is_err());
}

#[test]
fn test_saved_model_is_stable_text() {
    let svm = load_model(LINEAR_MODEL).unwrap();
    let mut buffer = Vec::new();
    svm.save(&mut buffer).unwrap();
    assert_eq!(String::from_utf8(buffer).unwrap(), LINEAR_MODEL);
}

#[test]
fn test_corrupt_model_handling() {
    let cases = [
        ("no SV marker", LINEAR_MODEL.replace("SV\n", "")),
        ("unknown key", LINEAR_MODEL.replace("rho", "offset")),
        ("multi-class", LINEAR_MODEL.replace("nr_class 2", "nr_class 3")),
        ("sv count", LINEAR_MODEL.replace("total_sv 2", "total_sv 3")),
        ("nr_sv sum", LINEAR_MODEL.replace("nr_sv 1 1", "nr_sv 2 1")),
        ("bad kernel", LINEAR_MODEL.replace("linear", "laplacian")),
        ("bad node", LINEAR_MODEL.replace("0:1 1:0", "0:1 1-0")),
        ("decreasing index", LINEAR_MODEL.replace("0:1 1:0", "1:0 0:1")),
        (
            "lone probA",
            LINEAR_MODEL.replace("label 1 -1\n", "label 1 -1\nprobA -1\n"),
        ),
        ("other svm type", LINEAR_MODEL.replace("c_svc", "one_class")),
        (
            "nr_sv overflow",
            LINEAR_MODEL.replace("nr_sv 1 1", "nr_sv 18446744073709551615 1"),
        ),
        (
            "huge total_sv",
            LINEAR_MODEL
                .replace("total_sv 2", "total_sv 4611686018427387904")
                .replace("nr_sv 1 1", "nr_sv 4611686018427387904 0"),
        ),
        ("huge index", LINEAR_MODEL.replace("1:0\n", "2147483647:0\n")),
    ];

    for (what, text) in cases {
        let mut svm = load_model(LINEAR_MODEL).unwrap();
        let result = svm.load(Cursor::new(text.as_bytes()));
        assert!(
            matches!(result, Err(DetectorError::CorruptModel(_))),
            "{what}: expected CorruptModel, got {result:?}"
        );
        // A failed load leaves the classifier empty
        assert!(!svm.is_trained(), "{what}");
    }
}

#[test]
fn test_non_utf8_model_is_corrupt() {
    let mut bytes = LINEAR_MODEL.as_bytes().to_vec();
    bytes.splice(0..0, b"\xff\xfe\n".iter().copied());

    let mut svm = SupportVectorMachine::new();
    let result = svm.load(Cursor::new(bytes));
    assert!(
        matches!(result, Err(DetectorError::CorruptModel(_))),
        "got {result:?}"
    );
}
