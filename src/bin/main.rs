//! hogsvm Command Line Interface
//!
//! Train a detector from a listing of labeled crops, score images, run the
//! sliding-window detector and inspect stored models.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use hogsvm::core::{DetectorError, KernelType, Result, SvmParameter};
use hogsvm::detection::{draw_detections, Detector};
use hogsvm::feature::{self, FeatureExtractor, HogFeatureExtractor, ParametersMap};
use hogsvm::file_io;
use hogsvm::utils::validation::check_label_balance;
use hogsvm::{LabeledImageSet, SupportVectorMachine};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "hogsvm")]
#[command(about = "HOG + SVM sliding-window object detection")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hogsvm contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a classifier on a listing of labeled images
    Train(TrainArgs),
    /// Score the images of a listing with a trained classifier
    Predict(PredictArgs),
    /// Run the sliding-window detector over an image
    Detect(DetectArgs),
    /// Display model information
    Info(InfoArgs),
    /// Draw the HOG glyphs of an image
    Render(RenderArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
}

impl From<CliKernel> for KernelType {
    fn from(kernel: CliKernel) -> Self {
        match kernel {
            CliKernel::Linear => KernelType::Linear,
            CliKernel::Polynomial => KernelType::Polynomial,
            CliKernel::Rbf => KernelType::Rbf,
            CliKernel::Sigmoid => KernelType::Sigmoid,
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Listing file of `<label> <image path>` lines
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Output extractor settings (default: next to the model)
    #[arg(long)]
    extractor: Option<PathBuf>,

    /// Extractor setting as key=value, repeatable (e.g. cell_size=8)
    #[arg(long = "feature-param", value_name = "KEY=VALUE")]
    feature_params: Vec<String>,

    /// Kernel function
    #[arg(short, long, value_enum, default_value = "linear")]
    kernel: CliKernel,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Convergence tolerance
    #[arg(short, long, default_value = "0.001")]
    epsilon: f64,

    /// Kernel width; 0 means 1 / feature dimension
    #[arg(long, default_value = "0.0")]
    gamma: f64,

    /// Polynomial degree
    #[arg(long, default_value = "3")]
    degree: u32,

    /// Polynomial and sigmoid offset
    #[arg(long, default_value = "0.0")]
    coef0: f64,

    /// Maximum solver passes
    #[arg(short, long, default_value = "10000")]
    max_iterations: usize,

    /// Kernel cache size in MB
    #[arg(long, default_value = "100")]
    cache_size: usize,

    /// Disable the shrinking heuristic
    #[arg(long)]
    no_shrinking: bool,

    /// Fit probability estimates
    #[arg(long)]
    probability: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Extractor settings (default: next to the model)
    #[arg(long)]
    extractor: Option<PathBuf>,

    /// Listing file of `<label> <image path>` lines
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show probability estimates
    #[arg(long)]
    probability: bool,
}

#[derive(Args)]
struct DetectArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Extractor settings (default: next to the model)
    #[arg(long)]
    extractor: Option<PathBuf>,

    /// Image to search
    #[arg(long)]
    image: PathBuf,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, default_value = "48x96", value_parser = parse_size)]
    window: (u32, u32),

    /// Window stride in pixels
    #[arg(long, default_value = "6")]
    step: u32,

    /// Pyramid scales
    #[arg(long, value_delimiter = ',', default_value = "1.0,0.8,0.64,0.512")]
    scales: Vec<f64>,

    /// Minimum decision value
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    threshold: f64,

    /// IoU above which overlapping boxes are suppressed
    #[arg(long, default_value = "0.5")]
    nms_overlap: f64,

    /// Detections report (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Copy of the image with detections drawn
    #[arg(long)]
    annotated: Option<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

#[derive(Args)]
struct RenderArgs {
    /// Image to describe
    #[arg(long)]
    image: PathBuf,

    /// Output glyph image
    #[arg(short, long)]
    output: PathBuf,

    /// Extractor setting as key=value, repeatable
    #[arg(long = "feature-param", value_name = "KEY=VALUE")]
    feature_params: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Detect(args) => detect_command(args),
        Commands::Info(args) => info_command(args),
        Commands::Render(args) => render_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training classifier from {:?}", args.data);

    let params = parse_feature_params(&args.feature_params)?;
    let extractor = feature::create_from_params(&params)?;
    info!(
        "Feature extractor: {} {}",
        extractor.feature_type(),
        extractor.parameters()
    );

    let set = LabeledImageSet::from_listing(&args.data)?;
    let (positives, negatives, ratio) = check_label_balance(set.labels());
    info!("{positives} positive and {negatives} negative images");
    if !(0.1..=10.0).contains(&ratio) {
        warn!("Unbalanced training set: {positives} positives for {negatives} negatives");
    }

    let features = extractor.extract_all(&set);

    let param = SvmParameter::default()
        .with_kernel(args.kernel.into())
        .with_c(args.c)
        .with_eps(args.epsilon)
        .with_gamma(args.gamma)
        .with_degree(args.degree)
        .with_coef0(args.coef0)
        .with_max_iterations(args.max_iterations)
        .with_cache_size(args.cache_size)
        .with_shrinking(!args.no_shrinking)
        .with_probability(args.probability);

    let mut svm = SupportVectorMachine::with_parameter(param);
    svm.train(set.labels(), &features)?;

    let model_info = svm.info()?;
    info!("Support vectors: {}", model_info.n_support_vectors);
    info!("Bias: {:.6}", model_info.bias);

    file_io::save_classifier(&args.output, &svm)?;
    let extractor_file = args
        .extractor
        .unwrap_or_else(|| extractor_path(&args.output));
    file_io::save_extractor(&extractor_file, extractor.as_ref())?;
    info!("Extractor settings saved to {extractor_file:?}");

    let metrics = svm.evaluate(set.labels(), &features)?;
    println!("Model saved to: {}", args.output.display());
    println!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let svm = SupportVectorMachine::from_file(&args.model)?;
    let extractor = load_extractor_for(&args.model, args.extractor.as_deref())?;

    let set = LabeledImageSet::from_listing(&args.data)?;
    let features = extractor.extract_all(&set);
    info!("Scoring {} images", features.len());

    let scores = svm.predict_batch(&features)?;
    let mut lines = Vec::with_capacity(scores.len() + 2);
    lines.push(format!("# Predictions for {} images", scores.len()));
    lines.push(format!(
        "# Format: index label score{}",
        if args.probability { " probability" } else { "" }
    ));
    for (i, (feature, score)) in features.iter().zip(scores.iter()).enumerate() {
        let label = svm.predict_label(feature)?;
        if args.probability {
            let probability = svm.predict_probability(feature)?;
            lines.push(format!("{i} {label} {score:.6} {probability:.6}"));
        } else {
            lines.push(format!("{i} {label} {score:.6}"));
        }
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, lines.join("\n") + "\n")?;
            info!("Predictions saved to: {path:?}");
        }
        None => {
            for line in &lines {
                println!("{line}");
            }
        }
    }

    let metrics = svm.evaluate(set.labels(), &features)?;
    println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
    println!("Precision: {:.4}", metrics.precision());
    println!("Recall: {:.4}", metrics.recall());
    println!("F1 Score: {:.4}", metrics.f1_score());

    Ok(())
}

fn detect_command(args: DetectArgs) -> Result<()> {
    let svm = SupportVectorMachine::from_file(&args.model)?;
    let extractor = load_extractor_for(&args.model, args.extractor.as_deref())?;
    let image = image::open(&args.image)?.to_luma8();

    let detector = Detector::new()
        .with_window(args.window.0, args.window.1)
        .with_step(args.step)
        .with_scales(args.scales.clone())
        .with_threshold(args.threshold)
        .with_nms_overlap(args.nms_overlap);

    let expected = extractor.dimension(detector.window_width, detector.window_height);
    if expected != svm.feature_dimension() {
        return Err(DetectorError::DimensionMismatch {
            expected: svm.feature_dimension(),
            actual: expected,
        });
    }

    let detections = detector.detect(&image, extractor.as_ref(), &svm)?;

    println!("# {} detections", detections.len());
    println!("# Format: x y width height response");
    for d in &detections {
        println!(
            "{:.1} {:.1} {:.1} {:.1} {:.6}",
            d.x, d.y, d.width, d.height, d.response
        );
    }

    if let Some(path) = &args.output {
        file_io::save_detections(path, &detections)?;
    }
    if let Some(path) = &args.annotated {
        draw_detections(&image, &detections).save(path)?;
        info!("Annotated image saved to {path:?}");
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let svm = SupportVectorMachine::from_file(&args.model)?;
    let model_info = svm.info()?;

    println!("=== SVM Model Summary ===");
    println!("Kernel Type: {}", model_info.kernel_type);
    println!("Feature Dimension: {}", model_info.feature_dimension);
    println!("Support Vectors: {}", model_info.n_support_vectors);
    println!(
        "  label {}: {}",
        model_info.labels[0], model_info.n_sv_per_class[0]
    );
    println!(
        "  label {}: {}",
        model_info.labels[1], model_info.n_sv_per_class[1]
    );
    println!("Bias: {:.6}", model_info.bias);
    println!("Probability Estimates: {}", model_info.probability);

    if model_info.kernel_type == KernelType::Linear {
        let weights = svm.weights()?;
        let norm = weights.dot(&weights).sqrt();
        println!("Weight Norm: {norm:.6}");
    }

    Ok(())
}

fn render_command(args: RenderArgs) -> Result<()> {
    let params = parse_feature_params(&args.feature_params)?;
    let hog = HogFeatureExtractor::new(&params)?;
    let image = image::open(&args.image)?.to_luma8();

    let feature = hog.extract(&image);
    let (cells_x, cells_y) = hog.cell_grid(image.width(), image.height());
    hog.render(&feature, cells_x, cells_y)?.save(&args.output)?;
    println!("HOG glyphs saved to: {}", args.output.display());

    Ok(())
}

fn parse_feature_params(assignments: &[String]) -> Result<ParametersMap> {
    let mut params = ParametersMap::new();
    for assignment in assignments {
        params.set_assignment(assignment)?;
    }
    Ok(params)
}

/// Default location of the extractor settings stored with a model
fn extractor_path(model: &Path) -> PathBuf {
    model.with_extension("extractor.json")
}

fn load_extractor_for(model: &Path, explicit: Option<&Path>) -> Result<Box<dyn FeatureExtractor>> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| extractor_path(model));
    if explicit.is_none() && !path.exists() {
        warn!("No extractor settings at {path:?}, using default HOG settings");
        return feature::create_from_params(&ParametersMap::new());
    }
    file_io::load_extractor(&path)
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let w = w.parse::<u32>().map_err(|e| format!("invalid width {w}: {e}"))?;
    let h = h.parse::<u32>().map_err(|e| format!("invalid height {h}: {e}"))?;
    Ok((w, h))
}
