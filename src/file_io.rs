//! File wrappers around classifier, extractor and detection persistence

use crate::api::SupportVectorMachine;
use crate::core::Result;
use crate::detection::Detection;
use crate::feature::{self, FeatureExtractor};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write the classifier's model to `path`
pub fn save_classifier<P: AsRef<Path>>(path: P, svm: &SupportVectorMachine) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    svm.save(&mut writer)?;
    writer.flush()?;
    info!("Saved classifier to {}", path.display());
    Ok(())
}

/// Replace the classifier's model with the one stored at `path`
pub fn load_classifier<P: AsRef<Path>>(path: P, svm: &mut SupportVectorMachine) -> Result<()> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    svm.load(reader)?;
    info!("Loaded classifier from {}", path.display());
    Ok(())
}

/// Write the extractor's type and settings to `path` as JSON
pub fn save_extractor<P: AsRef<Path>>(path: P, extractor: &dyn FeatureExtractor) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    feature::save(&mut writer, extractor)?;
    writer.flush()?;
    Ok(())
}

pub fn load_extractor<P: AsRef<Path>>(path: P) -> Result<Box<dyn FeatureExtractor>> {
    let reader = BufReader::new(File::open(path)?);
    feature::load(reader)
}

/// Detections of one run with the time they were written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub created_at: DateTime<Utc>,
    pub count: usize,
    pub detections: Vec<Detection>,
}

impl DetectionReport {
    pub fn new(detections: &[Detection]) -> Self {
        Self {
            created_at: Utc::now(),
            count: detections.len(),
            detections: detections.to_vec(),
        }
    }
}

/// Write `detections` to `path` as a JSON report
pub fn save_detections<P: AsRef<Path>>(path: P, detections: &[Detection]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &DetectionReport::new(detections))?;
    writer.flush()?;
    info!("Saved {} detections to {}", detections.len(), path.display());
    Ok(())
}

/// Read a report written by [`save_detections`]
pub fn load_detections<P: AsRef<Path>>(path: P) -> Result<DetectionReport> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
