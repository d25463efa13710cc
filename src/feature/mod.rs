//! Feature extractors
//!
//! Extractors are created by name from a [`ParametersMap`], and can be
//! stored as JSON so a detector is rebuilt with the settings it was trained
//! with.

pub mod hog;
pub mod params;

pub use self::hog::HogFeatureExtractor;
pub use self::params::*;

use crate::core::{DetectorError, Feature, FeatureCollection, Result};
use crate::data::LabeledImageSet;
use image::GrayImage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Key naming the extractor variant inside a [`ParametersMap`]
pub const KEY_FEATURE_TYPE: &str = "feature_type";

pub const DEFAULT_FEATURE_TYPE: &str = hog::FEATURE_TYPE;

/// Turns a grayscale image into a fixed-length descriptor
pub trait FeatureExtractor: Send + Sync + fmt::Debug {
    /// Variant name understood by [`create`]
    fn feature_type(&self) -> &'static str;

    /// Settings that rebuild this extractor through [`create`]
    fn parameters(&self) -> ParametersMap;

    fn extract(&self, image: &GrayImage) -> Feature;

    /// Descriptor length for an image of the given size
    fn dimension(&self, width: u32, height: u32) -> usize;

    /// Ratio of descriptor resolution to image resolution
    fn scale_factor(&self) -> f64;

    /// One descriptor per image of the set, in order
    fn extract_all(&self, set: &LabeledImageSet) -> FeatureCollection {
        debug!("Extracting {} features from {} images", self.feature_type(), set.len());
        set.images().iter().map(|image| self.extract(image)).collect()
    }

    /// One descriptor per pyramid level
    fn extract_pyramid(&self, levels: &[GrayImage]) -> FeatureCollection {
        levels.iter().map(|image| self.extract(image)).collect()
    }
}

/// Build the extractor named `feature_type`
pub fn create(feature_type: &str, params: &ParametersMap) -> Result<Box<dyn FeatureExtractor>> {
    match feature_type {
        hog::FEATURE_TYPE => Ok(Box::new(HogFeatureExtractor::new(params)?)),
        other => Err(DetectorError::InvalidParameter(format!(
            "Unknown feature type: {other}"
        ))),
    }
}

/// Build the extractor named by the `feature_type` key (default `hog`)
pub fn create_from_params(params: &ParametersMap) -> Result<Box<dyn FeatureExtractor>> {
    let feature_type = params.get_text(KEY_FEATURE_TYPE, DEFAULT_FEATURE_TYPE)?;
    let mut settings = params.clone();
    settings.remove(KEY_FEATURE_TYPE);
    create(&feature_type, &settings)
}

/// Default settings of the extractor named `feature_type`
pub fn default_parameters(feature_type: &str) -> Result<ParametersMap> {
    match feature_type {
        hog::FEATURE_TYPE => Ok(HogFeatureExtractor::default_parameters()),
        other => Err(DetectorError::InvalidParameter(format!(
            "Unknown feature type: {other}"
        ))),
    }
}

#[derive(Serialize, Deserialize)]
struct StoredExtractor {
    feature_type: String,
    parameters: ParametersMap,
}

/// Write the variant name and settings of `extractor` as JSON
pub fn save<W: Write>(writer: W, extractor: &dyn FeatureExtractor) -> Result<()> {
    let stored = StoredExtractor {
        feature_type: extractor.feature_type().to_string(),
        parameters: extractor.parameters(),
    };
    serde_json::to_writer_pretty(writer, &stored)?;
    Ok(())
}

/// Rebuild an extractor written by [`save`]
pub fn load<R: Read>(reader: R) -> Result<Box<dyn FeatureExtractor>> {
    let stored: StoredExtractor = serde_json::from_reader(reader)?;
    create(&stored.feature_type, &stored.parameters)
}
