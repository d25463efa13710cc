//! Labeled image sets
//!
//! A listing file names one image per line, preceded by its label:
//!
//! ```text
//! # pedestrians
//! 1 pos/crop_001.png
//! -1 neg/background_017.png
//! ```
//!
//! Relative paths are resolved against the directory holding the listing.

use crate::core::{DetectorError, Result};
use image::GrayImage;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Ordered `(label, image)` pairs
#[derive(Debug, Clone, Default)]
pub struct LabeledImageSet {
    labels: Vec<f64>,
    images: Vec<GrayImage>,
}

impl LabeledImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: f64, image: GrayImage) {
        self.labels.push(label);
        self.images.push(image);
    }

    /// Load every image named by a listing file
    pub fn from_listing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let reader = BufReader::new(File::open(path)?);
        let set = Self::from_reader(reader, base_dir)?;
        info!("Loaded {} images from {}", set.len(), path.display());
        Ok(set)
    }

    /// Load every image named by listing lines read from `reader`
    pub fn from_reader<R: BufRead>(reader: R, base_dir: &Path) -> Result<Self> {
        let mut set = Self::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, relative) = Self::parse_line(line).map_err(|e| {
                DetectorError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            let image = image::open(base_dir.join(relative))?.to_luma8();
            set.push(label, image);
        }

        if set.is_empty() {
            return Err(DetectorError::EmptyDataset);
        }
        Ok(set)
    }

    /// Parse a `<label> <path>` listing line
    fn parse_line(line: &str) -> Result<(f64, PathBuf)> {
        let (label, path) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| DetectorError::ParseError(format!("Missing image path: {line}")))?;

        let label = label
            .parse::<f64>()
            .map_err(|_| DetectorError::ParseError(format!("Invalid label: {label}")))?;

        let path = path.trim();
        if path.is_empty() {
            return Err(DetectorError::ParseError(format!(
                "Missing image path: {line}"
            )));
        }

        Ok((label, PathBuf::from(path)))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn images(&self) -> &[GrayImage] {
        &self.images
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &GrayImage)> + '_ {
        self.labels.iter().copied().zip(self.images.iter())
    }
}
