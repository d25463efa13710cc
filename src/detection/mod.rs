//! Sliding-window detection
//!
//! A fixed-size window slides over every level of an image pyramid. Each
//! window is described by a [`FeatureExtractor`] and scored by a
//! [`Classifier`]; windows scoring above the threshold are mapped back to
//! the coordinates of the original image and pruned with non-maximum
//! suppression.

pub mod nms;

pub use self::nms::*;

use crate::core::{Classifier, DetectorError, Result};
use crate::feature::FeatureExtractor;
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// A scored box in original image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Classifier decision value of the window
    pub response: f64,
}

impl Detection {
    pub fn new(x: f64, y: f64, width: f64, height: f64, response: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            response,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Sliding-window settings
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    pub window_width: u32,
    pub window_height: u32,
    /// Window stride in pixels of the pyramid level
    pub step: u32,
    /// Pyramid levels as factors of the original size
    pub scales: Vec<f64>,
    /// Minimum decision value of a kept window
    pub threshold: f64,
    /// IoU above which the weaker of two boxes is suppressed
    pub nms_overlap: f64,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            window_width: 48,
            window_height: 96,
            step: 6,
            scales: vec![1.0, 0.8, 0.64, 0.512],
            threshold: 0.0,
            nms_overlap: 0.5,
        }
    }
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    pub fn with_scales(mut self, scales: Vec<f64>) -> Self {
        self.scales = scales;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_nms_overlap(mut self, nms_overlap: f64) -> Self {
        self.nms_overlap = nms_overlap;
        self
    }

    /// Validate the settings
    pub fn check(&self) -> Result<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(DetectorError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }
        if self.step == 0 {
            return Err(DetectorError::InvalidParameter(
                "Window step must be positive".to_string(),
            ));
        }
        if self.scales.is_empty() || self.scales.iter().any(|&s| !(s > 0.0)) {
            return Err(DetectorError::InvalidParameter(format!(
                "Scales must be positive, got {:?}",
                self.scales
            )));
        }
        if !(0.0..=1.0).contains(&self.nms_overlap) {
            return Err(DetectorError::InvalidParameter(format!(
                "nms_overlap must lie in [0, 1], got {}",
                self.nms_overlap
            )));
        }
        Ok(())
    }

    /// Resized copies of `image`, one per scale, paired with their scale
    pub fn pyramid(&self, image: &GrayImage) -> Vec<(f64, GrayImage)> {
        self.scales
            .iter()
            .filter_map(|&scale| {
                let width = (image.width() as f64 * scale).round() as u32;
                let height = (image.height() as f64 * scale).round() as u32;
                if width < self.window_width || height < self.window_height {
                    return None;
                }
                let level = if width == image.width() && height == image.height() {
                    image.clone()
                } else {
                    imageops::resize(image, width, height, FilterType::Triangle)
                };
                Some((scale, level))
            })
            .collect()
    }

    /// Scored windows of one pyramid level above the threshold, in level
    /// coordinates
    fn scan_level(
        &self,
        level: &GrayImage,
        extractor: &dyn FeatureExtractor,
        classifier: &dyn Classifier,
    ) -> Result<Vec<Detection>> {
        let mut origins = Vec::new();
        let mut features = Vec::new();
        for y in (0..=level.height() - self.window_height).step_by(self.step as usize) {
            for x in (0..=level.width() - self.window_width).step_by(self.step as usize) {
                let window =
                    imageops::crop_imm(level, x, y, self.window_width, self.window_height)
                        .to_image();
                origins.push((x, y));
                features.push(extractor.extract(&window));
            }
        }

        let responses = classifier.predict_batch(&features)?;
        Ok(origins
            .into_iter()
            .zip(responses)
            .filter(|&(_, response)| response > self.threshold)
            .map(|((x, y), response)| {
                Detection::new(
                    x as f64,
                    y as f64,
                    self.window_width as f64,
                    self.window_height as f64,
                    response,
                )
            })
            .collect())
    }

    /// Run the detector over `image`
    pub fn detect(
        &self,
        image: &GrayImage,
        extractor: &dyn FeatureExtractor,
        classifier: &dyn Classifier,
    ) -> Result<Vec<Detection>> {
        self.check()?;

        let mut candidates = Vec::new();
        for (scale, level) in self.pyramid(image) {
            let found = self.scan_level(&level, extractor, classifier)?;
            debug!(
                "Scale {scale}: {} windows above threshold on a {}x{} level",
                found.len(),
                level.width(),
                level.height()
            );
            candidates.extend(found.into_iter().map(|d| {
                Detection::new(
                    d.x / scale,
                    d.y / scale,
                    d.width / scale,
                    d.height / scale,
                    d.response,
                )
            }));
        }

        let detections = non_maximum_suppression(&candidates, self.nms_overlap);
        info!(
            "{} detections ({} candidates before suppression)",
            detections.len(),
            candidates.len()
        );
        Ok(detections)
    }
}

/// Color copy of `image` with a rectangle around every detection
pub fn draw_detections(image: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });
    for d in detections {
        let width = d.width.round().max(1.0) as u32;
        let height = d.height.round().max(1.0) as u32;
        let rect = Rect::at(d.x.round() as i32, d.y.round() as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut canvas, rect, Rgb([255, 0, 0]));
    }
    canvas
}
