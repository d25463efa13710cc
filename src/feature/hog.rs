//! Histogram of oriented gradients
//!
//! The image is split into square cells. Each cell collects a histogram of
//! gradient orientations weighted by gradient magnitude, with every sample
//! split linearly between its two nearest bins. A cell is then normalized
//! together with the 2x2 block of cells anchored at it (L2, clipped at
//! [`CLIP_THRESHOLD`], L2 again) and only its own part of the block is kept,
//! so the descriptor holds exactly one histogram per cell:
//!
//! ```text
//! feature[(cell_y * cells_x + cell_x) * n_bins + bin]
//! ```

use super::{FeatureExtractor, ParametersMap};
use crate::core::{DetectorError, Feature, Result};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use std::f32::consts::PI;

pub const FEATURE_TYPE: &str = "hog";

pub const KEY_N_ANGULAR_BINS: &str = "n_angular_bins";
pub const KEY_UNSIGNED_GRADIENTS: &str = "unsigned_gradients";
pub const KEY_CELL_SIZE: &str = "cell_size";

const KEYS: &[&str] = &[KEY_N_ANGULAR_BINS, KEY_UNSIGNED_GRADIENTS, KEY_CELL_SIZE];

pub const DEFAULT_N_ANGULAR_BINS: u32 = 18;
pub const DEFAULT_UNSIGNED_GRADIENTS: bool = true;
pub const DEFAULT_CELL_SIZE: u32 = 6;

/// Upper bound on a normalized block entry before renormalization
pub const CLIP_THRESHOLD: f32 = 0.2;

const NORM_EPS: f32 = 1e-6;

/// Side of one rendered cell glyph, in pixels
pub const GLYPH_SIZE: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct HogFeatureExtractor {
    n_angular_bins: u32,
    unsigned_gradients: bool,
    cell_size: u32,
}

impl Default for HogFeatureExtractor {
    fn default() -> Self {
        Self {
            n_angular_bins: DEFAULT_N_ANGULAR_BINS,
            unsigned_gradients: DEFAULT_UNSIGNED_GRADIENTS,
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl HogFeatureExtractor {
    /// Build from settings; missing keys take their defaults
    pub fn new(params: &ParametersMap) -> Result<Self> {
        params.check_keys(KEYS)?;

        let n_angular_bins = positive_u32(
            KEY_N_ANGULAR_BINS,
            params.get_int(KEY_N_ANGULAR_BINS, DEFAULT_N_ANGULAR_BINS as i64)?,
        )?;
        let unsigned_gradients =
            params.get_bool(KEY_UNSIGNED_GRADIENTS, DEFAULT_UNSIGNED_GRADIENTS)?;
        let cell_size = positive_u32(
            KEY_CELL_SIZE,
            params.get_int(KEY_CELL_SIZE, DEFAULT_CELL_SIZE as i64)?,
        )?;

        Ok(Self {
            n_angular_bins,
            unsigned_gradients,
            cell_size,
        })
    }

    pub fn default_parameters() -> ParametersMap {
        Self::default().parameters()
    }

    pub fn n_angular_bins(&self) -> u32 {
        self.n_angular_bins
    }

    pub fn unsigned_gradients(&self) -> bool {
        self.unsigned_gradients
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Number of cells along x and y for an image of the given size
    pub fn cell_grid(&self, width: u32, height: u32) -> (usize, usize) {
        (
            (width / self.cell_size) as usize,
            (height / self.cell_size) as usize,
        )
    }

    /// Angular range covered by the histogram
    fn orientation_range(&self) -> f32 {
        if self.unsigned_gradients {
            PI
        } else {
            2.0 * PI
        }
    }

    /// Raw magnitude-weighted histograms, one per cell
    fn cell_histograms(&self, image: &GrayImage, cells_x: usize, cells_y: usize) -> Vec<f32> {
        let n_bins = self.n_angular_bins as usize;
        let cell = self.cell_size as usize;
        let range = self.orientation_range();
        let bin_width = range / n_bins as f32;

        let gx = horizontal_sobel(image);
        let gy = vertical_sobel(image);

        let mut histograms = vec![0.0f32; cells_x * cells_y * n_bins];
        for y in 0..cells_y * cell {
            for x in 0..cells_x * cell {
                let dx = gx.get_pixel(x as u32, y as u32)[0] as f32;
                let dy = gy.get_pixel(x as u32, y as u32)[0] as f32;
                let magnitude = dx.hypot(dy);
                if magnitude == 0.0 {
                    continue;
                }

                let mut angle = dy.atan2(dx);
                if angle < 0.0 {
                    angle += range;
                }
                if angle >= range {
                    angle -= range;
                }

                // Bin centers sit at (b + 0.5) * bin_width; the histogram wraps
                let position = angle / bin_width - 0.5;
                let lower = position.floor();
                let frac = position - lower;
                let b0 = (lower as i64).rem_euclid(n_bins as i64) as usize;
                let b1 = (b0 + 1) % n_bins;

                let base = ((y / cell) * cells_x + x / cell) * n_bins;
                histograms[base + b0] += magnitude * (1.0 - frac);
                histograms[base + b1] += magnitude * frac;
            }
        }
        histograms
    }

    /// Normalize each cell over the 2x2 block anchored at it
    fn normalize(&self, histograms: &[f32], cells_x: usize, cells_y: usize) -> Vec<f32> {
        let n_bins = self.n_angular_bins as usize;
        let mut out = vec![0.0f32; histograms.len()];

        for cy in 0..cells_y {
            for cx in 0..cells_x {
                let mut block: Vec<usize> = Vec::with_capacity(4);
                for by in cy..(cy + 2).min(cells_y) {
                    for bx in cx..(cx + 2).min(cells_x) {
                        block.push((by * cells_x + bx) * n_bins);
                    }
                }

                let energy: f32 = block
                    .iter()
                    .flat_map(|&base| &histograms[base..base + n_bins])
                    .map(|v| v * v)
                    .sum();
                let norm = (energy + NORM_EPS).sqrt();

                let clipped_energy: f32 = block
                    .iter()
                    .flat_map(|&base| &histograms[base..base + n_bins])
                    .map(|v| (v / norm).min(CLIP_THRESHOLD).powi(2))
                    .sum();
                let renorm = (clipped_energy + NORM_EPS).sqrt();

                let base = (cy * cells_x + cx) * n_bins;
                for bin in 0..n_bins {
                    out[base + bin] = (histograms[base + bin] / norm).min(CLIP_THRESHOLD) / renorm;
                }
            }
        }
        out
    }

    /// Draw one glyph per cell: a line per orientation bin, perpendicular to
    /// the gradient direction, brighter for heavier bins
    pub fn render(&self, feature: &Feature, cells_x: usize, cells_y: usize) -> Result<GrayImage> {
        let n_bins = self.n_angular_bins as usize;
        let expected = cells_x * cells_y * n_bins;
        if feature.len() != expected {
            return Err(DetectorError::DimensionMismatch {
                expected,
                actual: feature.len(),
            });
        }

        let mut canvas = GrayImage::new(cells_x as u32 * GLYPH_SIZE, cells_y as u32 * GLYPH_SIZE);
        let max_weight = feature.iter().copied().fold(0.0f32, f32::max);
        if max_weight <= 0.0 {
            return Ok(canvas);
        }

        let bin_width = self.orientation_range() / n_bins as f32;
        let half = GLYPH_SIZE as f32 / 2.0;

        for cy in 0..cells_y {
            for cx in 0..cells_x {
                let base = (cy * cells_x + cx) * n_bins;
                let center_x = cx as f32 * GLYPH_SIZE as f32 + half;
                let center_y = cy as f32 * GLYPH_SIZE as f32 + half;

                // Light bins first so the dominant orientations end up on top
                let mut bins: Vec<usize> = (0..n_bins).collect();
                bins.sort_by(|&a, &b| feature[base + a].total_cmp(&feature[base + b]));

                for bin in bins {
                    let weight = feature[base + bin];
                    if weight <= 0.0 {
                        continue;
                    }
                    let edge = (bin as f32 + 0.5) * bin_width + PI / 2.0;
                    let (dx, dy) = (edge.cos() * (half - 1.0), edge.sin() * (half - 1.0));
                    let intensity = (255.0 * weight / max_weight).round() as u8;
                    draw_line_segment_mut(
                        &mut canvas,
                        (center_x - dx, center_y - dy),
                        (center_x + dx, center_y + dy),
                        Luma([intensity]),
                    );
                }
            }
        }
        Ok(canvas)
    }
}

fn positive_u32(key: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| DetectorError::InvalidParameter(format!("{key} must be positive, got {value}")))
}

impl FeatureExtractor for HogFeatureExtractor {
    fn feature_type(&self) -> &'static str {
        FEATURE_TYPE
    }

    fn parameters(&self) -> ParametersMap {
        ParametersMap::new()
            .with(KEY_N_ANGULAR_BINS, self.n_angular_bins)
            .with(KEY_UNSIGNED_GRADIENTS, self.unsigned_gradients)
            .with(KEY_CELL_SIZE, self.cell_size)
    }

    fn extract(&self, image: &GrayImage) -> Feature {
        let (cells_x, cells_y) = self.cell_grid(image.width(), image.height());
        if cells_x == 0 || cells_y == 0 {
            return Feature::default();
        }
        let histograms = self.cell_histograms(image, cells_x, cells_y);
        Feature::new(self.normalize(&histograms, cells_x, cells_y))
    }

    fn dimension(&self, width: u32, height: u32) -> usize {
        let (cells_x, cells_y) = self.cell_grid(width, height);
        cells_x * cells_y * self.n_angular_bins as usize
    }

    fn scale_factor(&self) -> f64 {
        1.0 / self.cell_size as f64
    }
}
