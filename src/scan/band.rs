//! The sampled horizontal band of a frame and its per-column averages.

use image::RgbImage;
use palette::Srgb;

use super::color::{ColorLabel, ColorThresholds, classify};

/// Errors raised while cutting a band out of a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BandError {
    #[error("scan band rows {top}..{end} fall outside a frame of height {frame_height}")]
    OutOfFrame {
        top: u32,
        end: u32,
        frame_height: u32,
    },

    #[error("scan band height must be at least 1")]
    EmptyBand,

    #[error("buffer holds {len} bytes, {width}x{height} BGR needs {required}")]
    ShortBuffer {
        len: usize,
        width: u32,
        height: u32,
        required: usize,
    },
}

/// Vertical placement of the band inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandGeometry {
    pub top: u32,
    pub height: u32,
}

/// Row-major RGB pixels of the rows being averaged.
#[derive(Debug, Clone)]
pub struct ScanBand {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl ScanBand {
    /// Copies rows `top..top + height` out of a decoded frame.
    pub fn from_image(frame: &RgbImage, geometry: BandGeometry) -> Result<Self, BandError> {
        if geometry.height == 0 {
            return Err(BandError::EmptyBand);
        }
        let (width, frame_height) = frame.dimensions();
        let end = geometry.top.saturating_add(geometry.height);
        if end > frame_height {
            return Err(BandError::OutOfFrame {
                top: geometry.top,
                end,
                frame_height,
            });
        }

        let row_bytes = width as usize * 3;
        let start = geometry.top as usize * row_bytes;
        let stop = end as usize * row_bytes;
        Ok(Self {
            width,
            height: geometry.height,
            rgb: frame.as_raw()[start..stop].to_vec(),
        })
    }

    /// Wraps a raw band already read from disk: 3 bytes per pixel, blue first.
    pub fn from_bgr(width: u32, height: u32, bytes: &[u8]) -> Result<Self, BandError> {
        if height == 0 {
            return Err(BandError::EmptyBand);
        }
        let required = width as usize * height as usize * 3;
        if bytes.len() < required {
            return Err(BandError::ShortBuffer {
                len: bytes.len(),
                width,
                height,
                required,
            });
        }
        let rgb = bytes[..required]
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        Ok(Self { width, height, rgb })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Truncating per-channel mean of every column over the band height.
    pub fn averages(&self) -> Vec<Srgb<u8>> {
        let width = self.width as usize;
        let rows = self.height as usize;
        if width == 0 {
            return Vec::new();
        }
        let mut sums = vec![[0u32; 3]; width];
        for row in self.rgb.chunks_exact(width * 3).take(rows) {
            for (sum, px) in sums.iter_mut().zip(row.chunks_exact(3)) {
                sum[0] += px[0] as u32;
                sum[1] += px[1] as u32;
                sum[2] += px[2] as u32;
            }
        }
        let n = self.height;
        sums.into_iter()
            .map(|[r, g, b]| Srgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8))
            .collect()
    }

    /// `(column, label)` pairs in column order.
    pub fn labels(&self, thresholds: &ColorThresholds) -> Vec<(u32, ColorLabel)> {
        self.averages()
            .into_iter()
            .enumerate()
            .map(|(column, sample)| (column as u32, classify(sample, thresholds)))
            .collect()
    }
}

/// Compact one-character-per-column rendering of a labeled line.
pub fn strip_text(labels: &[(u32, ColorLabel)]) -> String {
    labels.iter().map(|(_, label)| label.glyph()).collect()
}
