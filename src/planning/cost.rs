use tracing::warn;

use super::window::{clamp_window, window_count};
use crate::constants::cost::{
    BASE_TOKENS, MAX_DIMENSION, SEQUENTIAL_TILE_FACTOR, TILE_SIZE, TILE_TOKENS,
};
use crate::types::{AssetSequence, DetailLevel, TreatmentMode};

/// Cost of one image of `width` x `height` pixels at the given detail.
///
/// High (and Auto) detail clamps each side to the maximum dimension, then
/// recomputes the shorter side from the aspect ratio with truncation, and
/// charges one tile per full 512px square.
pub fn image_cost(width: u32, height: u32, detail: DetailLevel) -> u64 {
    if detail == DetailLevel::Low || width == 0 || height == 0 {
        return BASE_TOKENS;
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let max = u64::from(MAX_DIMENSION);
    let (scaled_w, scaled_h) = if w > h {
        let scaled_w = w.min(max);
        (scaled_w, scaled_w * h / w)
    } else {
        let scaled_h = h.min(max);
        (scaled_h * w / h, scaled_h)
    };

    let tile = u64::from(TILE_SIZE);
    let tiles = (scaled_w / tile) * (scaled_h / tile);
    TILE_TOKENS * tiles + BASE_TOKENS
}

/// Advisory cost estimate for a run, computed without network calls
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator {
    mode: TreatmentMode,
    detail: DetailLevel,
    sequence_length: usize,
    overlap: usize,
}

impl CostEstimator {
    pub fn new(mode: TreatmentMode, detail: DetailLevel) -> Self {
        Self {
            mode,
            detail,
            sequence_length: 1,
            overlap: 0,
        }
    }

    /// Window policy used for Sequential estimates; clamped before use
    pub fn with_window(mut self, sequence_length: usize, overlap: usize) -> Self {
        let (sequence_length, overlap) = clamp_window(sequence_length, overlap);
        self.sequence_length = sequence_length;
        self.overlap = overlap;
        self
    }

    pub fn estimate(&self, assets: &AssetSequence) -> u64 {
        if assets.is_empty() {
            return 0;
        }

        match self.mode {
            TreatmentMode::Independent => self.estimate_independent(assets),
            TreatmentMode::Sequential => self.estimate_sequential(assets.len()),
        }
    }

    fn estimate_independent(&self, assets: &AssetSequence) -> u64 {
        if self.detail == DetailLevel::Low {
            return BASE_TOKENS * assets.len() as u64;
        }

        assets
            .iter()
            .map(|asset| match asset.dimensions() {
                Ok((width, height)) => image_cost(width, height, self.detail),
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Unreadable dimensions, using base cost");
                    BASE_TOKENS
                }
            })
            .sum()
    }

    fn estimate_sequential(&self, asset_count: usize) -> u64 {
        let windows = window_count(asset_count, self.sequence_length, self.overlap) as u64;
        let length = self.sequence_length as u64;
        let per_window = match self.detail {
            DetailLevel::Low => BASE_TOKENS * length,
            DetailLevel::High | DetailLevel::Auto => {
                (TILE_TOKENS * length + BASE_TOKENS) * SEQUENTIAL_TILE_FACTOR
            }
        };
        windows * per_window
    }
}
