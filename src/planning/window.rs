use crate::types::{AssetSequence, FrameError, Result, Window};

/// Clamp a requested window policy to a valid one.
///
/// Sequence length is raised to at least 1 and overlap lowered to at most
/// `sequence_length - 1`, so the resulting stride is always positive.
pub fn clamp_window(sequence_length: usize, overlap: usize) -> (usize, usize) {
    let sequence_length = sequence_length.max(1);
    let overlap = overlap.min(sequence_length - 1);
    (sequence_length, overlap)
}

/// Number of windows `plan` would produce for `asset_count` assets.
///
/// Returns 0 if the policy has a non-positive stride.
pub fn window_count(asset_count: usize, sequence_length: usize, overlap: usize) -> usize {
    if sequence_length == 0 || overlap >= sequence_length {
        return 0;
    }
    if asset_count == 0 {
        return 0;
    }
    if asset_count <= sequence_length {
        return 1;
    }
    let stride = sequence_length - overlap;
    1 + (asset_count - sequence_length).div_ceil(stride)
}

/// Fixed-size, overlapping window planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    sequence_length: usize,
    overlap: usize,
}

impl WindowPlanner {
    /// Planner with the policy taken as given. `plan` rejects a non-positive stride.
    pub fn new(sequence_length: usize, overlap: usize) -> Self {
        Self {
            sequence_length,
            overlap,
        }
    }

    /// Planner with the policy clamped to a valid one
    pub fn clamped(sequence_length: usize, overlap: usize) -> Self {
        let (sequence_length, overlap) = clamp_window(sequence_length, overlap);
        Self::new(sequence_length, overlap)
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> Result<usize> {
        if self.sequence_length == 0 || self.overlap >= self.sequence_length {
            return Err(FrameError::InvalidStride {
                sequence_length: self.sequence_length,
                overlap: self.overlap,
            });
        }
        Ok(self.sequence_length - self.overlap)
    }

    pub fn count(&self, asset_count: usize) -> usize {
        window_count(asset_count, self.sequence_length, self.overlap)
    }

    pub fn plan(&self, assets: &AssetSequence) -> Result<Vec<Window>> {
        let stride = self.stride()?;
        let total = assets.len();
        let mut windows = Vec::with_capacity(self.count(total));

        let mut start = 0;
        while start < total {
            let end = (start + self.sequence_length).min(total);
            windows.push(Window {
                index: windows.len(),
                start,
                assets: assets.as_slice()[start..end].to_vec(),
            });
            if end == total {
                break;
            }
            start += stride;
        }

        Ok(windows)
    }
}
