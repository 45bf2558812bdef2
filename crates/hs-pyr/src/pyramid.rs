use hs_core::{Image, ImageView};
use log::debug;

use crate::downsample::downsample2x2_u16_into;

/// Alignment pyramid over a black-subtracted `u16` capture.
///
/// Level 0 is the 2x2 saturating downsample of the full-resolution source and
/// every next level halves the previous one again, so level `k` has
/// `(w >> (k + 1), h >> (k + 1))` samples. The source itself is not stored.
///
/// Building stops early when the next level would have a zero dimension.
#[derive(Debug, Default, Clone)]
pub struct PyramidU16 {
    levels: Vec<Image<u16>>,
    threshold: u16,
}

impl PyramidU16 {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            threshold: u16::MAX,
        }
    }

    pub fn build(src: &ImageView<'_, u16>, num_levels: usize, threshold: u16) -> Self {
        let mut pyr = Self::new();
        pyr.rebuild(src, num_levels, threshold);
        pyr
    }

    /// Rebuilds in place, reusing level buffers whose size already matches.
    pub fn rebuild(&mut self, src: &ImageView<'_, u16>, num_levels: usize, threshold: u16) {
        let build_levels = max_build_levels(src.width(), src.height(), num_levels);
        self.threshold = threshold;
        self.ensure(src.width(), src.height(), build_levels);
        if build_levels == 0 {
            return;
        }

        downsample2x2_u16_into(src, Some(threshold), &mut self.levels[0]);
        for level_idx in 1..build_levels {
            let (prev_levels, curr_and_tail) = self.levels.split_at_mut(level_idx);
            let prev = &prev_levels[level_idx - 1];
            let curr = &mut curr_and_tail[0];
            downsample2x2_u16_into(&prev.as_view(), Some(threshold), curr);
        }

        debug!(
            "pyramid built: {}x{} -> {} levels ({} bytes)",
            src.width(),
            src.height(),
            build_levels,
            self.memory_bytes()
        );
    }

    fn ensure(&mut self, base_w: usize, base_h: usize, num_levels: usize) {
        self.levels.truncate(num_levels);
        self.levels
            .resize_with(num_levels, || Image::new_fill(0, 0, 0u16));

        let mut w = base_w / 2;
        let mut h = base_h / 2;
        for level in &mut self.levels {
            if level.width() != w || level.height() != h {
                *level = Image::new_fill(w, h, 0u16);
            }
            w /= 2;
            h /= 2;
        }
    }

    pub fn level(&self, i: usize) -> Option<&Image<u16>> {
        self.levels.get(i)
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Value written for blocks that contain a saturated sample.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn memory_bytes(&self) -> usize {
        self.levels
            .iter()
            .map(|l| l.len() * core::mem::size_of::<u16>())
            .sum()
    }
}

/// Number of half-resolution levels `(w, h)` supports, capped at `requested`.
fn max_build_levels(base_w: usize, base_h: usize, requested: usize) -> usize {
    let mut levels = 0usize;
    let mut w = base_w;
    let mut h = base_h;
    while levels < requested && w >= 2 && h >= 2 {
        w /= 2;
        h /= 2;
        levels += 1;
    }
    levels
}
