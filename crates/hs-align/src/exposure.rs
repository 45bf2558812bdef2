//! Relative exposure from shared, unclipped samples.

use hs_core::{ImageView, Rect};
use log::{debug, warn};

use crate::{Capture, ExposureConfig};

/// Full-range `u16` histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Vec<u64>,
    total: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            bins: vec![0; usize::from(u16::MAX) + 1],
            total: 0,
        }
    }

    /// Histogram of the samples strictly below `threshold`.
    pub fn below(samples: &[u16], threshold: u16) -> Self {
        let mut hist = Self::new();
        for &v in samples {
            if v < threshold {
                hist.push(v);
            }
        }
        hist
    }

    #[inline]
    pub fn push(&mut self, v: u16) {
        self.bins[usize::from(v)] += 1;
        self.total += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Sample value at rank `floor((n - 1) * p)` of the sorted population.
    ///
    /// `p = 0.5` gives the lower median. `None` for an empty histogram.
    pub fn percentile(&self, p: f64) -> Option<u16> {
        if self.total == 0 {
            return None;
        }
        let rank = ((self.total - 1) as f64 * p.clamp(0.0, 1.0)).floor() as u64;
        let mut seen = 0u64;
        for (value, &count) in self.bins.iter().enumerate() {
            seen += count;
            if seen > rank {
                return Some(value as u16);
            }
        }
        None
    }
}

/// Outcome of one pairwise exposure estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureEstimate {
    /// `brighter_percentile / darker_percentile`, `1.0` when degenerate.
    /// Always positive.
    pub ratio: f64,
    /// Value stored on the darker capture: `ratio` times the brighter
    /// capture's own relative exposure.
    pub relative_exposure: f64,
    pub samples: u64,
    pub darker_percentile: u16,
    pub brighter_percentile: u16,
    pub degenerate: bool,
}

/// Computes the exposure of `darker` relative to `brighter` over their
/// aligned overlap. Both captures must share dimensions.
pub fn estimate(darker: &Capture, brighter: &Capture, cfg: &ExposureConfig) -> ExposureEstimate {
    let (dark_hist, bright_hist) = shared_histograms(darker, brighter);
    let samples = dark_hist.total();
    let dark_p = dark_hist.percentile(cfg.percentile).unwrap_or(0);
    let bright_p = bright_hist.percentile(cfg.percentile).unwrap_or(0);

    let degenerate = samples < cfg.min_samples as u64 || dark_p == 0 || bright_p == 0;
    let ratio = if degenerate {
        warn!(
            "exposure estimate degenerate ({samples} shared samples, percentile {dark_p}); keeping ratio 1.0"
        );
        1.0
    } else {
        f64::from(bright_p) / f64::from(dark_p)
    };
    let relative_exposure = ratio * brighter.relative_exposure();
    debug!(
        "exposure: percentile {dark_p} vs {bright_p} over {samples} samples -> ratio {ratio:.4}, relative {relative_exposure:.4}"
    );

    ExposureEstimate {
        ratio,
        relative_exposure,
        samples,
        darker_percentile: dark_p,
        brighter_percentile: bright_p,
        degenerate,
    }
}

/// Histograms of both captures over aligned positions where neither sample is
/// clipped and the darker one is above zero.
fn shared_histograms(darker: &Capture, brighter: &Capture) -> (Histogram, Histogram) {
    let mut dark_hist = Histogram::new();
    let mut bright_hist = Histogram::new();

    let Some(shared) = darker.aligned_frame().intersect(&brighter.aligned_frame()) else {
        return (dark_hist, bright_hist);
    };
    let (Some(dark_view), Some(bright_view)) = (
        raw_window(darker, shared),
        raw_window(brighter, shared),
    ) else {
        return (dark_hist, bright_hist);
    };

    let (dt, bt) = (darker.saturation_threshold(), brighter.saturation_threshold());
    for (dark_row, bright_row) in dark_view.rows().zip(bright_view.rows()) {
        for (&d, &b) in dark_row.iter().zip(bright_row) {
            if d == 0 || d >= dt || b >= bt {
                continue;
            }
            dark_hist.push(d);
            bright_hist.push(b);
        }
    }
    (dark_hist, bright_hist)
}

fn raw_window(capture: &Capture, aligned: Rect) -> Option<ImageView<'_, u16>> {
    let raw = aligned.translated(-capture.displacement());
    capture.pixels().as_view().crop(raw).ok()
}
