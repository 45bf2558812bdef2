//! Coarse-to-fine integer registration.
//!
//! The search starts on the coarsest usable pyramid level with a zero
//! estimate, scores the `(2r + 1)^2` neighbourhood of the estimate, doubles
//! the winner when moving to the next finer level and finishes on the
//! full-resolution buffer. Levels smaller than
//! [`AlignConfig::min_level_size`] are not searched.
//!
//! All candidates of a stage are scored over one reference window: the frame
//! inset by the largest offset the stage can try, so every candidate sees the
//! same reference samples. Scores are sums of absolute differences over the
//! window positions where neither sample is saturated, compared per scored
//! sample.
//!
//! With [`AlignConfig::normalize_exposure`] each side is multiplied by the
//! other capture's half-light percentile before differencing, which puts
//! captures of different exposure on one scale while keeping the arithmetic
//! in integers.

use core::cmp::Ordering;

use hs_core::{Displacement, Image, Rect};
use hs_pyr::PyramidU16;
use log::debug;
use rayon::prelude::*;

use crate::AlignConfig;

const PAR_MIN_ROWS: usize = 64;

/// Sum of absolute differences and the number of samples it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dissimilarity {
    pub sad: u64,
    pub count: u64,
}

impl Dissimilarity {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::INFINITY;
        }
        self.sad as f64 / self.count as f64
    }

    /// Exact ordering of `sad / count` without rounding.
    pub fn cmp_mean(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.sad) * u128::from(other.count);
        let rhs = u128::from(other.sad) * u128::from(self.count);
        lhs.cmp(&rhs)
    }
}

/// One image plane, the value at which its samples count as clipped and the
/// factor applied to its samples before differencing.
#[derive(Debug, Clone, Copy)]
pub struct SamplePlane<'a> {
    pub image: &'a Image<u16>,
    pub threshold: u16,
    pub scale: u64,
}

impl<'a> SamplePlane<'a> {
    pub fn new(image: &'a Image<u16>, threshold: u16) -> Self {
        Self {
            image,
            threshold,
            scale: 1,
        }
    }
}

/// Scores `subject` shifted by `offset` against `reference` over their whole
/// overlap.
///
/// Reference position `p` is compared with subject position `p - offset`.
/// Returns `None` when the two frames do not overlap at all.
pub fn dissimilarity(
    subject: SamplePlane<'_>,
    reference: SamplePlane<'_>,
    offset: Displacement,
) -> Option<Dissimilarity> {
    let overlap = reference
        .image
        .bounds()
        .intersect(&subject.image.bounds().translated(offset))?;
    dissimilarity_in(subject, reference, offset, overlap)
}

/// Scores the reference `window` against the subject window `window - offset`.
///
/// Returns `None` when either window leaves its image.
pub fn dissimilarity_in(
    subject: SamplePlane<'_>,
    reference: SamplePlane<'_>,
    offset: Displacement,
    window: Rect,
) -> Option<Dissimilarity> {
    let ref_view = reference.image.as_view().crop(window).ok()?;
    let sub_view = subject.image.as_view().crop(window.translated(-offset)).ok()?;

    let (st, rt) = (subject.threshold, reference.threshold);
    let (ss, rs) = (subject.scale, reference.scale);
    let row_score = |y: usize| -> (u64, u64) {
        let mut sad = 0u64;
        let mut count = 0u64;
        for (&s, &r) in sub_view.row(y).iter().zip(ref_view.row(y)) {
            if s >= st || r >= rt {
                continue;
            }
            sad += (u64::from(s) * ss).abs_diff(u64::from(r) * rs);
            count += 1;
        }
        (sad, count)
    };
    let add = |a: (u64, u64), b: (u64, u64)| (a.0 + b.0, a.1 + b.1);

    let (sad, count) = if window.height < PAR_MIN_ROWS {
        (0..window.height).map(row_score).fold((0, 0), add)
    } else {
        (0..window.height)
            .into_par_iter()
            .map(row_score)
            .reduce(|| (0, 0), add)
    };

    Some(Dissimilarity { sad, count })
}

/// Score of one trial displacement; `None` when it was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateScore {
    pub offset: Displacement,
    pub score: Option<Dissimilarity>,
}

/// Decisions taken at one search stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTrace {
    /// Pyramid level, `None` for the full-resolution stage.
    pub level: Option<usize>,
    pub estimate: Displacement,
    /// Reference region every candidate was scored over; `None` when the
    /// estimate left no room for the search.
    pub window: Option<Rect>,
    pub chosen: Displacement,
    pub best: Option<Dissimilarity>,
    pub candidates: Vec<CandidateScore>,
}

/// Result of registering one capture against a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignReport {
    /// Offset between the two raw buffers.
    pub relative: Displacement,
    /// `relative` composed with the reference's own displacement.
    pub displacement: Displacement,
    pub stages: Vec<StageTrace>,
}

impl AlignReport {
    pub fn finest(&self) -> Option<&StageTrace> {
        self.stages.last()
    }
}

/// Everything the search reads from one capture.
#[derive(Debug, Clone, Copy)]
pub struct AlignInput<'a> {
    pub pixels: &'a Image<u16>,
    pub pyramid: &'a PyramidU16,
    pub threshold: u16,
    pub half_light: u16,
    pub displacement: Displacement,
}

impl<'a> AlignInput<'a> {
    fn full(&self, scale: u64) -> SamplePlane<'a> {
        SamplePlane {
            image: self.pixels,
            threshold: self.threshold,
            scale,
        }
    }

    fn level(&self, i: usize, scale: u64) -> Option<SamplePlane<'a>> {
        self.pyramid.level(i).map(|image| SamplePlane {
            image,
            threshold: self.pyramid.threshold(),
            scale,
        })
    }
}

/// Per-side sample factors; `(1, 1)` unless normalisation is requested and
/// both half-light percentiles are usable.
fn exposure_scales(
    subject: &AlignInput<'_>,
    reference: &AlignInput<'_>,
    cfg: &AlignConfig,
) -> (u64, u64) {
    if !cfg.normalize_exposure || subject.half_light == 0 || reference.half_light == 0 {
        return (1, 1);
    }
    (u64::from(reference.half_light), u64::from(subject.half_light))
}

/// Runs the coarse-to-fine search of `subject` against `reference`.
///
/// Both inputs must share dimensions; the caller checks the format.
pub fn register(
    subject: &AlignInput<'_>,
    reference: &AlignInput<'_>,
    cfg: &AlignConfig,
) -> AlignReport {
    let levels = subject
        .pyramid
        .num_levels()
        .min(reference.pyramid.num_levels());
    let (sub_scale, ref_scale) = exposure_scales(subject, reference, cfg);
    let mut stages = Vec::with_capacity(levels + 1);
    let mut estimate = Displacement::ZERO;

    for level in (0..levels).rev() {
        let (Some(s), Some(r)) = (
            subject.level(level, sub_scale),
            reference.level(level, ref_scale),
        ) else {
            continue;
        };
        if r.image.width().min(r.image.height()) < cfg.min_level_size {
            continue;
        }
        let stage = search_stage(s, r, estimate, cfg, Some(level));
        estimate = stage.chosen.upscaled(1);
        stages.push(stage);
    }

    let stage = search_stage(
        subject.full(sub_scale),
        reference.full(ref_scale),
        estimate,
        cfg,
        None,
    );
    let relative = stage.chosen;
    stages.push(stage);

    AlignReport {
        relative,
        displacement: reference.displacement + relative,
        stages,
    }
}

fn search_stage(
    subject: SamplePlane<'_>,
    reference: SamplePlane<'_>,
    estimate: Displacement,
    cfg: &AlignConfig,
    level: Option<usize>,
) -> StageTrace {
    let radius = cfg.search_radius as i32;
    let window = search_window(reference.image.bounds(), estimate, radius);
    let min_scored = cfg.min_scored(window.map_or(0, |w| unclipped_count(reference, w)));
    let mut candidates = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
    let mut best: Option<(Displacement, Dissimilarity)> = None;

    for ddy in -radius..=radius {
        for ddx in -radius..=radius {
            let offset = estimate + Displacement::new(ddx, ddy);
            let score = window
                .and_then(|w| dissimilarity_in(subject, reference, offset, w))
                .filter(|d| d.count >= min_scored);
            candidates.push(CandidateScore { offset, score });

            let Some(score) = score else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_offset, best_score)) => match score.cmp_mean(&best_score) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => {
                        tie_key(offset, estimate) < tie_key(best_offset, estimate)
                    }
                },
            };
            if better {
                best = Some((offset, score));
            }
        }
    }

    let chosen = best.map_or(estimate, |(offset, _)| offset);
    match best {
        Some((_, score)) => debug!(
            "align stage {:?}: estimate {estimate} -> {chosen} (mean abs diff {:.3} over {} samples)",
            level,
            score.mean(),
            score.count
        ),
        None => debug!(
            "align stage {:?}: no candidate around {estimate} reached {min_scored} samples",
            level
        ),
    }

    StageTrace {
        level,
        estimate,
        window,
        chosen,
        best: best.map(|(_, score)| score),
        candidates,
    }
}

/// Reference region that stays inside the subject frame for every offset
/// within `radius` of `estimate`. Both frames share `bounds`.
fn search_window(bounds: Rect, estimate: Displacement, radius: i32) -> Option<Rect> {
    let reach = |e: i32| (i64::from(e) - i64::from(radius), i64::from(e) + i64::from(radius));
    let (lo_x, hi_x) = reach(estimate.dx);
    let (lo_y, hi_y) = reach(estimate.dy);

    let x0 = bounds.x + hi_x.max(0);
    let y0 = bounds.y + hi_y.max(0);
    let x1 = bounds.right() + lo_x.min(0);
    let y1 = bounds.bottom() + lo_y.min(0);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
}

/// Reference samples in `window` below the clipping threshold.
fn unclipped_count(plane: SamplePlane<'_>, window: Rect) -> u64 {
    let Ok(view) = plane.image.as_view().crop(window) else {
        return 0;
    };
    view.rows()
        .map(|row| row.iter().filter(|&&v| v < plane.threshold).count() as u64)
        .sum()
}

/// Preference among equally scored candidates: stay close to the estimate,
/// then prefer the smaller absolute offset.
fn tie_key(offset: Displacement, estimate: Displacement) -> (u64, u32) {
    ((offset - estimate).norm_sq(), offset.l1())
}
