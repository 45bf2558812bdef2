use hs_core::{Displacement, Error, Rect};
use log::debug;

use crate::{AlignConfig, Capture, ExposureConfig};

/// Per-capture outcome of [`ExposureStack::align_and_expose`], in
/// brightest-first order.
#[derive(Debug, Clone, PartialEq)]
pub struct StackEntry {
    pub brightness: f64,
    pub displacement: Displacement,
    /// Exposure ratio to the immediate brighter neighbour; `1.0` for the
    /// reference.
    pub pairwise_ratio: f64,
    /// Exposure on the scale of the brightest capture.
    pub relative_exposure: f64,
    pub shared_samples: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackReport {
    pub entries: Vec<StackEntry>,
    /// Aligned region covered by every capture.
    pub common_area: Option<Rect>,
}

/// A bracketed sequence processed brightest-first.
#[derive(Debug, Clone, Default)]
pub struct ExposureStack {
    captures: Vec<Capture>,
}

impl ExposureStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_captures(captures: Vec<Capture>) -> Self {
        Self { captures }
    }

    pub fn push(&mut self, capture: Capture) {
        self.captures.push(capture);
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn into_captures(self) -> Vec<Capture> {
        self.captures
    }

    pub fn sort(&mut self) {
        self.captures.sort_by(Capture::brightness_order);
    }

    /// Sorts, then aligns and exposure-scales every capture against its
    /// immediate brighter neighbour.
    ///
    /// Formats and alignment data are checked before anything is changed, so
    /// an error leaves every capture as it was apart from the order. Each
    /// pyramid is released as soon as its capture has been both subject and
    /// reference, so at most two pyramids stay alive past this point.
    pub fn align_and_expose(
        &mut self,
        align_cfg: &AlignConfig,
        exposure_cfg: &ExposureConfig,
    ) -> Result<StackReport, Error> {
        self.sort();
        self.check_ready()?;

        let len = self.captures.len();
        let Some(first) = self.captures.first_mut() else {
            return Ok(StackReport::default());
        };
        first.reset_relative_exposure();

        let mut entries = Vec::with_capacity(len);
        entries.push(StackEntry {
            brightness: first.brightness(),
            displacement: first.displacement(),
            pairwise_ratio: 1.0,
            relative_exposure: 1.0,
            shared_samples: 0,
        });

        for i in 1..len {
            let (head, tail) = self.captures.split_at_mut(i);
            let reference = &mut head[i - 1];
            let subject = &mut tail[0];

            subject.align_with_config(reference, align_cfg)?;
            let estimate = subject.compute_relative_exposure_with_config(reference, exposure_cfg)?;
            reference.release_align_data();

            debug!(
                "stack[{i}]: displacement {}, ratio {:.4}, exposure {:.4}",
                subject.displacement(),
                estimate.ratio,
                estimate.relative_exposure
            );
            entries.push(StackEntry {
                brightness: subject.brightness(),
                displacement: subject.displacement(),
                pairwise_ratio: estimate.ratio,
                relative_exposure: estimate.relative_exposure,
                shared_samples: estimate.samples,
            });
        }
        if let Some(last) = self.captures.last_mut() {
            last.release_align_data();
        }

        Ok(StackReport {
            entries,
            common_area: self.common_area(),
        })
    }

    /// Every capture shares the first one's format and, when there is
    /// anything to align, still holds its pyramid.
    fn check_ready(&self) -> Result<(), Error> {
        let Some(reference) = self.captures.first() else {
            return Ok(());
        };
        if let Some(other) = self.captures.iter().find(|c| !c.is_same_format(reference)) {
            return Err(Error::FormatMismatch {
                expected: reference.format(),
                actual: other.format(),
            });
        }
        if self.captures.len() > 1 && self.captures.iter().any(|c| !c.has_align_data()) {
            return Err(Error::AlignDataReleased);
        }
        Ok(())
    }

    /// Intersection of all aligned frames.
    pub fn common_area(&self) -> Option<Rect> {
        let mut frames = self.captures.iter().map(Capture::aligned_frame);
        let first = frames.next()?;
        frames.try_fold(first, |acc, frame| acc.intersect(&frame))
    }
}
