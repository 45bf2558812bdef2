use core::cmp::Ordering;
use std::path::Path;

use hs_core::{Displacement, Error, Image, Rect, SensorFormat, SensorMeta};
use hs_pyr::PyramidU16;
use log::debug;
use rayon::prelude::*;

use crate::align::{self, AlignInput, AlignReport};
use crate::decode::{RawDecoder, RawFrame};
use crate::exposure::{self, ExposureEstimate, Histogram};
use crate::{AlignConfig, CaptureConfig, ExposureConfig};

/// One exposure of a bracketed sequence.
///
/// Owns the black-subtracted sensor buffer for its whole lifetime and the
/// alignment pyramid until [`release_align_data`](Self::release_align_data).
/// The aligned view is never materialised: aligned position `(x, y)` reads
/// raw position `(x - dx, y - dy)`.
#[derive(Debug, Clone)]
pub struct Capture {
    meta: SensorMeta,
    pixels: Image<u16>,
    pyramid: Option<PyramidU16>,
    displacement: Displacement,
    threshold: u16,
    brightness: f64,
    relative_exposure: f64,
    half_light: u16,
}

impl Capture {
    pub fn new(raw: Vec<u16>, meta: SensorMeta) -> Result<Self, Error> {
        Self::with_config(raw, meta, &CaptureConfig::default())
    }

    /// Takes ownership of `raw`, subtracts the black level and builds the
    /// alignment pyramid.
    pub fn with_config(raw: Vec<u16>, meta: SensorMeta, cfg: &CaptureConfig) -> Result<Self, Error> {
        if meta.width == 0 || meta.height == 0 {
            return Err(Error::EmptyImage {
                width: meta.width,
                height: meta.height,
            });
        }
        let mut pixels = Image::from_vec(meta.width, meta.height, raw)?;
        subtract_black(&mut pixels, &meta);

        let threshold = meta.saturation_threshold();
        let pyramid = PyramidU16::build(&pixels.as_view(), cfg.pyramid_levels, threshold);
        let brightness = mean(pixels.data());
        let half_light = Histogram::below(pixels.data(), threshold)
            .percentile(0.5)
            .unwrap_or(0);

        debug!(
            "capture {}x{}: brightness {brightness:.2}, half-light {half_light}, threshold {threshold}",
            meta.width, meta.height
        );

        Ok(Self {
            meta,
            pixels,
            pyramid: Some(pyramid),
            displacement: Displacement::ZERO,
            threshold,
            brightness,
            relative_exposure: 1.0,
            half_light,
        })
    }

    pub fn from_frame(frame: RawFrame, cfg: &CaptureConfig) -> Result<Self, Error> {
        Self::with_config(frame.pixels, frame.meta, cfg)
    }

    /// Decodes `path` with `decoder` and builds a capture from the result.
    pub fn open<D: RawDecoder + ?Sized>(
        path: impl AsRef<Path>,
        decoder: &D,
        cfg: &CaptureConfig,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let frame = decoder.decode(path)?;
        Self::from_frame(frame, cfg).map_err(|e| Error::decode(path, e.to_string()))
    }

    pub fn meta(&self) -> &SensorMeta {
        &self.meta
    }

    pub fn format(&self) -> SensorFormat {
        self.meta.format()
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Black-subtracted, unshifted sensor samples.
    pub fn pixels(&self) -> &Image<u16> {
        &self.pixels
    }

    pub fn pyramid(&self) -> Option<&PyramidU16> {
        self.pyramid.as_ref()
    }

    pub fn has_align_data(&self) -> bool {
        self.pyramid.is_some()
    }

    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    pub fn delta_x(&self) -> i32 {
        self.displacement.dx
    }

    pub fn delta_y(&self) -> i32 {
        self.displacement.dy
    }

    pub fn saturation_threshold(&self) -> u16 {
        self.threshold
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn relative_exposure(&self) -> f64 {
        self.relative_exposure
    }

    pub fn half_light_percentile(&self) -> u16 {
        self.half_light
    }

    pub fn is_same_format(&self, other: &Capture) -> bool {
        self.meta.is_same_format(&other.meta)
    }

    pub fn align_with(&mut self, reference: &Capture) -> Result<AlignReport, Error> {
        self.align_with_config(reference, &AlignConfig::default())
    }

    /// Registers this capture against `reference`.
    ///
    /// The resulting displacement includes the reference's own displacement,
    /// so the aligned views of both captures share one frame. Nothing is
    /// mutated on error.
    pub fn align_with_config(
        &mut self,
        reference: &Capture,
        cfg: &AlignConfig,
    ) -> Result<AlignReport, Error> {
        self.check_format(reference)?;
        let (Some(own), Some(other)) = (self.pyramid.as_ref(), reference.pyramid.as_ref()) else {
            return Err(Error::AlignDataReleased);
        };

        let subject = AlignInput {
            pixels: &self.pixels,
            pyramid: own,
            threshold: self.threshold,
            half_light: self.half_light,
            displacement: self.displacement,
        };
        let target = AlignInput {
            pixels: &reference.pixels,
            pyramid: other,
            threshold: reference.threshold,
            half_light: reference.half_light,
            displacement: reference.displacement,
        };
        let report = align::register(&subject, &target, cfg);

        debug!(
            "aligned: relative {} -> displacement {}",
            report.relative, report.displacement
        );
        self.displacement = report.displacement;
        Ok(report)
    }

    /// Adds an externally supplied correction to the current displacement.
    pub fn displace(&mut self, extra_dx: i32, extra_dy: i32) {
        self.displacement += Displacement::new(extra_dx, extra_dy);
    }

    /// Drops the pyramid. Full-resolution accessors keep working.
    pub fn release_align_data(&mut self) {
        if let Some(pyr) = self.pyramid.take() {
            debug!("released {} bytes of alignment data", pyr.memory_bytes());
        }
    }

    /// Marks this capture as the radiometric reference of a sequence.
    pub fn reset_relative_exposure(&mut self) {
        self.relative_exposure = 1.0;
    }

    pub fn compute_relative_exposure(&mut self, brighter: &Capture) -> Result<ExposureEstimate, Error> {
        self.compute_relative_exposure_with_config(brighter, &ExposureConfig::default())
    }

    /// Estimates and stores this capture's exposure relative to `brighter`,
    /// composed with `brighter`'s own relative exposure.
    pub fn compute_relative_exposure_with_config(
        &mut self,
        brighter: &Capture,
        cfg: &ExposureConfig,
    ) -> Result<ExposureEstimate, Error> {
        self.check_format(brighter)?;
        let estimate = exposure::estimate(self, brighter, cfg);
        self.relative_exposure = estimate.relative_exposure;
        Ok(estimate)
    }

    /// Region of aligned coordinates backed by raw samples.
    pub fn aligned_frame(&self) -> Rect {
        self.pixels.bounds().translated(self.displacement)
    }

    /// Raw sample behind aligned position `(x, y)`, `None` outside the frame.
    pub fn aligned_sample(&self, x: usize, y: usize) -> Option<u16> {
        let sx = x as i64 - i64::from(self.displacement.dx);
        let sy = y as i64 - i64::from(self.displacement.dy);
        self.pixels.get_signed(sx, sy)
    }

    /// Sample on the common radiometric scale; `0.0` outside the frame.
    pub fn exposure_at(&self, x: usize, y: usize) -> f64 {
        self.aligned_sample(x, y)
            .map_or(0.0, |v| f64::from(v) * self.relative_exposure)
    }

    /// Positions outside the frame count as saturated.
    pub fn is_saturated(&self, x: usize, y: usize) -> bool {
        self.aligned_sample(x, y)
            .is_none_or(|v| v >= self.threshold)
    }

    /// Orders captures brightest first; usable with `sort_by`.
    pub fn brightness_order(a: &Capture, b: &Capture) -> Ordering {
        b.brightness.total_cmp(&a.brightness)
    }

    fn check_format(&self, other: &Capture) -> Result<(), Error> {
        if self.is_same_format(other) {
            return Ok(());
        }
        Err(Error::FormatMismatch {
            expected: other.format(),
            actual: self.format(),
        })
    }
}

fn subtract_black(pixels: &mut Image<u16>, meta: &SensorMeta) {
    let width = pixels.width();
    let uniform = meta.filters == 0 || meta.cblack.iter().all(|&c| c == meta.cblack[0]);
    let data = pixels.data_mut();

    if uniform {
        let black = meta.black_at(0, 0);
        if black == 0 {
            return;
        }
        data.par_iter_mut().for_each(|v| *v = v.saturating_sub(black));
        return;
    }

    data.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = v.saturating_sub(meta.black_at(x, y));
        }
    });
}

fn mean(samples: &[u16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.par_iter().map(|&v| u64::from(v)).sum();
    sum as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use hs_core::{Displacement, Error, SensorMeta};

    use super::Capture;

    fn capture(w: usize, h: usize, raw: Vec<u16>, black: u16, white: u16) -> Capture {
        Capture::new(raw, SensorMeta::mono(w, h, black, white)).expect("valid capture")
    }

    #[test]
    fn black_level_is_subtracted_and_clamped() {
        let c = capture(2, 2, vec![100, 64, 10, 4095], 64, 4095);
        assert_eq!(c.pixels().data(), &[36, 0, 0, 4031]);
        assert_eq!(c.saturation_threshold(), 4031);
        assert!(c.is_saturated(1, 1));
        assert!(!c.is_saturated(0, 0));
    }

    #[test]
    fn per_channel_black_uses_cfa_layout() {
        let meta = SensorMeta {
            filters: 0x9494_9494,
            cblack: [10, 0, 20, 0],
            ..SensorMeta::mono(2, 2, 100, 4000)
        };
        let c = Capture::new(vec![200, 200, 200, 200], meta).expect("valid capture");
        assert_eq!(c.pixels().data(), &[90, 100, 100, 80]);
        assert_eq!(c.saturation_threshold(), 4000 - 120);
    }

    #[test]
    fn construction_validates_buffer() {
        let err = Capture::new(vec![0; 5], SensorMeta::mono(2, 2, 0, 100)).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 4,
                actual: 5
            }
        );

        let err = Capture::new(Vec::new(), SensorMeta::mono(0, 3, 0, 100)).unwrap_err();
        assert_eq!(err, Error::EmptyImage { width: 0, height: 3 });
    }

    #[test]
    fn statistics_skip_saturated_samples() {
        let c = capture(3, 2, vec![10, 20, 30, 40, 1000, 1000], 0, 1000);
        assert_eq!(c.half_light_percentile(), 20);
        assert!((c.brightness() - 2100.0 / 6.0).abs() < 1e-9);
        assert_eq!(c.relative_exposure(), 1.0);
        assert_eq!(c.displacement(), Displacement::ZERO);
    }

    #[test]
    fn aligned_view_reads_shifted_samples() {
        let mut c = capture(3, 2, vec![1, 2, 3, 4, 5, 6], 0, 100);
        c.displace(1, 0);
        assert_eq!(c.aligned_sample(1, 0), Some(1));
        assert_eq!(c.aligned_sample(0, 0), None);
        assert!(c.is_saturated(0, 0));
        assert_eq!(c.exposure_at(0, 0), 0.0);

        c.displace(-2, 1);
        assert_eq!((c.delta_x(), c.delta_y()), (-1, 1));
        assert_eq!(c.aligned_sample(0, 1), Some(2));
        assert_eq!(c.aligned_sample(0, 0), None);
    }

    #[test]
    fn release_keeps_full_resolution_accessors() {
        let mut c = capture(4, 4, (0..16).collect(), 0, 12);
        let before: Vec<(f64, bool)> = (0..16)
            .map(|i| (c.exposure_at(i % 4, i / 4), c.is_saturated(i % 4, i / 4)))
            .collect();

        assert!(c.has_align_data());
        c.release_align_data();
        c.release_align_data();
        assert!(!c.has_align_data());

        let after: Vec<(f64, bool)> = (0..16)
            .map(|i| (c.exposure_at(i % 4, i / 4), c.is_saturated(i % 4, i / 4)))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn align_after_release_fails_without_mutation() {
        let reference = capture(8, 8, (0..64).collect(), 0, 1000);
        let mut subject = capture(8, 8, (0..64).collect(), 0, 1000);
        subject.displace(2, 3);
        subject.release_align_data();

        assert_eq!(
            subject.align_with(&reference).unwrap_err(),
            Error::AlignDataReleased
        );
        assert_eq!(subject.displacement(), Displacement::new(2, 3));
    }

    #[test]
    fn format_mismatch_is_reported() {
        let reference = capture(8, 8, vec![5; 64], 0, 1000);
        let mut subject = capture(8, 4, vec![5; 32], 0, 1000);
        subject.displace(1, 1);

        assert!(!subject.is_same_format(&reference));
        assert!(matches!(
            subject.align_with(&reference),
            Err(Error::FormatMismatch { .. })
        ));
        assert!(matches!(
            subject.compute_relative_exposure(&reference),
            Err(Error::FormatMismatch { .. })
        ));
        assert_eq!(subject.displacement(), Displacement::new(1, 1));
        assert_eq!(subject.relative_exposure(), 1.0);
    }

    #[test]
    fn brightness_order_sorts_brightest_first() {
        let mut captures = vec![
            capture(2, 1, vec![10, 10], 0, 1000),
            capture(2, 1, vec![300, 300], 0, 1000),
            capture(2, 1, vec![50, 60], 0, 1000),
        ];
        captures.sort_by(Capture::brightness_order);

        let order: Vec<f64> = captures.iter().map(Capture::brightness).collect();
        assert_eq!(order, vec![300.0, 55.0, 10.0]);
    }
}
