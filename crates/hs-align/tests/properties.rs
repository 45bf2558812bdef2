use core::cmp::Ordering;

use hs_align::{AlignConfig, Capture, Histogram};
use hs_core::{Displacement, SensorMeta};
use proptest::prelude::*;

const W: usize = 12;
const H: usize = 10;

fn frame() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..1200, W * H)
}

fn capture(raw: Vec<u16>) -> Capture {
    Capture::new(raw, SensorMeta::mono(W, H, 16, 1000)).expect("valid capture")
}

proptest! {
    #[test]
    fn displace_accumulates(steps in prop::collection::vec((-20i32..20, -20i32..20), 0..8)) {
        let mut c = capture(vec![100; W * H]);
        let mut expected = Displacement::ZERO;
        for &(dx, dy) in &steps {
            c.displace(dx, dy);
            expected += Displacement::new(dx, dy);
        }
        prop_assert_eq!(c.displacement(), expected);
    }

    #[test]
    fn aligned_accessors_agree(raw in frame(), dx in -4i32..4, dy in -4i32..4) {
        let mut c = capture(raw);
        c.displace(dx, dy);
        let threshold = c.saturation_threshold();

        for y in 0..H {
            for x in 0..W {
                match c.aligned_sample(x, y) {
                    Some(v) => {
                        prop_assert_eq!(c.is_saturated(x, y), v >= threshold);
                        prop_assert_eq!(c.exposure_at(x, y), f64::from(v) * c.relative_exposure());
                    }
                    None => {
                        prop_assert!(c.is_saturated(x, y));
                        prop_assert_eq!(c.exposure_at(x, y), 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn release_changes_no_observation(raw in frame(), dx in -3i32..3, dy in -3i32..3) {
        let mut c = capture(raw);
        c.displace(dx, dy);
        let observe = |c: &Capture| -> Vec<(f64, bool)> {
            (0..W * H).map(|i| (c.exposure_at(i % W, i / W), c.is_saturated(i % W, i / W))).collect()
        };
        let before = observe(&c);
        c.release_align_data();
        prop_assert_eq!(before, observe(&c));
    }

    #[test]
    fn finest_choice_scores_no_worse_than_its_neighbours(
        reference in frame(),
        subject in frame(),
        radius in 1u32..3,
    ) {
        let reference = capture(reference);
        let mut subject = capture(subject);
        let cfg = AlignConfig { search_radius: radius, ..AlignConfig::default() };

        let report = subject.align_with_config(&reference, &cfg).expect("same format");
        let finest = report.finest().expect("full-resolution stage");
        prop_assert_eq!(finest.candidates.len(), ((2 * radius + 1) * (2 * radius + 1)) as usize);

        match finest.best {
            Some(best) => {
                prop_assert!(finest.candidates.iter().any(|c| c.offset == finest.chosen && c.score == Some(best)));
                for candidate in &finest.candidates {
                    if let Some(score) = candidate.score {
                        prop_assert_ne!(best.cmp_mean(&score), Ordering::Greater);
                    }
                }
            }
            None => {
                prop_assert!(finest.candidates.iter().all(|c| c.score.is_none()));
                prop_assert_eq!(finest.chosen, finest.estimate);
            }
        }
        prop_assert_eq!(subject.displacement(), report.displacement);
    }

    #[test]
    fn percentile_matches_sorted_rank(mut samples in prop::collection::vec(any::<u16>(), 1..200), p in 0.0f64..=1.0) {
        let hist = Histogram::below(&samples, u16::MAX);
        samples.retain(|&v| v < u16::MAX);
        samples.sort_unstable();
        let expected = if samples.is_empty() {
            None
        } else {
            Some(samples[((samples.len() - 1) as f64 * p).floor() as usize])
        };
        prop_assert_eq!(hist.percentile(p), expected);
    }
}
