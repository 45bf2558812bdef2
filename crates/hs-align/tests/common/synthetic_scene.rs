#![allow(dead_code)]

use std::f64::consts::TAU;

use hs_align::Capture;
use hs_core::SensorMeta;

/// Smooth scene that tiles the `width x height` frame, values in `680..=3320`.
///
/// Every cyclic shift of the scene holds the same multiset of samples, so
/// frame-wide statistics of shifted copies agree exactly.
pub fn periodic_scene(width: usize, height: usize) -> Vec<u16> {
    let (w, h) = (width as f64, height as f64);
    let mut scene = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (u, v) = (x as f64 / w, y as f64 / h);
            let value = 2000.0
                + 500.0 * (TAU * u).sin()
                + 400.0 * (TAU * v).cos()
                + 300.0 * (TAU * (2.0 * u + v)).sin()
                + 120.0 * (TAU * (5.0 * u - 3.0 * v)).cos();
            scene.push(value.round() as u16);
        }
    }
    scene
}

/// Raw buffer of `scene` seen through a sensor offset by `shift`:
/// `raw(q) = black + gain * scene(q - shift)`, wrapping at the frame edges.
pub fn exposed(
    scene: &[u16],
    width: usize,
    height: usize,
    shift: (i32, i32),
    gain: u16,
    black: u16,
) -> Vec<u16> {
    let (w, h) = (width as i64, height as i64);
    let mut raw = Vec::with_capacity(scene.len());
    for y in 0..h {
        for x in 0..w {
            let sx = (x - i64::from(shift.0)).rem_euclid(w) as usize;
            let sy = (y - i64::from(shift.1)).rem_euclid(h) as usize;
            raw.push(black + gain * scene[sy * width + sx]);
        }
    }
    raw
}

/// `1000 * x + 100`, constant along columns.
pub fn column_ramp(width: usize, height: usize) -> Vec<u16> {
    (0..width * height)
        .map(|i| (1000 * (i % width) + 100) as u16)
        .collect()
}

/// [`column_ramp`] moved one column right, repeating the first column.
pub fn column_ramp_shifted(width: usize, height: usize) -> Vec<u16> {
    (0..width * height)
        .map(|i| (1000 * (i % width).saturating_sub(1) + 100) as u16)
        .collect()
}

pub fn mono_capture(width: usize, height: usize, raw: Vec<u16>, black: u16, white: u16) -> Capture {
    Capture::new(raw, SensorMeta::mono(width, height, black, white)).expect("valid capture")
}
