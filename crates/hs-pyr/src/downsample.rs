use hs_core::{Image, ImageView};
use rayon::prelude::*;

/// Below this many output rows the rayon split costs more than it saves.
const PAR_MIN_ROWS: usize = 64;

#[inline]
fn dst_dims(src_w: usize, src_h: usize) -> (usize, usize) {
    (src_w / 2, src_h / 2)
}

/// Plain 2x2 floor mean. Odd trailing rows and columns are dropped.
pub fn downsample2x2_mean_u16(src: &ImageView<'_, u16>) -> Image<u16> {
    let (dst_w, dst_h) = dst_dims(src.width(), src.height());
    let mut dst = Image::new_fill(dst_w, dst_h, 0u16);
    downsample2x2_u16_into(src, None, &mut dst);
    dst
}

/// 2x2 floor mean that keeps saturated regions saturated.
///
/// A block with any sample `>= threshold` produces `threshold`; every other
/// block produces the floor mean of its four samples, which is then below
/// `threshold` as well.
pub fn downsample2x2_saturating_u16(src: &ImageView<'_, u16>, threshold: u16) -> Image<u16> {
    let (dst_w, dst_h) = dst_dims(src.width(), src.height());
    let mut dst = Image::new_fill(dst_w, dst_h, 0u16);
    downsample2x2_u16_into(src, Some(threshold), &mut dst);
    dst
}

pub(crate) fn downsample2x2_u16_into(
    src: &ImageView<'_, u16>,
    threshold: Option<u16>,
    dst: &mut Image<u16>,
) {
    let dst_w = src.width() / 2;
    let dst_h = src.height() / 2;
    debug_assert_eq!(dst.width(), dst_w);
    debug_assert_eq!(dst.height(), dst_h);

    if dst_w == 0 || dst_h == 0 {
        return;
    }

    let fill_row = |y: usize, dst_row: &mut [u16]| {
        let src_row0 = src.row(2 * y);
        let src_row1 = src.row(2 * y + 1);
        match threshold {
            Some(t) => block_row_saturating(src_row0, src_row1, dst_row, t),
            None => block_row_mean(src_row0, src_row1, dst_row),
        }
    };

    let out = dst.data_mut();
    if dst_h < PAR_MIN_ROWS {
        out.chunks_mut(dst_w)
            .enumerate()
            .for_each(|(y, row)| fill_row(y, row));
    } else {
        out.par_chunks_mut(dst_w)
            .enumerate()
            .for_each(|(y, row)| fill_row(y, row));
    }
}

#[inline]
fn block_sum(src_row0: &[u16], src_row1: &[u16], sx: usize) -> u32 {
    u32::from(src_row0[sx])
        + u32::from(src_row0[sx + 1])
        + u32::from(src_row1[sx])
        + u32::from(src_row1[sx + 1])
}

fn block_row_mean(src_row0: &[u16], src_row1: &[u16], dst_row: &mut [u16]) {
    for (x, out) in dst_row.iter_mut().enumerate() {
        *out = (block_sum(src_row0, src_row1, 2 * x) / 4) as u16;
    }
}

fn block_row_saturating(src_row0: &[u16], src_row1: &[u16], dst_row: &mut [u16], threshold: u16) {
    for (x, out) in dst_row.iter_mut().enumerate() {
        let sx = 2 * x;
        let saturated = src_row0[sx] >= threshold
            || src_row0[sx + 1] >= threshold
            || src_row1[sx] >= threshold
            || src_row1[sx + 1] >= threshold;
        *out = if saturated {
            threshold
        } else {
            (block_sum(src_row0, src_row1, sx) / 4) as u16
        };
    }
}
