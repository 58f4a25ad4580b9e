//! Binary morphology with one-pixel-thick line structuring elements.
//!
//! Masks are `GrayImage`s where any non-zero pixel is foreground; results use 0 and 255.
//!
//! Each row or column is swept once with running sums, so a pass costs the same
//! for any element length. `imageproc::morphology::Mask` elements are capped
//! at 511 pixels and cost their length per output pixel.

use image::{GrayImage, Luma};
use imageproc::map::map_colors2;

use crate::models::Axis;

/// Erode with a line of `length` pixels along `axis`, anchored at its middle.
/// Pixels beyond the image border count as foreground.
pub fn erode_line(mask: &GrayImage, axis: Axis, length: u32) -> GrayImage {
    let anchor = (length / 2) as i64;
    sweep(mask, axis, |prefix, pos, extent| {
        let lo = (pos - anchor).max(0);
        let hi = (pos - anchor + length as i64 - 1).min(extent - 1);
        let span = hi - lo + 1;
        count(prefix, lo, hi) == span
    })
}

/// Dilate with the reflection of the element used by [`erode_line`], so that
/// erosion followed by dilation is a true opening.
pub fn dilate_line(mask: &GrayImage, axis: Axis, length: u32) -> GrayImage {
    let anchor = (length / 2) as i64;
    sweep(mask, axis, |prefix, pos, extent| {
        let lo = (pos + anchor - length as i64 + 1).max(0);
        let hi = (pos + anchor).min(extent - 1);
        lo <= hi && count(prefix, lo, hi) > 0
    })
}

/// Keep only the parts of `mask` covered by a run of at least `length`
/// foreground pixels along `axis`.
pub fn open_line(mask: &GrayImage, axis: Axis, length: u32) -> GrayImage {
    if length <= 1 {
        return binary(mask);
    }
    dilate_line(&erode_line(mask, axis, length), axis, length)
}

pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p, q| on(p[0] > 0 || q[0] > 0))
}

/// Foreground of `a` that is not foreground in `b`.
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p, q| on(p[0] > 0 && q[0] == 0))
}

fn binary(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for p in out.pixels_mut() {
        *p = on(p[0] > 0);
    }
    out
}

fn on(flag: bool) -> Luma<u8> {
    if flag { Luma([255]) } else { Luma([0]) }
}

fn count(prefix: &[u32], lo: i64, hi: i64) -> i64 {
    (prefix[(hi + 1) as usize] - prefix[lo as usize]) as i64
}

/// Visit every scanline along `axis`, building a prefix count of foreground
/// pixels, and let `keep` decide each output pixel from it.
fn sweep<F>(mask: &GrayImage, axis: Axis, keep: F) -> GrayImage
where
    F: Fn(&[u32], i64, i64) -> bool,
{
    let (width, height) = mask.dimensions();
    let mut out = GrayImage::new(width, height);
    let (lines, extent) = match axis {
        Axis::Horizontal => (height, width),
        Axis::Vertical => (width, height),
    };
    let at = |line: u32, pos: u32| match axis {
        Axis::Horizontal => (pos, line),
        Axis::Vertical => (line, pos),
    };

    let mut prefix = vec![0u32; extent as usize + 1];
    for line in 0..lines {
        for pos in 0..extent {
            let (x, y) = at(line, pos);
            prefix[pos as usize + 1] = prefix[pos as usize] + u32::from(mask.get_pixel(x, y)[0] > 0);
        }
        for pos in 0..extent {
            if keep(&prefix, pos as i64, extent as i64) {
                let (x, y) = at(line, pos);
                out.put_pixel(x, y, Luma([255]));
            }
        }
    }
    out
}
