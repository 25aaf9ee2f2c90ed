use image::{Rgb, RgbImage};

use crate::scan::ColorLabel;

/// A pixel that classifies as `label` under the default thresholds.
pub fn reference_pixel(label: ColorLabel) -> Rgb<u8> {
    match label {
        ColorLabel::Other => Rgb([60, 60, 60]),
        ColorLabel::Green => Rgb([10, 220, 10]),
        ColorLabel::Red => Rgb([220, 40, 40]),
        ColorLabel::White => Rgb([250, 250, 250]),
    }
}

/// Generates a frame whose columns are painted in runs of `(label, width)`,
/// left to right, over the full height. Columns past the last run stay "other".
///
/// # Arguments
///
/// * `width` / `height` - frame size in pixels
/// * `runs` - label and column count of each vertical stripe
pub fn striped_frame(width: u32, height: u32, runs: &[(ColorLabel, u32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, reference_pixel(ColorLabel::Other));

    let mut x0 = 0u32;
    for &(label, run) in runs {
        let color = reference_pixel(label);
        for x in x0..(x0 + run).min(width) {
            for y in 0..height {
                img.put_pixel(x, y, color);
            }
        }
        x0 += run;
    }

    img
}

/// Pixel bytes of `frame` laid out like a 24-bit bitmap body: rows bottom-up,
/// blue first, no padding.
pub fn bgr_rows_bottom_up(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut out = Vec::with_capacity(width as usize * height as usize * 3);
    for y in (0..height).rev() {
        for x in 0..width {
            let Rgb([r, g, b]) = *frame.get_pixel(x, y);
            out.extend_from_slice(&[b, g, r]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ColorThresholds, classify};
    use palette::Srgb;

    #[test]
    fn reference_pixels_classify_as_their_label() {
        for label in [
            ColorLabel::Other,
            ColorLabel::Green,
            ColorLabel::Red,
            ColorLabel::White,
        ] {
            let Rgb([r, g, b]) = reference_pixel(label);
            assert_eq!(classify(Srgb::new(r, g, b), &ColorThresholds::default()), label);
        }
    }

    #[test]
    fn stripes_are_painted_in_order() {
        let img = striped_frame(10, 2, &[(ColorLabel::Other, 3), (ColorLabel::Red, 4)]);
        assert_eq!(*img.get_pixel(2, 1), reference_pixel(ColorLabel::Other));
        assert_eq!(*img.get_pixel(3, 0), reference_pixel(ColorLabel::Red));
        assert_eq!(*img.get_pixel(6, 1), reference_pixel(ColorLabel::Red));
        assert_eq!(*img.get_pixel(7, 1), reference_pixel(ColorLabel::Other));
    }

    #[test]
    fn bgr_dump_starts_with_bottom_row() {
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 1, Rgb([1, 2, 3]));
        assert_eq!(bgr_rows_bottom_up(&img), vec![3, 2, 1, 0, 0, 0]);
    }
}
