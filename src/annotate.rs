//! Draws the scan band and the located dot on top of a frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::pipeline::FrameReport;
use crate::plot::label_rgb;
use crate::scan::BandGeometry;

const BAND_OUTLINE: Rgb<u8> = Rgb([255, 220, 0]);
const DOT_MARKER: Rgb<u8> = Rgb([0, 200, 255]);

/// Copy of `frame` with the band outlined, region centroids marked in their
/// label color and a full-height line through the dot.
pub fn annotate_frame(frame: &RgbImage, geometry: BandGeometry, report: &FrameReport) -> RgbImage {
    let mut canvas = frame.clone();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }

    let band_height = geometry.height.max(1);
    draw_hollow_rect_mut(
        &mut canvas,
        Rect::at(0, geometry.top as i32).of_size(width, band_height),
        BAND_OUTLINE,
    );

    let band_center = (geometry.top + band_height / 2) as i32;
    let radius = (band_height as i32).clamp(3, 12);
    for region in &report.regions {
        let (r, g, b) = label_rgb(region.label);
        draw_filled_circle_mut(
            &mut canvas,
            (region.centroid.round() as i32, band_center),
            radius,
            Rgb([r, g, b]),
        );
    }

    if let Some(dot) = &report.dot {
        let x = dot.position;
        draw_line_segment_mut(&mut canvas, (x, 0.0), (x, (height - 1) as f32), DOT_MARKER);
        draw_line_segment_mut(
            &mut canvas,
            (x + 1.0, 0.0),
            (x + 1.0, (height - 1) as f32),
            DOT_MARKER,
        );
    }

    canvas
}
