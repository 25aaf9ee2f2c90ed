use plotters::prelude::*;

use crate::pipeline::FrameReport;
use crate::scan::ColorLabel;

pub(crate) fn label_rgb(label: ColorLabel) -> (u8, u8, u8) {
    match label {
        ColorLabel::Other => (90, 90, 90),
        ColorLabel::Green => (60, 170, 70),
        ColorLabel::Red => (220, 50, 40),
        ColorLabel::White => (235, 235, 235),
    }
}

fn label_color(label: ColorLabel) -> RGBColor {
    let (r, g, b) = label_rgb(label);
    RGBColor(r, g, b)
}

/// Renders a frame's scan line as an RGBA pixel buffer.
///
/// The upper half shows the label of every column, the lower half the merged
/// regions with a marker at each centroid, and a black line marks the dot.
pub fn render_profile_rgba(width: u32, height: u32, report: &FrameReport) -> Result<Vec<u8>, String> {
    if width == 0 || height == 0 || report.columns == 0 {
        return Ok(Vec::new());
    }

    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| "width*height overflow".to_string())?;

    let mut rgb = vec![255u8; pixel_count * 3];
    let to_x = |column: f32| -> i32 {
        let x = column / report.columns as f32 * width as f32;
        (x.round() as i32).clamp(0, width.saturating_sub(1) as i32)
    };
    let mid = (height / 2) as i32;
    let bottom = height.saturating_sub(1) as i32;

    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        for &(column, label) in &report.labels {
            let x0 = to_x(column as f32);
            let x1 = to_x(column as f32 + 1.0).max(x0 + 1);
            root.draw(&Rectangle::new(
                [(x0, 0), (x1, mid - 2)],
                label_color(label).filled(),
            ))
            .map_err(|e| e.to_string())?;
        }

        for region in &report.regions {
            let x0 = to_x(region.first_column as f32);
            let x1 = to_x(region.last_column as f32 + 1.0).max(x0 + 1);
            let color = label_color(region.label);
            root.draw(&Rectangle::new([(x0, mid + 2), (x1, bottom)], color.filled()))
                .map_err(|e| e.to_string())?;
            root.draw(&Rectangle::new([(x0, mid + 2), (x1, bottom)], BLACK))
                .map_err(|e| e.to_string())?;
            let cx = to_x(region.centroid);
            root.draw(&Circle::new((cx, (mid + bottom) / 2), 3, BLACK.filled()))
                .map_err(|e| e.to_string())?;
        }

        if let Some(dot) = &report.dot {
            let x = to_x(dot.position);
            root.draw(&PathElement::new([(x, 0), (x, bottom)], BLACK.stroke_width(2)))
                .map_err(|e| e.to_string())?;
        }

        root.present().map_err(|e| e.to_string())?;
    }

    let mut rgba = vec![255u8; pixel_count * 4];
    for i in 0..pixel_count {
        rgba[i * 4] = rgb[i * 3];
        rgba[i * 4 + 1] = rgb[i * 3 + 1];
        rgba[i * 4 + 2] = rgb[i * 3 + 2];
        rgba[i * 4 + 3] = 255;
    }

    Ok(rgba)
}
