use crate::scene::{Layer, LayerKind, Rgba as LayerColor, Scene};
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

pub const PREVIEW_WIDTH: u32 = 1024;
pub const PREVIEW_HEIGHT: u32 = 512;

const BACKGROUND: Rgba<u8> = Rgba([250, 250, 248, 255]);

/// Geographic window drawn by the preview, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Frame {
    /// Window centred on the scene view. One zoom level halves the span, the
    /// same rule the view fit uses; the window is twice that for context.
    pub fn around(scene: &Scene) -> Self {
        let lon_span = (2.0 * 360.0 / 2f64.powf(scene.view.zoom)).min(360.0);
        let lat_span = lon_span / 2.0;
        Self {
            min_lon: scene.view.longitude - lon_span / 2.0,
            max_lon: scene.view.longitude + lon_span / 2.0,
            min_lat: scene.view.latitude - lat_span / 2.0,
            max_lat: scene.view.latitude + lat_span / 2.0,
        }
    }

    fn to_pixel(&self, lon: f64, lat: f64, width: u32, height: u32) -> (f64, f64) {
        let x = (lon - self.min_lon) / (self.max_lon - self.min_lon) * width as f64;
        let y = (self.max_lat - lat) / (self.max_lat - self.min_lat) * height as f64;
        (x, y)
    }
}

/// Rasterize the scene's layers into an equirectangular preview.
pub fn render_preview(scene: &Scene, width: u32, height: u32) -> RgbaImage {
    let frame = Frame::around(scene);
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    for layer in &scene.layers {
        match layer.kind {
            LayerKind::GeoJsonLayer => draw_outlines(&mut img, &frame, layer),
            LayerKind::ScatterplotLayer => draw_points(&mut img, &frame, layer),
        }
    }

    img
}

pub fn save_preview(scene: &Scene, path: &Path) -> Result<()> {
    let img = render_preview(scene, PREVIEW_WIDTH, PREVIEW_HEIGHT);
    img.save(path).with_context(|| format!("Failed to save preview {:?}", path))?;
    Ok(())
}

fn rings(value: &geojson::Value) -> Vec<&Vec<Vec<f64>>> {
    match value {
        geojson::Value::Polygon(rings) => rings.iter().collect(),
        geojson::Value::MultiPolygon(polys) => polys.iter().flatten().collect(),
        _ => Vec::new(),
    }
}

fn draw_outlines(img: &mut RgbaImage, frame: &Frame, layer: &Layer) {
    let color = match layer.style.line_color {
        Some(c) => c,
        None => return,
    };
    let (w, h) = img.dimensions();

    for feature in &layer.data.features {
        let Some(geometry) = &feature.geometry else { continue };
        for ring in rings(&geometry.value) {
            for pair in ring.windows(2) {
                let a = frame.to_pixel(pair[0][0], pair[0][1], w, h);
                let b = frame.to_pixel(pair[1][0], pair[1][1], w, h);
                draw_line(img, a, b, color);
            }
        }
    }
}

fn draw_points(img: &mut RgbaImage, frame: &Frame, layer: &Layer) {
    let color = match layer.style.fill_color {
        Some(c) => c,
        None => return,
    };
    let (w, h) = img.dimensions();

    for feature in &layer.data.features {
        let Some(geometry) = &feature.geometry else { continue };
        if let geojson::Value::Point(pos) = &geometry.value {
            let (x, y) = frame.to_pixel(pos[0], pos[1], w, h);
            for dy in -2..=2 {
                for dx in -2..=2 {
                    blend(img, x as i64 + dx, y as i64 + dy, color);
                }
            }
        }
    }
}

fn draw_line(img: &mut RgbaImage, a: (f64, f64), b: (f64, f64), color: LayerColor) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0);
    // skip segments that jump across the frame (antimeridian wrap)
    if steps > (img.width() as f64) {
        return;
    }
    let n = steps as i64;
    for i in 0..=n {
        let t = i as f64 / steps;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        blend(img, x.round() as i64, y.round() as i64, color);
    }
}

fn blend(img: &mut RgbaImage, x: i64, y: i64, color: LayerColor) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    let alpha = color[3] as f64 / 255.0;
    for c in 0..3 {
        let mixed = px.0[c] as f64 * (1.0 - alpha) + color[c] as f64 * alpha;
        px.0[c] = mixed.round() as u8;
    }
    px.0[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlsConfig;
    use crate::data::Dataset;
    use crate::scene::{render_scene, RenderOutcome, RenderRequest};
    use crate::types::{Region, SamplePoint};
    use geo::{polygon, MultiPolygon};

    fn scene() -> Scene {
        let dataset = Dataset {
            regions: vec![Region {
                name: "Alpha".to_string(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: 0.0, y: 0.0),
                    (x: 10.0, y: 0.0),
                    (x: 10.0, y: 10.0),
                    (x: 0.0, y: 10.0),
                    (x: 0.0, y: 0.0),
                ]]),
            }],
            points: vec![SamplePoint { id: 0, lat: 5.0, lon: 5.0 }],
        };
        let controls = ControlsConfig::default();
        let request = RenderRequest::with_defaults("Alpha", &controls);
        match render_scene(&dataset, &controls, &request).unwrap() {
            RenderOutcome::Rendered(scene) => scene,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_frame_centred_on_view() {
        let scene = scene();
        let frame = Frame::around(&scene);
        assert!(((frame.min_lon + frame.max_lon) / 2.0 - 5.0).abs() < 1e-9);
        assert!(((frame.min_lat + frame.max_lat) / 2.0 - 5.0).abs() < 1e-9);
        assert!(frame.min_lon < 0.0 && frame.max_lon > 10.0);
    }

    #[test]
    fn test_preview_draws_layers() {
        let scene = scene();
        let img = render_preview(&scene, 200, 100);
        assert_eq!(img.dimensions(), (200, 100));
        // inside point sits at the frame centre
        assert_ne!(*img.get_pixel(100, 50), BACKGROUND);
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_blend_out_of_bounds_is_ignored() {
        let mut img = RgbaImage::from_pixel(4, 4, BACKGROUND);
        blend(&mut img, -1, 10, [255, 0, 0, 255]);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
        blend(&mut img, 1, 1, [255, 0, 0, 255]);
        assert_eq!(*img.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    }
}
