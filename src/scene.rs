use crate::buffer::buffer_selection;
use crate::config::ControlsConfig;
use crate::data::Dataset;
use crate::error::DemoError;
use crate::join::{count_inside, join_points};
use crate::selection::{select_region, Selection};
use crate::types::{MembershipRow, Region, ViewState};
use crate::view::view_from_bounds;
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, JsonObject};
use serde::Serialize;
use tracing::debug;

pub type Rgba = [u8; 4];

pub const BOUNDARY_LINE: Rgba = [100, 100, 100, 120];
pub const SELECTION_FILL: Rgba = [30, 144, 255, 60];
pub const SELECTION_LINE: Rgba = [30, 144, 255, 200];
pub const BUFFER_LINE: Rgba = [255, 140, 0, 180];
pub const INSIDE_FILL: Rgba = [0, 122, 255, 180];
pub const OUTSIDE_FILL: Rgba = [120, 120, 120, 120];

pub const INSIDE_RADIUS_M: u32 = 20_000;
pub const OUTSIDE_RADIUS_M: u32 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    AllRegions,
    Selection,
    Buffer,
    InsidePoints,
    OutsidePoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerKind {
    GeoJsonLayer,
    ScatterplotLayer,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerStyle {
    pub stroked: bool,
    pub filled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width_min_pixels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_m: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: LayerId,
    pub kind: LayerKind,
    pub style: LayerStyle,
    pub data: FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub points_inside: usize,
    pub total_points: usize,
    pub buffer_km: u32,
}

/// Control values for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub region: String,
    pub buffer_km: u32,
    pub show_all_regions: bool,
    pub show_points_outside: bool,
}

impl RenderRequest {
    pub fn with_defaults(region: impl Into<String>, controls: &ControlsConfig) -> Self {
        Self {
            region: region.into(),
            buffer_km: controls.buffer_km,
            show_all_regions: controls.show_all_regions,
            show_points_outside: controls.show_points_outside,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub region: String,
    pub layers: Vec<Layer>,
    pub metrics: Metrics,
    pub view: ViewState,
    #[serde(skip)]
    pub rows: Vec<MembershipRow>,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Rendered(Scene),
    NoSuchRegion { name: String },
}

pub fn render_scene(
    dataset: &Dataset,
    controls: &ControlsConfig,
    request: &RenderRequest,
) -> Result<RenderOutcome, DemoError> {
    if !controls.accepts_buffer(request.buffer_km) {
        return Err(DemoError::InvalidBuffer {
            buffer_km: request.buffer_km,
            min: controls.buffer_min_km,
            max: controls.buffer_max_km,
            step: controls.buffer_step_km,
        });
    }

    let selection = match select_region(&dataset.regions, &request.region) {
        Some(sel) => sel,
        None => return Ok(RenderOutcome::NoSuchRegion { name: request.region.clone() }),
    };
    debug!("Selected '{}' with {} parts", selection.name, selection.parts.len());

    let buffered = buffer_selection(&selection, request.buffer_km as f64);
    let rows = join_points(&dataset.points, &selection);
    let view = selection
        .view()
        .unwrap_or_else(|| view_from_bounds(0.0, 0.0, 0.0, 0.0));

    let mut layers = Vec::new();
    if request.show_all_regions {
        layers.push(regions_layer(&dataset.regions));
    }
    layers.push(selection_layer(&selection));
    if request.buffer_km > 0 {
        layers.push(buffer_layer(&buffered));
    }

    let (inside, outside): (Vec<&MembershipRow>, Vec<&MembershipRow>) =
        rows.iter().partition(|r| r.inside);
    if !inside.is_empty() {
        layers.push(points_layer(LayerId::InsidePoints, &inside, INSIDE_FILL, INSIDE_RADIUS_M));
    }
    if request.show_points_outside && !outside.is_empty() {
        layers.push(points_layer(LayerId::OutsidePoints, &outside, OUTSIDE_FILL, OUTSIDE_RADIUS_M));
    }

    let metrics = Metrics {
        points_inside: count_inside(&rows),
        total_points: rows.len(),
        buffer_km: request.buffer_km,
    };

    Ok(RenderOutcome::Rendered(Scene {
        region: selection.name,
        layers,
        metrics,
        view,
        rows,
    }))
}

fn polygon_feature(geometry: geojson::Value, name: Option<&str>) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(name) = name {
        properties.insert("name".to_string(), name.into());
    }
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection { bbox: None, features, foreign_members: None }
}

fn regions_layer(regions: &[Region]) -> Layer {
    let features = regions
        .iter()
        .map(|r| polygon_feature(geojson::Value::from(&r.geometry), Some(&r.name)))
        .collect();
    Layer {
        id: LayerId::AllRegions,
        kind: LayerKind::GeoJsonLayer,
        style: LayerStyle {
            stroked: true,
            line_color: Some(BOUNDARY_LINE),
            line_width_min_pixels: Some(1),
            ..LayerStyle::default()
        },
        data: collection(features),
    }
}

fn selection_layer(selection: &Selection) -> Layer {
    let features = selection
        .parts
        .iter()
        .map(|p| polygon_feature(geojson::Value::from(&p.polygon), Some(&p.name)))
        .collect();
    Layer {
        id: LayerId::Selection,
        kind: LayerKind::GeoJsonLayer,
        style: LayerStyle {
            stroked: true,
            filled: true,
            fill_color: Some(SELECTION_FILL),
            line_color: Some(SELECTION_LINE),
            line_width_min_pixels: Some(2),
            ..LayerStyle::default()
        },
        data: collection(features),
    }
}

fn buffer_layer(buffered: &MultiPolygon<f64>) -> Layer {
    let features = buffered
        .iter()
        .map(|p| polygon_feature(geojson::Value::from(p), None))
        .collect();
    Layer {
        id: LayerId::Buffer,
        kind: LayerKind::GeoJsonLayer,
        style: LayerStyle {
            stroked: true,
            line_color: Some(BUFFER_LINE),
            line_width_min_pixels: Some(2),
            ..LayerStyle::default()
        },
        data: collection(features),
    }
}

fn points_layer(id: LayerId, rows: &[&MembershipRow], fill: Rgba, radius_m: u32) -> Layer {
    let features = rows
        .iter()
        .map(|r| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), r.id.into());
            properties.insert("lat".to_string(), r.lat.into());
            properties.insert("lon".to_string(), r.lon.into());
            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![r.lon, r.lat]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    Layer {
        id,
        kind: LayerKind::ScatterplotLayer,
        style: LayerStyle {
            filled: true,
            fill_color: Some(fill),
            radius_m: Some(radius_m),
            ..LayerStyle::default()
        },
        data: collection(features),
    }
}

impl Scene {
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Every layer flattened into one collection, tagged with a `layer` property.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::new();
        for layer in &self.layers {
            let tag = serde_json::to_value(layer.id).unwrap_or_default();
            for feature in &layer.data.features {
                let mut feature = feature.clone();
                feature
                    .properties
                    .get_or_insert_with(JsonObject::new)
                    .insert("layer".to_string(), tag.clone());
                features.push(feature);
            }
        }
        collection(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SamplePoint;
    use geo::polygon;

    fn dataset() -> Dataset {
        let square = |x0: f64, y0: f64, size: f64| {
            MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + size, y: y0),
                (x: x0 + size, y: y0 + size),
                (x: x0, y: y0 + size),
                (x: x0, y: y0),
            ]])
        };
        Dataset {
            regions: vec![
                Region { name: "Alpha".to_string(), geometry: square(0.0, 0.0, 10.0) },
                Region { name: "Beta".to_string(), geometry: square(20.0, 20.0, 5.0) },
            ],
            points: vec![
                SamplePoint { id: 0, lat: 5.0, lon: 5.0 },
                // just outside Alpha but inside any reasonable buffer
                SamplePoint { id: 1, lat: 5.0, lon: 10.2 },
                SamplePoint { id: 2, lat: 22.0, lon: 22.0 },
            ],
        }
    }

    fn render(request: &RenderRequest) -> Scene {
        match render_scene(&dataset(), &ControlsConfig::default(), request).unwrap() {
            RenderOutcome::Rendered(scene) => scene,
            RenderOutcome::NoSuchRegion { name } => panic!("no region {name}"),
        }
    }

    fn layer_ids(scene: &Scene) -> Vec<LayerId> {
        scene.layers.iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_default_layer_stack() {
        let scene = render(&RenderRequest::with_defaults("Alpha", &ControlsConfig::default()));
        assert_eq!(
            layer_ids(&scene),
            vec![LayerId::AllRegions, LayerId::Selection, LayerId::Buffer, LayerId::InsidePoints]
        );
        assert_eq!(scene.metrics, Metrics { points_inside: 1, total_points: 3, buffer_km: 50 });
    }

    #[test]
    fn test_zero_buffer_skips_buffer_layer() {
        let mut request = RenderRequest::with_defaults("Alpha", &ControlsConfig::default());
        request.buffer_km = 0;
        let scene = render(&request);
        assert!(scene.layer(LayerId::Buffer).is_none());
    }

    #[test]
    fn test_toggles() {
        let request = RenderRequest {
            region: "Alpha".to_string(),
            buffer_km: 10,
            show_all_regions: false,
            show_points_outside: true,
        };
        let scene = render(&request);
        assert!(scene.layer(LayerId::AllRegions).is_none());
        let outside = scene.layer(LayerId::OutsidePoints).unwrap();
        assert_eq!(outside.data.features.len(), 2);
        assert_eq!(outside.style.radius_m, Some(OUTSIDE_RADIUS_M));
    }

    #[test]
    fn test_no_inside_points_omits_layer() {
        let mut ds = dataset();
        ds.points.retain(|p| p.id != 0);
        let request = RenderRequest::with_defaults("Alpha", &ControlsConfig::default());
        match render_scene(&ds, &ControlsConfig::default(), &request).unwrap() {
            RenderOutcome::Rendered(scene) => {
                assert!(scene.layer(LayerId::InsidePoints).is_none());
                assert_eq!(scene.metrics.points_inside, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_inside_count_ignores_buffer() {
        let counts: Vec<usize> = (0..=200)
            .step_by(10)
            .map(|km| {
                let mut request = RenderRequest::with_defaults("Alpha", &ControlsConfig::default());
                request.buffer_km = km;
                render(&request).metrics.points_inside
            })
            .collect();
        assert!(counts.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_unknown_region() {
        let request = RenderRequest::with_defaults("Gamma", &ControlsConfig::default());
        let outcome = render_scene(&dataset(), &ControlsConfig::default(), &request).unwrap();
        assert!(matches!(outcome, RenderOutcome::NoSuchRegion { name } if name == "Gamma"));
    }

    #[test]
    fn test_invalid_buffer_rejected() {
        let mut request = RenderRequest::with_defaults("Alpha", &ControlsConfig::default());
        request.buffer_km = 45;
        let err = render_scene(&dataset(), &ControlsConfig::default(), &request).unwrap_err();
        assert!(matches!(err, DemoError::InvalidBuffer { buffer_km: 45, .. }));
    }

    #[test]
    fn test_view_fits_selection() {
        let scene = render(&RenderRequest::with_defaults("Alpha", &ControlsConfig::default()));
        assert_eq!(scene.view.latitude, 5.0);
        assert_eq!(scene.view.longitude, 5.0);
        assert!((scene.view.zoom - 36.0_f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_merged_collection_tags_layers() {
        let scene = render(&RenderRequest::with_defaults("Alpha", &ControlsConfig::default()));
        let fc = scene.to_feature_collection();
        let total: usize = scene.layers.iter().map(|l| l.data.features.len()).sum();
        assert_eq!(fc.features.len(), total);
        let first = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(first.get("layer").unwrap(), "all_regions");
    }

    #[test]
    fn test_scene_json_shape() {
        let scene = render(&RenderRequest::with_defaults("Alpha", &ControlsConfig::default()));
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["metrics"]["total_points"], 3);
        assert_eq!(json["layers"][1]["kind"], "GeoJsonLayer");
        assert_eq!(json["layers"][1]["style"]["fill_color"][2], 255);
        assert!(json.get("rows").is_none());
    }
}
