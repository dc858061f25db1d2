use geo::{MultiPolygon, Polygon};
use serde::Serialize;

/// A named country boundary in geographic coordinates (x = lon, y = lat).
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub id: u32,
    pub lat: f64,
    pub lon: f64,
}

/// A single polygon part of the selected region.
#[derive(Debug, Clone)]
pub struct SelectedPart {
    pub name: String,
    pub polygon: Polygon<f64>,
}

/// One row of the joined table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipRow {
    pub id: u32,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub inside: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
}
