use crate::types::ViewState;

pub const MIN_SPAN_DEG: f64 = 0.1;
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 8.0;

/// Rough map view for a bounding box in degrees.
///
/// The zoom maps a full 360 degree span to level 0 and halves the span per
/// level, clamped to [2, 8]. The center is the bbox midpoint, not a centroid.
pub fn view_from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ViewState {
    let latitude = (min_y + max_y) / 2.0;
    let longitude = (min_x + max_x) / 2.0;
    let span = (max_x - min_x).max(max_y - min_y).max(MIN_SPAN_DEG);
    let zoom = (360.0 / span).log2().clamp(MIN_ZOOM, MAX_ZOOM);
    ViewState { latitude, longitude, zoom }
}
