use crate::projection::{project, unproject};
use crate::selection::Selection;
use geo::{Buffer, MultiPolygon};

/// Grow the selection outward by `distance_km`, measured in Web Mercator
/// meters, and return the result in geographic coordinates.
///
/// Mercator distorts distances away from the equator; the buffer is a visual
/// aid only and is never used for membership.
pub fn buffer_selection(selection: &Selection, distance_km: f64) -> MultiPolygon<f64> {
    let projected = project(&selection.to_multi_polygon());
    if distance_km <= 0.0 {
        return unproject(&projected);
    }
    let grown = projected.buffer(distance_km * 1000.0);
    unproject(&grown)
}
