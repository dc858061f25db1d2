use geo::{Coord, MapCoords, MultiPolygon};
use std::f64::consts::PI;

pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

pub fn to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let lat_rad = lat.to_radians();
    Coord {
        x: c.x * EARTH_MERCATOR_MAX / 180.0,
        y: (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() * EARTH_MERCATOR_MAX / PI,
    }
}

pub fn to_wgs84(c: Coord<f64>) -> Coord<f64> {
    let lat = (PI / 2.0 - 2.0 * (-c.y * PI / EARTH_MERCATOR_MAX).exp().atan()).to_degrees();
    Coord { x: c.x * 180.0 / EARTH_MERCATOR_MAX, y: lat }
}

pub fn project(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(to_mercator)
}

pub fn unproject(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(to_wgs84)
}
