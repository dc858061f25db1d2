use crate::types::{Region, SelectedPart, ViewState};
use crate::view::view_from_bounds;
use geo::algorithm::bool_ops::{FillRule, OpType};
use geo::algorithm::orient::Direction;
use geo::{BooleanOps, BoundingRect, MultiPolygon, Orient, Rect};

/// The polygon parts of the chosen region, after repair and explode.
#[derive(Debug, Clone)]
pub struct Selection {
    pub name: String,
    pub parts: Vec<SelectedPart>,
}

/// Filter to `name`, repair the matches and split them into single parts.
///
/// Returns `None` when no region carries that exact name.
pub fn select_region(regions: &[Region], name: &str) -> Option<Selection> {
    let matches: Vec<&Region> = regions.iter().filter(|r| r.name == name).collect();
    if matches.is_empty() {
        return None;
    }

    let parts = matches
        .into_iter()
        .flat_map(|region| {
            repair(&region.geometry)
                .into_iter()
                .map(move |polygon| SelectedPart { name: region.name.clone(), polygon })
        })
        .collect();

    Some(Selection { name: name.to_string(), parts })
}

/// Resolve self-intersections by running the geometry through a union.
///
/// Overlapping parts merge rather than cancel out. Rings are oriented first so
/// holes wind opposite to their exterior and stay empty under non-zero fill.
pub fn repair(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.orient(Direction::Default).boolean_op_with_fill_rule(
        &MultiPolygon::new(Vec::new()),
        OpType::Union,
        FillRule::NonZero,
    )
}

impl Selection {
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.parts.iter().map(|p| p.polygon.clone()).collect())
    }

    /// Total bounds over every part.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.to_multi_polygon().bounding_rect()
    }

    pub fn view(&self) -> Option<ViewState> {
        self.bounds()
            .map(|r| view_from_bounds(r.min().x, r.min().y, r.max().x, r.max().y))
    }
}
