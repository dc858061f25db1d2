use crate::selection::Selection;
use crate::types::{MembershipRow, SamplePoint};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

// Bounding box of one selection part, pointing back at it by index.
struct PartIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for PartIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn build_index(selection: &Selection) -> RTree<PartIndex> {
    let items: Vec<PartIndex> = selection
        .parts
        .iter()
        .enumerate()
        .filter_map(|(i, part)| {
            let rect = part.polygon.bounding_rect()?;
            Some(PartIndex {
                index: i,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    RTree::bulk_load(items)
}

/// Left join every sample point against the (unbuffered) selection.
///
/// Yields exactly one row per point, in input order. A point on a part's
/// boundary is not inside.
pub fn join_points(points: &[SamplePoint], selection: &Selection) -> Vec<MembershipRow> {
    let tree = build_index(selection);

    points
        .par_iter()
        .map(|p| {
            let point = Point::new(p.lon, p.lat);
            let envelope = AABB::from_point([p.lon, p.lat]);

            let mut hits: Vec<usize> = tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|c| c.index)
                .filter(|&i| selection.parts[i].polygon.contains(&point))
                .collect();
            hits.sort_unstable();

            let name = hits.first().map(|&i| selection.parts[i].name.clone());
            MembershipRow {
                id: p.id,
                lat: p.lat,
                lon: p.lon,
                inside: name.is_some(),
                name,
            }
        })
        .collect()
}

pub fn count_inside(rows: &[MembershipRow]) -> usize {
    rows.iter().filter(|r| r.inside).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SelectedPart;
    use geo::polygon;

    fn selection() -> Selection {
        let part = |x0: f64| SelectedPart {
            name: "Twin".to_string(),
            polygon: polygon![
                (x: x0, y: 0.0),
                (x: x0 + 1.0, y: 0.0),
                (x: x0 + 1.0, y: 1.0),
                (x: x0, y: 1.0),
                (x: x0, y: 0.0),
            ],
        };
        Selection { name: "Twin".to_string(), parts: vec![part(0.0), part(5.0)] }
    }

    fn pt(id: u32, lon: f64, lat: f64) -> SamplePoint {
        SamplePoint { id, lat, lon }
    }

    #[test]
    fn test_one_row_per_point_in_order() {
        let points = vec![pt(0, 0.5, 0.5), pt(1, 3.0, 0.5), pt(2, 5.5, 0.5)];
        let rows = join_points(&points, &selection());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_any_part_counts_as_inside() {
        let points = vec![pt(0, 0.5, 0.5), pt(1, 3.0, 0.5), pt(2, 5.5, 0.5)];
        let rows = join_points(&points, &selection());
        assert!(rows[0].inside);
        assert_eq!(rows[0].name.as_deref(), Some("Twin"));
        assert!(!rows[1].inside);
        assert_eq!(rows[1].name, None);
        assert!(rows[2].inside);
        assert_eq!(count_inside(&rows), 2);
    }

    #[test]
    fn test_boundary_point_is_outside() {
        let rows = join_points(&[pt(0, 1.0, 0.5)], &selection());
        assert!(!rows[0].inside);
    }

    #[test]
    fn test_coordinates_are_carried_through() {
        let rows = join_points(&[pt(9, 0.25, 0.75)], &selection());
        assert_eq!((rows[0].lat, rows[0].lon), (0.75, 0.25));
    }

    #[test]
    fn test_empty_selection_marks_all_outside() {
        let sel = Selection { name: "Void".to_string(), parts: Vec::new() };
        let rows = join_points(&[pt(0, 0.5, 0.5)], &sel);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].inside);
    }
}
