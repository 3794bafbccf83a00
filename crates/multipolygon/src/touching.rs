//! Merge inner rings of one outer ring that share boundary segments.

use crate::geometry::{GeometryKernel, RingIntersection};
use crate::ring::{Direction, RingInfo};
use geo::Polygon;

/// Repeatedly merge the first pair of touching inner rings of `outer` until
/// no pair touches along a line. Returns the number of merges.
pub fn merge_touching_inner_rings<K: GeometryKernel>(
    kernel: &K,
    rings: &mut [RingInfo],
    outer: usize,
) -> usize {
    let mut merges = 0;
    while let Some((keep, drop, merged)) = find_mergeable_pair(kernel, rings, outer) {
        log::debug!("Merging touching inner rings {} and {}", keep, drop);
        let direction = Direction::of(kernel, merged.exterior());
        rings[keep].polygon = Some(merged);
        rings[keep].direction = direction;

        let ways = std::mem::take(&mut rings[drop].ways);
        rings[keep].ways.extend(ways);
        rings[drop].polygon = None;
        rings[drop].contained_by = None;
        rings[outer].inner_rings.retain(|&r| r != drop);
        merges += 1;
    }
    merges
}

fn find_mergeable_pair<K: GeometryKernel>(
    kernel: &K,
    rings: &[RingInfo],
    outer: usize,
) -> Option<(usize, usize, Polygon<f64>)> {
    let inner = &rings[outer].inner_rings;
    for (n, &a) in inner.iter().enumerate() {
        let Some(ring_a) = rings[a].exterior() else {
            continue;
        };
        for &b in &inner[n + 1..] {
            let Some(ring_b) = rings[b].exterior() else {
                continue;
            };
            if kernel.boundary_intersection(ring_a, ring_b) != RingIntersection::Lines {
                continue;
            }
            let lines = kernel.boundary_symmetric_difference(ring_a, ring_b);
            match kernel.polygonize(&lines).as_slice() {
                [merged] if merged.interiors().is_empty() => return Some((a, b, merged.clone())),
                [merged] => log::debug!(
                    "Touching inner rings {} and {} would merge around {} islands, left as is",
                    a,
                    b,
                    merged.interiors().len()
                ),
                parts => log::debug!(
                    "Touching inner rings {} and {} polygonize into {} parts, left as is",
                    a,
                    b,
                    parts.len()
                ),
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarKernel;
    use crate::geometry::GeometryError;
    use approx::assert_relative_eq;
    use geo::{Area, Coord, LineString, MultiLineString, MultiPolygon};

    fn ring(x: f64, y: f64, w: f64, h: f64, ways: Vec<usize>) -> RingInfo {
        outline(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h), (x, y)], ways)
    }

    fn outline(points: &[(f64, f64)], ways: Vec<usize>) -> RingInfo {
        let line = LineString::from(points.to_vec());
        RingInfo {
            polygon: Some(Polygon::new(line, vec![])),
            direction: Direction::CounterClockwise,
            ways,
            inner_rings: Vec::new(),
            contained_by: None,
            parent: None,
            inner: false,
        }
    }

    #[test]
    fn test_adjacent_inner_rings_merge() {
        let mut rings = vec![
            ring(0.0, 0.0, 10.0, 10.0, vec![0]),
            ring(2.0, 2.0, 2.0, 2.0, vec![1]),
            ring(4.0, 2.0, 2.0, 2.0, vec![2]),
        ];
        rings[0].inner_rings = vec![1, 2];

        let merges = merge_touching_inner_rings(&PlanarKernel, &mut rings, 0);
        assert_eq!(merges, 1);
        assert_eq!(rings[0].inner_rings, vec![1]);
        assert!(rings[2].polygon.is_none());
        assert_eq!(rings[1].ways, vec![1, 2]);

        let merged = rings[1].polygon.as_ref().unwrap();
        assert_relative_eq!(merged.unsigned_area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_corner_touch_is_left_alone() {
        let mut rings = vec![
            ring(0.0, 0.0, 10.0, 10.0, vec![0]),
            ring(2.0, 2.0, 2.0, 2.0, vec![1]),
            ring(4.0, 4.0, 2.0, 2.0, vec![2]),
        ];
        rings[0].inner_rings = vec![1, 2];

        assert_eq!(merge_touching_inner_rings(&PlanarKernel, &mut rings, 0), 0);
        assert_eq!(rings[0].inner_rings, vec![1, 2]);
    }

    #[test]
    fn test_chain_of_three_merges_into_one() {
        let mut rings = vec![
            ring(0.0, 0.0, 10.0, 10.0, vec![0]),
            ring(1.0, 1.0, 2.0, 2.0, vec![1]),
            ring(5.0, 1.0, 2.0, 2.0, vec![2]),
            ring(3.0, 1.0, 2.0, 2.0, vec![3]),
        ];
        rings[0].inner_rings = vec![1, 2, 3];

        assert_eq!(merge_touching_inner_rings(&PlanarKernel, &mut rings, 0), 2);
        assert_eq!(rings[0].inner_rings, vec![1]);
        let merged = rings[1].polygon.as_ref().unwrap();
        assert_relative_eq!(merged.unsigned_area(), 12.0, epsilon = 1e-9);
    }

    /// Two C-shaped rings closing around an island at (7, 7)-(13, 13)
    fn c_shapes() -> Vec<RingInfo> {
        let mut rings = vec![
            ring(0.0, 0.0, 20.0, 20.0, vec![0]),
            outline(
                &[
                    (4.0, 4.0),
                    (10.0, 4.0),
                    (10.0, 7.0),
                    (7.0, 7.0),
                    (7.0, 13.0),
                    (10.0, 13.0),
                    (10.0, 16.0),
                    (4.0, 16.0),
                    (4.0, 4.0),
                ],
                vec![1],
            ),
            outline(
                &[
                    (10.0, 4.0),
                    (16.0, 4.0),
                    (16.0, 16.0),
                    (10.0, 16.0),
                    (10.0, 13.0),
                    (13.0, 13.0),
                    (13.0, 7.0),
                    (10.0, 7.0),
                    (10.0, 4.0),
                ],
                vec![2],
            ),
        ];
        rings[0].inner_rings = vec![1, 2];
        rings
    }

    #[test]
    fn test_rings_around_an_island_are_left_alone() {
        let mut rings = c_shapes();
        assert_eq!(
            PlanarKernel.boundary_intersection(rings[1].exterior().unwrap(), rings[2].exterior().unwrap()),
            RingIntersection::Lines
        );

        assert_eq!(merge_touching_inner_rings(&PlanarKernel, &mut rings, 0), 0);
        assert_eq!(rings[0].inner_rings, vec![1, 2]);
        assert!(rings[2].polygon.is_some());
        assert_eq!(rings[1].ways, vec![1]);
    }

    /// Planar kernel whose polygonize keeps the island as a hole of one polygon
    struct IslandAsHole;

    impl GeometryKernel for IslandAsHole {
        fn is_simple(&self, coords: &[Coord<f64>]) -> bool {
            PlanarKernel.is_simple(coords)
        }

        fn is_valid_ring(&self, ring: &LineString<f64>) -> bool {
            PlanarKernel.is_valid_ring(ring)
        }

        fn is_ccw(&self, ring: &LineString<f64>) -> bool {
            PlanarKernel.is_ccw(ring)
        }

        fn contains(&self, outer: &Polygon<f64>, inner: &Polygon<f64>) -> Result<bool, GeometryError> {
            PlanarKernel.contains(outer, inner)
        }

        fn boundary_intersection(&self, a: &LineString<f64>, b: &LineString<f64>) -> RingIntersection {
            PlanarKernel.boundary_intersection(a, b)
        }

        fn boundary_symmetric_difference(
            &self,
            a: &LineString<f64>,
            b: &LineString<f64>,
        ) -> MultiLineString<f64> {
            PlanarKernel.boundary_symmetric_difference(a, b)
        }

        fn polygonize(&self, lines: &MultiLineString<f64>) -> Vec<Polygon<f64>> {
            PlanarKernel
                .polygonize(lines)
                .into_iter()
                .filter(|p| !p.interiors().is_empty())
                .collect()
        }

        fn is_valid_polygon(&self, polygon: &Polygon<f64>) -> Result<bool, GeometryError> {
            PlanarKernel.is_valid_polygon(polygon)
        }

        fn is_valid_multipolygon(&self, multipolygon: &MultiPolygon<f64>) -> Result<bool, GeometryError> {
            PlanarKernel.is_valid_multipolygon(multipolygon)
        }
    }

    #[test]
    fn test_merge_with_holes_is_refused() {
        let mut rings = c_shapes();
        let lines = PlanarKernel
            .boundary_symmetric_difference(rings[1].exterior().unwrap(), rings[2].exterior().unwrap());
        let polygons = IslandAsHole.polygonize(&lines);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);

        assert_eq!(merge_touching_inner_rings(&IslandAsHole, &mut rings, 0), 0);
        assert_eq!(rings[0].inner_rings, vec![1, 2]);
        assert_relative_eq!(rings[1].polygon.as_ref().unwrap().unsigned_area(), 54.0, epsilon = 1e-9);
    }
}
