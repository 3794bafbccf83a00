use super::{dedup_coords, polygonize, segments, GeometryError, GeometryKernel, RingIntersection, AREA_EPSILON};
use geo::{Area, BooleanOps, Contains, Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use std::panic;

/// Planar geometry on lon/lat coordinates using the `geo` crate
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarKernel;

/// Run a geo operation, turning a panic into an error.
/// The boolean operations can panic on degenerate input.
fn guarded<T>(operation: &'static str, f: impl FnOnce() -> T) -> Result<T, GeometryError> {
    panic::catch_unwind(panic::AssertUnwindSafe(f)).map_err(|_| {
        log::debug!("geo {} panicked", operation);
        GeometryError::OperationPanicked(operation)
    })
}

fn overlap_area(a: &Polygon<f64>, b: &Polygon<f64>) -> Result<f64, GeometryError> {
    guarded("intersection", || a.intersection(b).unsigned_area())
}

impl PlanarKernel {
    fn touches_along_lines(&self, a: &LineString<f64>, b: &LineString<f64>) -> bool {
        matches!(
            self.boundary_intersection(a, b),
            RingIntersection::Lines | RingIntersection::Mixed
        )
    }
}

impl GeometryKernel for PlanarKernel {
    fn is_simple(&self, coords: &[Coord<f64>]) -> bool {
        segments::is_simple(coords)
    }

    fn is_valid_ring(&self, ring: &LineString<f64>) -> bool {
        let points = dedup_coords(&ring.0);
        if points.len() < 4 || points.first() != points.last() {
            return false;
        }
        if !segments::is_simple(&points) {
            return false;
        }
        Polygon::new(LineString::new(points), vec![]).unsigned_area() > AREA_EPSILON
    }

    /// Check if a ring is counter-clockwise (positive area in standard orientation)
    fn is_ccw(&self, ring: &LineString<f64>) -> bool {
        let coords: Vec<_> = ring.coords().collect();
        if coords.len() < 3 {
            return false;
        }

        // Shoelace formula
        let mut sum = 0.0;
        for i in 0..coords.len() - 1 {
            let p1 = coords[i];
            let p2 = coords[i + 1];
            sum += (p2.x - p1.x) * (p2.y + p1.y);
        }
        sum < 0.0
    }

    fn contains(&self, outer: &Polygon<f64>, inner: &Polygon<f64>) -> Result<bool, GeometryError> {
        guarded("contains", || outer.contains(inner))
    }

    fn boundary_intersection(&self, a: &LineString<f64>, b: &LineString<f64>) -> RingIntersection {
        segments::classify(&a.0, &b.0)
    }

    fn boundary_symmetric_difference(
        &self,
        a: &LineString<f64>,
        b: &LineString<f64>,
    ) -> MultiLineString<f64> {
        segments::symmetric_difference(&a.0, &b.0)
    }

    fn polygonize(&self, lines: &MultiLineString<f64>) -> Vec<Polygon<f64>> {
        polygonize::polygonize(lines)
    }

    fn is_valid_polygon(&self, polygon: &Polygon<f64>) -> Result<bool, GeometryError> {
        let exterior = polygon.exterior();
        if !self.is_valid_ring(exterior) {
            return Ok(false);
        }
        let shell = Polygon::new(exterior.clone(), vec![]);

        let holes: Vec<Polygon<f64>> = polygon
            .interiors()
            .iter()
            .map(|ring| Polygon::new(ring.clone(), vec![]))
            .collect();

        for hole in &holes {
            if !self.is_valid_ring(hole.exterior()) {
                return Ok(false);
            }
            if self.touches_along_lines(exterior, hole.exterior()) {
                return Ok(false);
            }
            if !self.contains(&shell, hole)? {
                return Ok(false);
            }
        }

        for (i, a) in holes.iter().enumerate() {
            for b in &holes[i + 1..] {
                if self.touches_along_lines(a.exterior(), b.exterior()) {
                    return Ok(false);
                }
                if overlap_area(a, b)? > AREA_EPSILON {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn is_valid_multipolygon(&self, multipolygon: &MultiPolygon<f64>) -> Result<bool, GeometryError> {
        for polygon in multipolygon {
            if !self.is_valid_polygon(polygon)? {
                return Ok(false);
            }
        }

        let polygons = &multipolygon.0;
        for (i, a) in polygons.iter().enumerate() {
            for b in &polygons[i + 1..] {
                if self.touches_along_lines(a.exterior(), b.exterior()) {
                    return Ok(false);
                }
                if overlap_area(a, b)? > AREA_EPSILON {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
