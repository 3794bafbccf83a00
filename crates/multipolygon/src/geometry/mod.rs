//! Geometry capabilities the assembly algorithm relies on.
//!
//! The ring assembler, containment classifier and polygon builder only talk
//! to [`GeometryKernel`]; [`PlanarKernel`] is the implementation backed by the
//! `geo` crate. With the `geos` feature, [`GeosKernel`] runs the line and
//! polygon predicates through GEOS instead.

#[cfg(feature = "geos")]
mod geos_kernel;
mod planar;
mod polygonize;
mod segments;

#[cfg(feature = "geos")]
pub use geos_kernel::GeosKernel;
pub use planar::PlanarKernel;

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};

/// How the boundaries of two rings meet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingIntersection {
    Disjoint,
    /// Only isolated points in common
    Points,
    /// Only shared line segments in common
    Lines,
    /// Shared segments plus additional isolated points
    Mixed,
}

/// Rings smaller than this are considered degenerate
pub(crate) const AREA_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("{0} operation panicked")]
    OperationPanicked(&'static str),

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

pub trait GeometryKernel {
    /// True if the line through `coords` does not cross or touch itself,
    /// apart from a closed line meeting at its end points.
    fn is_simple(&self, coords: &[Coord<f64>]) -> bool;

    /// Closed, at least three distinct points, simple and with non-zero area
    fn is_valid_ring(&self, ring: &LineString<f64>) -> bool;

    fn is_ccw(&self, ring: &LineString<f64>) -> bool;

    fn contains(&self, outer: &Polygon<f64>, inner: &Polygon<f64>) -> Result<bool, GeometryError>;

    fn boundary_intersection(&self, a: &LineString<f64>, b: &LineString<f64>) -> RingIntersection;

    /// Segments that belong to exactly one of the two boundaries
    fn boundary_symmetric_difference(
        &self,
        a: &LineString<f64>,
        b: &LineString<f64>,
    ) -> MultiLineString<f64>;

    /// Polygons enclosed by a set of noded line segments
    fn polygonize(&self, lines: &MultiLineString<f64>) -> Vec<Polygon<f64>>;

    fn is_valid_polygon(&self, polygon: &Polygon<f64>) -> Result<bool, GeometryError>;

    fn is_valid_multipolygon(&self, multipolygon: &MultiPolygon<f64>) -> Result<bool, GeometryError>;
}

/// Key for coordinate-based matching
/// Uses fixed-point representation to avoid floating point issues
pub(crate) fn coord_key(coord: &Coord<f64>) -> (i64, i64) {
    // 7 decimal places precision (sub-meter)
    let x = (coord.x * 10_000_000.0).round() as i64;
    let y = (coord.y * 10_000_000.0).round() as i64;
    (x, y)
}

/// Drop consecutive repeated points
pub(crate) fn dedup_coords(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    for c in coords {
        if out.last() != Some(c) {
            out.push(*c);
        }
    }
    out
}

/// Reverse the point order of a ring
pub(crate) fn reversed(ring: &LineString<f64>) -> LineString<f64> {
    let mut coords = ring.0.clone();
    coords.reverse();
    LineString::new(coords)
}
