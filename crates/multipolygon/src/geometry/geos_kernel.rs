//! GEOS-backed kernel.
//!
//! Simplicity, boundary intersection, symmetric difference, polygonization
//! and validity all go through GEOS. Orientation is a plain shoelace sum and
//! shared with [`PlanarKernel`].

use super::{dedup_coords, GeometryError, GeometryKernel, PlanarKernel, RingIntersection, AREA_EPSILON};
use geo::{Area, Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use geos::{CoordSeq, Geom, Geometry, GeometryTypes};

#[derive(Clone, Copy, Debug, Default)]
pub struct GeosKernel;

fn backend(operation: &'static str) -> impl Fn(geos::Error) -> GeometryError {
    move |e| {
        log::debug!("GEOS {} failed: {}", operation, e);
        GeometryError::Backend {
            operation,
            message: e.to_string(),
        }
    }
}

fn coord_seq(coords: &[Coord<f64>]) -> geos::GResult<CoordSeq> {
    let points: Vec<[f64; 2]> = coords.iter().map(|c| [c.x, c.y]).collect();
    CoordSeq::new_from_vec(&points)
}

fn line_string(coords: &[Coord<f64>]) -> geos::GResult<Geometry> {
    Geometry::create_line_string(coord_seq(coords)?)
}

fn polygon(polygon: &Polygon<f64>) -> geos::GResult<Geometry> {
    let exterior = Geometry::create_linear_ring(coord_seq(&polygon.exterior().0)?)?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| Geometry::create_linear_ring(coord_seq(&ring.0)?))
        .collect::<geos::GResult<Vec<_>>>()?;
    Geometry::create_polygon(exterior, interiors)
}

fn multipolygon(multipolygon: &MultiPolygon<f64>) -> geos::GResult<Geometry> {
    let polygons = multipolygon
        .iter()
        .map(polygon)
        .collect::<geos::GResult<Vec<_>>>()?;
    Geometry::create_multipolygon(polygons)
}

fn read_coords(geometry: &impl Geom) -> geos::GResult<Vec<Coord<f64>>> {
    let seq = geometry.get_coord_seq()?;
    (0..seq.size()?)
        .map(|i| Ok(Coord { x: seq.get_x(i)?, y: seq.get_y(i)? }))
        .collect()
}

fn read_polygon(geometry: &impl Geom) -> geos::GResult<Polygon<f64>> {
    let exterior = LineString::new(read_coords(&geometry.get_exterior_ring()?)?);
    let interiors = (0..geometry.get_num_interior_rings()?)
        .map(|i| Ok(LineString::new(read_coords(&geometry.get_interior_ring_n(i as u32)?)?)))
        .collect::<geos::GResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Flatten every line part of a (possibly nested) collection
fn collect_lines(geometry: &impl Geom, out: &mut Vec<LineString<f64>>) -> geos::GResult<()> {
    match geometry.geometry_type() {
        GeometryTypes::LineString | GeometryTypes::LinearRing => {
            if !geometry.is_empty()? {
                out.push(LineString::new(read_coords(geometry)?));
            }
        }
        GeometryTypes::MultiLineString | GeometryTypes::GeometryCollection => {
            for i in 0..geometry.get_num_geometries()? {
                collect_lines(&geometry.get_geometry_n(i)?, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn collect_polygons(geometry: &impl Geom, out: &mut Vec<Polygon<f64>>) -> geos::GResult<()> {
    match geometry.geometry_type() {
        GeometryTypes::Polygon => {
            if !geometry.is_empty()? {
                out.push(read_polygon(geometry)?);
            }
        }
        GeometryTypes::MultiPolygon | GeometryTypes::GeometryCollection => {
            for i in 0..geometry.get_num_geometries()? {
                collect_polygons(&geometry.get_geometry_n(i)?, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Which dimensions occur in an intersection result: (points, lines)
fn dimensions(geometry: &impl Geom) -> geos::GResult<(bool, bool)> {
    if geometry.is_empty()? {
        return Ok((false, false));
    }
    Ok(match geometry.geometry_type() {
        GeometryTypes::Point | GeometryTypes::MultiPoint => (true, false),
        GeometryTypes::LineString | GeometryTypes::LinearRing | GeometryTypes::MultiLineString => (false, true),
        GeometryTypes::GeometryCollection => {
            let mut found = (false, false);
            for i in 0..geometry.get_num_geometries()? {
                let (points, lines) = dimensions(&geometry.get_geometry_n(i)?)?;
                found = (found.0 || points, found.1 || lines);
            }
            found
        }
        _ => (false, false),
    })
}

impl GeosKernel {
    fn try_is_simple(&self, coords: &[Coord<f64>]) -> geos::GResult<bool> {
        line_string(coords)?.is_simple()
    }

    fn try_boundary_intersection(&self, a: &LineString<f64>, b: &LineString<f64>) -> geos::GResult<RingIntersection> {
        let common = line_string(&a.0)?.intersection(&line_string(&b.0)?)?;
        Ok(match dimensions(&common)? {
            (false, false) => RingIntersection::Disjoint,
            (true, false) => RingIntersection::Points,
            (false, true) => RingIntersection::Lines,
            (true, true) => RingIntersection::Mixed,
        })
    }

    fn try_symmetric_difference(&self, a: &LineString<f64>, b: &LineString<f64>) -> geos::GResult<MultiLineString<f64>> {
        let difference = line_string(&a.0)?.sym_difference(&line_string(&b.0)?)?;
        let mut lines = Vec::new();
        collect_lines(&difference, &mut lines)?;
        Ok(MultiLineString::new(lines))
    }

    fn try_polygonize(&self, lines: &MultiLineString<f64>) -> geos::GResult<Vec<Polygon<f64>>> {
        let inputs = lines
            .iter()
            .filter(|line| line.0.len() >= 2)
            .map(|line| line_string(&line.0))
            .collect::<geos::GResult<Vec<_>>>()?;
        let faces = Geometry::polygonize(inputs.as_slice())?;
        let mut polygons = Vec::new();
        collect_polygons(&faces, &mut polygons)?;
        Ok(polygons)
    }
}

impl GeometryKernel for GeosKernel {
    fn is_simple(&self, coords: &[Coord<f64>]) -> bool {
        if coords.len() < 2 {
            return true;
        }
        self.try_is_simple(coords).unwrap_or_else(|e| {
            log::debug!("GEOS is_simple failed: {}", e);
            false
        })
    }

    fn is_valid_ring(&self, ring: &LineString<f64>) -> bool {
        let points = dedup_coords(&ring.0);
        if points.len() < 4 || points.first() != points.last() {
            return false;
        }
        let shell = Polygon::new(LineString::new(points), vec![]);
        if shell.unsigned_area() <= AREA_EPSILON {
            return false;
        }
        polygon(&shell).map(|g| g.is_valid()).unwrap_or(false)
    }

    fn is_ccw(&self, ring: &LineString<f64>) -> bool {
        PlanarKernel.is_ccw(ring)
    }

    fn contains(&self, outer: &Polygon<f64>, inner: &Polygon<f64>) -> Result<bool, GeometryError> {
        let outer = polygon(outer).map_err(backend("contains"))?;
        let inner = polygon(inner).map_err(backend("contains"))?;
        outer.contains(&inner).map_err(backend("contains"))
    }

    fn boundary_intersection(&self, a: &LineString<f64>, b: &LineString<f64>) -> RingIntersection {
        self.try_boundary_intersection(a, b).unwrap_or_else(|e| {
            log::debug!("GEOS intersection failed: {}", e);
            RingIntersection::Mixed
        })
    }

    fn boundary_symmetric_difference(
        &self,
        a: &LineString<f64>,
        b: &LineString<f64>,
    ) -> MultiLineString<f64> {
        self.try_symmetric_difference(a, b).unwrap_or_else(|e| {
            log::debug!("GEOS sym_difference failed: {}", e);
            MultiLineString::new(vec![])
        })
    }

    fn polygonize(&self, lines: &MultiLineString<f64>) -> Vec<Polygon<f64>> {
        self.try_polygonize(lines).unwrap_or_else(|e| {
            log::debug!("GEOS polygonize failed: {}", e);
            Vec::new()
        })
    }

    fn is_valid_polygon(&self, candidate: &Polygon<f64>) -> Result<bool, GeometryError> {
        let geometry = polygon(candidate).map_err(backend("is_valid"))?;
        Ok(geometry.is_valid())
    }

    fn is_valid_multipolygon(&self, candidate: &MultiPolygon<f64>) -> Result<bool, GeometryError> {
        let geometry = multipolygon(candidate).map_err(backend("is_valid"))?;
        Ok(geometry.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::reversed;
    use approx::assert_relative_eq;

    fn ring(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(points.to_vec())
    }

    fn square(x: f64, y: f64, size: f64) -> LineString<f64> {
        ring(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size), (x, y)])
    }

    #[test]
    fn test_simplicity_matches_planar() {
        let shapes = [
            square(0.0, 0.0, 1.0),
            // bowtie
            ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]),
            // open line
            ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
        ];
        for shape in &shapes {
            assert_eq!(GeosKernel.is_simple(&shape.0), PlanarKernel.is_simple(&shape.0));
        }
        assert!(!GeosKernel.is_simple(&shapes[1].0));
    }

    #[test]
    fn test_boundary_intersection_kinds() {
        let a = square(0.0, 0.0, 2.0);
        assert_eq!(
            GeosKernel.boundary_intersection(&a, &square(2.0, 0.0, 2.0)),
            RingIntersection::Lines
        );
        assert_eq!(
            GeosKernel.boundary_intersection(&a, &square(2.0, 2.0, 2.0)),
            RingIntersection::Points
        );
        assert_eq!(
            GeosKernel.boundary_intersection(&a, &square(5.0, 5.0, 1.0)),
            RingIntersection::Disjoint
        );
    }

    #[test]
    fn test_adjacent_squares_polygonize_into_one() {
        let a = square(2.0, 2.0, 2.0);
        let b = square(4.0, 2.0, 2.0);
        let lines = GeosKernel.boundary_symmetric_difference(&a, &b);
        let polygons = GeosKernel.polygonize(&lines);
        assert_eq!(polygons.len(), 1);
        assert_relative_eq!(polygons[0].unsigned_area(), 8.0, epsilon = 1e-9);

        let planar = PlanarKernel.polygonize(&PlanarKernel.boundary_symmetric_difference(&a, &b));
        assert_eq!(planar.len(), 1);
        assert_relative_eq!(planar[0].unsigned_area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validity() {
        let exterior = square(0.0, 0.0, 10.0);
        let hole = reversed(&square(2.0, 2.0, 2.0));
        assert!(GeosKernel
            .is_valid_polygon(&Polygon::new(exterior.clone(), vec![hole]))
            .unwrap());
        assert!(!GeosKernel
            .is_valid_polygon(&Polygon::new(
                exterior,
                vec![square(2.0, 2.0, 2.0), square(4.0, 2.0, 2.0)]
            ))
            .unwrap());

        let a = Polygon::new(square(0.0, 0.0, 2.0), vec![]);
        let b = Polygon::new(square(1.0, 1.0, 2.0), vec![]);
        assert!(!GeosKernel
            .is_valid_multipolygon(&MultiPolygon::new(vec![a, b]))
            .unwrap());
        assert!(GeosKernel.is_valid_ring(&square(0.0, 0.0, 1.0)));
        assert!(!GeosKernel.is_valid_ring(&ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)])));
    }

    #[test]
    fn test_contains() {
        let outer = Polygon::new(square(0.0, 0.0, 10.0), vec![]);
        let inner = Polygon::new(square(2.0, 2.0, 2.0), vec![]);
        assert!(GeosKernel.contains(&outer, &inner).unwrap());
        assert!(!GeosKernel.contains(&inner, &outer).unwrap());
    }
}
