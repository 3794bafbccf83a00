//! Segment-level operations: self-intersection, boundary intersection and
//! noding, all driven by an R-tree over line segments.

use super::{coord_key, dedup_coords, RingIntersection};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Intersects, Line, LineString, MultiLineString};
use hashbrown::HashSet;
use rstar::{RTree, RTreeObject, AABB};

/// Line segment with its position in the source line
struct SegmentNode {
    index: usize,
    line: Line<f64>,
}

impl RTreeObject for SegmentNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.line)
    }
}

fn envelope(line: &Line<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y])
}

fn to_lines(coords: &[Coord<f64>]) -> Vec<Line<f64>> {
    coords.windows(2).map(|w| Line::new(w[0], w[1])).collect()
}

fn index_lines(lines: &[Line<f64>]) -> RTree<SegmentNode> {
    RTree::bulk_load(
        lines
            .iter()
            .enumerate()
            .map(|(index, line)| SegmentNode { index, line: *line })
            .collect(),
    )
}

/// What two segments have in common
enum Hit {
    Point(Coord<f64>),
    Overlap(Line<f64>),
}

fn intersect(p: Line<f64>, q: Line<f64>) -> Option<Hit> {
    match line_intersection(p, q)? {
        LineIntersection::SinglePoint { intersection, .. } => Some(Hit::Point(intersection)),
        LineIntersection::Collinear { intersection } if intersection.start == intersection.end => {
            Some(Hit::Point(intersection.start))
        }
        LineIntersection::Collinear { intersection } => Some(Hit::Overlap(intersection)),
    }
}

pub(crate) fn is_simple(coords: &[Coord<f64>]) -> bool {
    let points = dedup_coords(coords);
    if points.len() < 3 {
        return true;
    }
    let closed = points.first() == points.last();
    let lines = to_lines(&points);
    let last = lines.len() - 1;
    let tree = index_lines(&lines);

    for (i, line) in lines.iter().enumerate() {
        for other in tree.locate_in_envelope_intersecting(&envelope(line)) {
            let j = other.index;
            if j <= i {
                continue;
            }
            let point = match intersect(*line, other.line) {
                None => continue,
                Some(Hit::Overlap(_)) => return false,
                Some(Hit::Point(point)) => point,
            };
            // neighbouring segments share exactly one vertex
            if j == i + 1 && point == line.end {
                continue;
            }
            if closed && i == 0 && j == last && point == line.start {
                continue;
            }
            return false;
        }
    }
    true
}

pub(crate) fn classify(a: &[Coord<f64>], b: &[Coord<f64>]) -> RingIntersection {
    let lines_a = to_lines(&dedup_coords(a));
    let lines_b = to_lines(&dedup_coords(b));
    let tree = index_lines(&lines_b);

    let mut shared: Vec<Line<f64>> = Vec::new();
    let mut points: Vec<Coord<f64>> = Vec::new();

    for line in &lines_a {
        for other in tree.locate_in_envelope_intersecting(&envelope(line)) {
            match intersect(*line, other.line) {
                None => {}
                Some(Hit::Point(p)) => points.push(p),
                Some(Hit::Overlap(l)) => shared.push(l),
            }
        }
    }

    points.retain(|p| !shared.iter().any(|l| l.intersects(p)));

    match (shared.is_empty(), points.is_empty()) {
        (true, true) => RingIntersection::Disjoint,
        (true, false) => RingIntersection::Points,
        (false, true) => RingIntersection::Lines,
        (false, false) => RingIntersection::Mixed,
    }
}

/// Split every segment of `lines` wherever it meets a segment of `against`
fn node(lines: &[Line<f64>], against: &[Line<f64>]) -> Vec<Line<f64>> {
    let tree = index_lines(against);
    let mut pieces = Vec::with_capacity(lines.len());

    for line in lines {
        let mut cuts: Vec<Coord<f64>> = Vec::new();
        for other in tree.locate_in_envelope_intersecting(&envelope(line)) {
            match intersect(*line, other.line) {
                None => {}
                Some(Hit::Point(p)) => cuts.push(p),
                Some(Hit::Overlap(l)) => {
                    cuts.push(l.start);
                    cuts.push(l.end);
                }
            }
        }

        let delta = line.delta();
        let param = |c: &Coord<f64>| (c.x - line.start.x) * delta.x + (c.y - line.start.y) * delta.y;
        cuts.sort_by(|p, q| param(p).total_cmp(&param(q)));

        let start_key = coord_key(&line.start);
        let end_key = coord_key(&line.end);
        let mut from = line.start;
        let mut from_key = start_key;
        for cut in cuts {
            let key = coord_key(&cut);
            if key == from_key || key == start_key || key == end_key {
                continue;
            }
            pieces.push(Line::new(from, cut));
            from = cut;
            from_key = key;
        }
        pieces.push(Line::new(from, line.end));
    }
    pieces
}

fn undirected_key(line: &Line<f64>) -> ((i64, i64), (i64, i64)) {
    let s = coord_key(&line.start);
    let e = coord_key(&line.end);
    if s <= e {
        (s, e)
    } else {
        (e, s)
    }
}

pub(crate) fn symmetric_difference(a: &[Coord<f64>], b: &[Coord<f64>]) -> MultiLineString<f64> {
    let lines_a = to_lines(&dedup_coords(a));
    let lines_b = to_lines(&dedup_coords(b));
    let pieces_a = node(&lines_a, &lines_b);
    let pieces_b = node(&lines_b, &lines_a);

    let keys_a: HashSet<_> = pieces_a.iter().map(undirected_key).collect();
    let keys_b: HashSet<_> = pieces_b.iter().map(undirected_key).collect();

    let only_a = pieces_a.iter().filter(|l| !keys_b.contains(&undirected_key(l)));
    let only_b = pieces_b.iter().filter(|l| !keys_a.contains(&undirected_key(l)));

    MultiLineString::new(
        only_a
            .chain(only_b)
            .map(|l| LineString::new(vec![l.start, l.end]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    #[test]
    fn test_square_is_simple() {
        let square = coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(is_simple(&square));
    }

    #[test]
    fn test_bowtie_is_not_simple() {
        let bowtie = coords(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(!is_simple(&bowtie));
    }

    #[test]
    fn test_repeated_vertex_is_not_simple() {
        // figure eight touching at (1, 1)
        let eight = coords(&[
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (1.0, 1.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        assert!(!is_simple(&eight));
    }

    #[test]
    fn test_open_line_and_straight_continuation_are_simple() {
        let line = coords(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0)]);
        assert!(is_simple(&line));
        assert!(is_simple(&coords(&[(0.0, 0.0), (1.0, 0.0)])));
    }

    #[test]
    fn test_backtracking_is_not_simple() {
        let line = coords(&[(0.0, 0.0), (2.0, 0.0), (1.0, 0.0)]);
        assert!(!is_simple(&line));
    }

    #[test]
    fn test_classify_shared_edge() {
        let a = coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let b = coords(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        assert_eq!(classify(&a, &b), RingIntersection::Lines);
    }

    #[test]
    fn test_classify_corner_touch_and_disjoint() {
        let a = coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let b = coords(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)]);
        assert_eq!(classify(&a, &b), RingIntersection::Points);

        let c = coords(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 5.0)]);
        assert_eq!(classify(&a, &c), RingIntersection::Disjoint);
    }

    #[test]
    fn test_symmetric_difference_drops_shared_edge() {
        let a = coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let b = coords(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let diff = symmetric_difference(&a, &b);
        // 4 + 4 edges minus the shared one on each side
        assert_eq!(diff.0.len(), 6);
    }

    #[test]
    fn test_symmetric_difference_splits_partial_overlap() {
        // b shares only the lower half of a's right edge
        let a = coords(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
        let b = coords(&[(2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (2.0, 1.0), (2.0, 0.0)]);
        let diff = symmetric_difference(&a, &b);
        // a: bottom, upper right half, top, left; b: three outer edges
        assert_eq!(diff.0.len(), 7);
    }
}
