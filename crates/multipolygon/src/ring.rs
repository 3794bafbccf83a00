//! Ring assembly: depth-first search over way endpoints with backtracking.

use crate::geometry::GeometryKernel;
use crate::way_info::{ring_coords, WayInfo, WayUse};
use geo::{Coord, LineString, Polygon};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn of<K: GeometryKernel>(kernel: &K, ring: &LineString<f64>) -> Self {
        if kernel.is_ccw(ring) {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        }
    }
}

/// One closed ring and its place in the containment forest.
///
/// Rings and ways reference each other by index into the per-relation
/// vectors owned by the builder.
#[derive(Clone, Debug)]
pub struct RingInfo {
    /// `None` once the ring has been merged into a touching neighbour
    pub polygon: Option<Polygon<f64>>,
    pub direction: Direction,
    /// Way indices in traversal order
    pub ways: Vec<usize>,
    /// Direct children that form holes of this ring
    pub inner_rings: Vec<usize>,
    /// Direct container, set only for inner rings
    pub contained_by: Option<usize>,
    /// Direct container regardless of parity
    pub parent: Option<usize>,
    /// Contained by an odd number of rings
    pub inner: bool,
}

impl RingInfo {
    fn new(ring: LineString<f64>, direction: Direction, ways: Vec<usize>) -> Self {
        Self {
            polygon: Some(Polygon::new(ring, vec![])),
            direction,
            ways,
            inner_rings: Vec::new(),
            contained_by: None,
            parent: None,
            inner: false,
        }
    }

    pub fn exterior(&self) -> Option<&LineString<f64>> {
        self.polygon.as_ref().map(Polygon::exterior)
    }
}

pub(crate) struct RingAssembler<'k, K> {
    kernel: &'k K,
    attempt_repair: bool,
}

impl<'k, K: GeometryKernel> RingAssembler<'k, K> {
    pub fn new(kernel: &'k K, attempt_repair: bool) -> Self {
        Self {
            kernel,
            attempt_repair,
        }
    }

    /// Find rings until no unassigned seed way is left.
    ///
    /// A seed that cannot be closed is marked rejected; it may still be
    /// picked up as a continuation of a later ring.
    pub fn assemble(&self, ways: &mut [WayInfo<'_>], rings: &mut Vec<RingInfo>) {
        while let Some(seed) = ways.iter().position(|w| w.used == WayUse::Unassigned) {
            match self.make_one_ring(ways, seed, rings.len()) {
                Some(ring) => rings.push(ring),
                None => ways[seed].used = WayUse::Rejected,
            }
        }
    }

    fn make_one_ring(&self, ways: &mut [WayInfo<'_>], seed: usize, ring_id: usize) -> Option<RingInfo> {
        ways[seed].used = WayUse::Ring(ring_id);
        ways[seed].sequence = 0;
        ways[seed].invert = false;

        let first_node = ways[seed].first_node;
        let last_node = ways[seed].last_node;
        let mut chain = vec![seed];

        match self.complete_ring(ways, &mut chain, first_node, last_node, ring_id) {
            Some(ring) => {
                let direction = Direction::of(self.kernel, &ring);
                log::trace!(
                    "Closed ring {} from {} ways ({:?})",
                    ring_id,
                    chain.len(),
                    direction
                );
                Some(RingInfo::new(ring, direction, chain))
            }
            None => {
                ways[seed].used = WayUse::Unassigned;
                None
            }
        }
    }

    fn complete_ring(
        &self,
        ways: &mut [WayInfo<'_>],
        chain: &mut Vec<usize>,
        first_node: i64,
        last_node: i64,
        ring_id: usize,
    ) -> Option<LineString<f64>> {
        if first_node == last_node {
            return self.close_ring(ways, chain);
        }

        for i in 0..ways.len() {
            if !ways[i].is_free() {
                continue;
            }
            let (invert, next_node) = if ways[i].first_node == last_node {
                (false, ways[i].last_node)
            } else if ways[i].last_node == last_node {
                (true, ways[i].first_node)
            } else {
                continue;
            };

            let previous = ways[i].used;
            ways[i].used = WayUse::Ring(ring_id);
            ways[i].sequence = chain.len();
            ways[i].invert = invert;
            chain.push(i);

            if let Some(ring) = self.complete_ring(ways, chain, first_node, next_node, ring_id) {
                return Some(ring);
            }

            chain.pop();
            ways[i].used = previous;
            ways[i].invert = false;
        }
        None
    }

    fn close_ring(&self, ways: &[WayInfo<'_>], chain: &[usize]) -> Option<LineString<f64>> {
        let coords = ring_coords(ways, chain);
        let mut ring = LineString::new(coords);

        if !self.kernel.is_simple(&ring.0) {
            if !self.attempt_repair {
                return None;
            }
            ring = repair_by_bisection(self.kernel, &ring.0)?;
            log::debug!("Repaired self-intersecting ring of {} ways", chain.len());
        }

        self.kernel.is_valid_ring(&ring).then_some(ring)
    }
}

/// Cut the self-intersecting stretch out of a closed ring.
///
/// Finds the longest simple prefix and the longest simple suffix. If the
/// stretch between them is the smaller part of the ring it is dropped,
/// otherwise it is kept on its own.
pub(crate) fn repair_by_bisection<K: GeometryKernel>(
    kernel: &K,
    coords: &[Coord<f64>],
) -> Option<LineString<f64>> {
    let n = coords.len();
    if n < 4 {
        return None;
    }

    // coords[..good] is simple, coords[..bad] is not
    let (mut good, mut bad) = (2, n);
    while bad - good > 1 {
        let mid = (good + bad) / 2;
        if kernel.is_simple(&coords[..mid]) {
            good = mid;
        } else {
            bad = mid;
        }
    }
    let mut start = good;

    // coords[good..] is simple, coords[bad..] is not
    let (mut good, mut bad) = (n - 2, 0);
    while good - bad > 1 {
        let mid = (good + bad) / 2;
        if kernel.is_simple(&coords[mid..]) {
            good = mid;
        } else {
            bad = mid;
        }
    }
    let mut end = good;

    if end > start {
        std::mem::swap(&mut start, &mut end);
    }

    let repaired: Vec<Coord<f64>> = if start - end > n / 2 {
        let mut kept = coords[end..start].to_vec();
        kept.push(coords[end]);
        kept
    } else {
        coords[..end].iter().chain(&coords[start..]).copied().collect()
    };

    let ring = LineString::new(repaired);
    kernel.is_valid_ring(&ring).then_some(ring)
}
