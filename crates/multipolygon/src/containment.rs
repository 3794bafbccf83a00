//! Containment forest over the assembled rings.
//!
//! A ring contained by an odd number of other rings is inner, by an even
//! number (including zero) outer. Transitive containment is reduced so every
//! ring keeps only its direct container. Every inner ring is attached to its
//! direct container; rings without a container are the outer rings.

use crate::geometry::{GeometryError, GeometryKernel};
use crate::ring::RingInfo;
use geo::BoundingRect;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type RingBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn bounding_box(ring: &RingInfo) -> Option<AABB<[f64; 2]>> {
    let rect = ring.polygon.as_ref()?.bounding_rect()?;
    Some(AABB::from_corners(
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    ))
}

pub fn classify<K: GeometryKernel>(kernel: &K, rings: &mut [RingInfo]) -> Result<(), GeometryError> {
    let n = rings.len();
    let boxes: Vec<Option<AABB<[f64; 2]>>> = rings.iter().map(bounding_box).collect();

    let tree: RTree<RingBox> = RTree::bulk_load(
        boxes
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let b = (*b)?;
                Some(GeomWithData::new(Rectangle::from_corners(b.lower(), b.upper()), i))
            })
            .collect(),
    );

    let mut contains = vec![vec![false; n]; n];
    let mut odd = vec![false; n];

    for i in 0..n {
        let (Some(outer), Some(envelope)) = (rings[i].polygon.as_ref(), boxes[i]) else {
            continue;
        };
        for candidate in tree.locate_in_envelope(&envelope) {
            let j = candidate.data;
            if i == j || contains[j][i] {
                continue;
            }
            let Some(inner) = rings[j].polygon.as_ref() else {
                continue;
            };
            if kernel.contains(outer, inner)? {
                contains[i][j] = true;
                odd[j] = !odd[j];
            }
        }
    }

    // keep only direct containment
    let mut direct = contains.clone();
    for i in 0..n {
        for j in 0..n {
            if contains[i][j] && (0..n).any(|k| contains[i][k] && contains[k][j]) {
                direct[i][j] = false;
            }
        }
    }

    for ring in rings.iter_mut() {
        ring.inner_rings.clear();
        ring.contained_by = None;
        ring.parent = None;
    }

    for j in 0..n {
        rings[j].inner = odd[j];
        let Some(i) = (0..n).find(|&i| direct[i][j]) else {
            continue;
        };
        rings[j].parent = Some(i);
        if odd[j] {
            rings[j].contained_by = Some(i);
            rings[i].inner_rings.push(j);
        }
    }

    log::trace!(
        "Containment: {} rings, {} inner",
        n,
        odd.iter().filter(|&&o| o).count()
    );
    Ok(())
}
