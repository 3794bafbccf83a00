//! Per-way bookkeeping while rings are assembled.

use crate::error::BuildError;
use crate::model::{MemberRole, Way};
use geo::Coord;
use hashbrown::HashSet;
use std::borrow::Cow;

/// Where a way currently stands in ring assembly
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WayUse {
    Unassigned,
    /// Seeded a ring that could not be closed
    Rejected,
    /// Committed to the ring with this index
    Ring(usize),
}

/// A member way (or a gap connector) with its ring-building state
#[derive(Clone, Debug)]
pub struct WayInfo<'a> {
    /// `None` for connectors synthesized by gap repair
    pub way: Option<&'a Way>,
    pub coords: Cow<'a, [Coord<f64>]>,
    pub used: WayUse,
    /// Position inside the ring, only meaningful once committed
    pub sequence: usize,
    pub invert: bool,
    pub first_node: i64,
    pub last_node: i64,
    pub role: MemberRole,
}

impl<'a> WayInfo<'a> {
    pub fn member(way: &'a Way, role: MemberRole) -> Option<Self> {
        Some(Self {
            way: Some(way),
            coords: Cow::Borrowed(way.coords.as_slice()),
            used: WayUse::Unassigned,
            sequence: 0,
            invert: false,
            first_node: way.first_node()?,
            last_node: way.last_node()?,
            role,
        })
    }

    /// Straight two-point way between two dangling nodes
    pub fn connector(from: (i64, Coord<f64>), to: (i64, Coord<f64>)) -> Self {
        Self {
            way: None,
            coords: Cow::Owned(vec![from.1, to.1]),
            used: WayUse::Unassigned,
            sequence: 0,
            invert: false,
            first_node: from.0,
            last_node: to.0,
            role: MemberRole::Unknown,
        }
    }

    pub fn is_connector(&self) -> bool {
        self.way.is_none()
    }

    pub fn way_id(&self) -> Option<i64> {
        self.way.map(|w| w.id)
    }

    /// Not committed to any ring
    pub fn is_free(&self) -> bool {
        !matches!(self.used, WayUse::Ring(_))
    }

    pub fn first_coord(&self) -> Option<Coord<f64>> {
        self.coords.first().copied()
    }

    pub fn last_coord(&self) -> Option<Coord<f64>> {
        self.coords.last().copied()
    }

    /// Coordinates in ring traversal order
    pub fn ordered_coords(&self) -> Box<dyn Iterator<Item = Coord<f64>> + '_> {
        if self.invert {
            Box::new(self.coords.iter().rev().copied())
        } else {
            Box::new(self.coords.iter().copied())
        }
    }
}

/// Wrap the member ways of one relation.
///
/// Ways without nodes are skipped; a way with a single node can never be part
/// of a ring and fails the relation. In repair mode repeated way ids are only
/// registered once.
pub fn register<'a>(
    members: &[(&'a Way, MemberRole)],
    attempt_repair: bool,
) -> Result<Vec<WayInfo<'a>>, BuildError> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut ways = Vec::with_capacity(members.len());

    for &(way, role) in members {
        match way.node_ids.len() {
            0 => continue,
            1 => return Err(BuildError::InvalidWayGeometry(way.id)),
            _ => {}
        }
        if attempt_repair && !seen.insert(way.id) {
            log::debug!("Skipping duplicate member way {}", way.id);
            continue;
        }
        if let Some(info) = WayInfo::member(way, role) {
            ways.push(info);
        }
    }
    Ok(ways)
}

/// Concatenate the committed ways of a ring, dropping repeated joint points
pub fn ring_coords(ways: &[WayInfo<'_>], chain: &[usize]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for &idx in chain {
        for c in ways[idx].ordered_coords() {
            if coords.last() != Some(&c) {
                coords.push(c);
            }
        }
    }
    coords
}
