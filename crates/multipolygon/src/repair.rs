//! Gap repair: connect dangling way ends with synthetic straight ways.

use crate::config::GapMetric;
use crate::way_info::{WayInfo, WayUse};
use geo::{Coord, EuclideanDistance, HaversineDistance, Point};
use std::collections::BTreeMap;

/// End nodes of the free ways that occur an odd number of times
pub fn dangling_nodes(ways: &[WayInfo<'_>]) -> BTreeMap<i64, Coord<f64>> {
    let mut dangling = BTreeMap::new();
    let mut toggle = |node: i64, coord: Option<Coord<f64>>| {
        if dangling.remove(&node).is_none() {
            if let Some(coord) = coord {
                dangling.insert(node, coord);
            }
        }
    };
    for way in ways.iter().filter(|w| w.is_free()) {
        toggle(way.first_node, way.first_coord());
        toggle(way.last_node, way.last_coord());
    }
    dangling
}

fn distance(metric: GapMetric, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (a, b) = (Point::from(a), Point::from(b));
    match metric {
        GapMetric::Planar => a.euclidean_distance(&b),
        GapMetric::Haversine => a.haversine_distance(&b),
    }
}

/// Pair every dangling node with its nearest dangling neighbour.
///
/// Nodes are taken in id order. A node left without a partner is dropped.
pub fn connect_dangling_ends<'a>(
    mut dangling: BTreeMap<i64, Coord<f64>>,
    metric: GapMetric,
) -> Vec<WayInfo<'a>> {
    let mut connectors = Vec::new();

    while let Some((node, coord)) = dangling.pop_first() {
        let nearest = dangling
            .iter()
            .map(|(&id, &c)| (id, c, distance(metric, coord, c)))
            .min_by(|a, b| a.2.total_cmp(&b.2));
        let Some((other, other_coord, gap)) = nearest else {
            break;
        };
        dangling.remove(&other);
        log::debug!("Closing gap of {:.6} between nodes {} and {}", gap, node, other);
        connectors.push(WayInfo::connector((node, coord), (other, other_coord)));
    }
    connectors
}

/// Give seeds that failed before the connectors existed another chance
pub fn reset_rejected(ways: &mut [WayInfo<'_>]) {
    for way in ways.iter_mut().filter(|w| w.used == WayUse::Rejected) {
        way.used = WayUse::Unassigned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberRole, Meta, Tags, Way};
    use crate::way_info::register;

    fn way(id: i64, nodes: &[(i64, f64, f64)]) -> Way {
        Way {
            id,
            node_ids: nodes.iter().map(|n| n.0).collect(),
            coords: nodes.iter().map(|&(_, x, y)| Coord { x, y }).collect(),
            tags: Tags::new(),
            meta: Meta::default(),
        }
    }

    #[test]
    fn test_closed_pool_has_no_dangling_nodes() {
        let ways = vec![
            way(1, &[(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 1.0, 1.0)]),
            way(2, &[(3, 1.0, 1.0), (1, 0.0, 0.0)]),
        ];
        let refs: Vec<_> = ways.iter().map(|w| (w, MemberRole::Outer)).collect();
        let infos = register(&refs, true).unwrap();

        let dangling = dangling_nodes(&infos);
        assert!(dangling.is_empty());
        assert!(connect_dangling_ends(dangling, GapMetric::Planar).is_empty());
    }

    #[test]
    fn test_committed_ways_are_ignored() {
        let w = way(1, &[(1, 0.0, 0.0), (2, 1.0, 0.0)]);
        let mut infos = register(&[(&w, MemberRole::Outer)], false).unwrap();
        assert_eq!(dangling_nodes(&infos).len(), 2);
        infos[0].used = WayUse::Ring(0);
        assert!(dangling_nodes(&infos).is_empty());
    }

    #[test]
    fn test_nearest_neighbours_are_paired() {
        let mut dangling = BTreeMap::new();
        dangling.insert(1, Coord { x: 0.0, y: 0.0 });
        dangling.insert(2, Coord { x: 10.0, y: 0.0 });
        dangling.insert(3, Coord { x: 0.5, y: 0.0 });
        dangling.insert(4, Coord { x: 10.0, y: 0.5 });

        let connectors = connect_dangling_ends(dangling, GapMetric::Planar);
        let pairs: Vec<(i64, i64)> = connectors.iter().map(|c| (c.first_node, c.last_node)).collect();
        assert_eq!(pairs, vec![(1, 3), (2, 4)]);
        assert!(connectors.iter().all(WayInfo::is_connector));
    }

    #[test]
    fn test_haversine_metric() {
        let mut dangling = BTreeMap::new();
        // one degree of longitude at the equator vs. at 80 degrees north
        dangling.insert(1, Coord { x: 0.0, y: 80.0 });
        dangling.insert(2, Coord { x: 1.5, y: 80.0 });
        dangling.insert(3, Coord { x: 0.0, y: 79.0 });

        let connectors = connect_dangling_ends(dangling, GapMetric::Haversine);
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].last_node, 2);

        let mut dangling = BTreeMap::new();
        dangling.insert(1, Coord { x: 0.0, y: 80.0 });
        dangling.insert(2, Coord { x: 1.5, y: 80.0 });
        dangling.insert(3, Coord { x: 0.0, y: 79.0 });
        let connectors = connect_dangling_ends(dangling, GapMetric::Planar);
        assert_eq!(connectors[0].last_node, 3);
    }

    #[test]
    fn test_reset_rejected() {
        let w = way(1, &[(1, 0.0, 0.0), (2, 1.0, 0.0)]);
        let mut infos = register(&[(&w, MemberRole::Outer)], false).unwrap();
        infos[0].used = WayUse::Rejected;
        reset_rejected(&mut infos);
        assert_eq!(infos[0].used, WayUse::Unassigned);
    }
}
