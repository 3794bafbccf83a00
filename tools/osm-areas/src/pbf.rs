use anyhow::{Context, Result};
use geo::Coord;
use hashbrown::HashMap;
use indicatif::{ProgressBar, ProgressStyle};
use osm_multipolygon::prelude::*;
use osmpbf::{Element, ElementReader, Info, RelMemberType};
use std::path::Path;

/// Node ID to coordinate mapping
pub struct NodeCache {
    nodes: HashMap<i64, Coord<f64>>,
}

impl NodeCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, id: i64, coord: Coord<f64>) {
        self.nodes.insert(id, coord);
    }

    pub fn get(&self, id: i64) -> Option<&Coord<f64>> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Counts from the second pass
#[derive(Debug, Default)]
pub struct MemberPassStats {
    pub nodes: u64,
    pub ways: u64,
    /// Ways handed to the collector
    pub ways_resolved: u64,
    /// Ways skipped because some node was not in the file
    pub ways_unresolved: u64,
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb
}

fn convert_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn convert_meta(info: &Info) -> Meta {
    Meta {
        version: info.version().map_or(0, |v| v.max(0) as u32),
        changeset: info.changeset().unwrap_or(0),
        timestamp: info.milli_timestamp().unwrap_or(0),
        uid: info.uid().unwrap_or(0),
    }
}

fn convert_member_kind(kind: RelMemberType) -> MemberKind {
    match kind {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}

/// Pass 1: feed every relation of the file to the collector
pub fn read_relations<K: GeometryKernel>(path: &Path, collector: &mut RelationCollector<K>) -> Result<u64> {
    log::info!("Reading relations from {}", path.display());

    let reader = ElementReader::from_path(path)
        .with_context(|| format!("Failed to open PBF file: {}", path.display()))?;

    let pb = spinner();
    pb.set_message("Scanning relations...");

    let mut relation_count = 0u64;
    reader.for_each(|element| {
        if let Element::Relation(rel) = element {
            let members = rel
                .members()
                .map(|m| {
                    let role = m.role().unwrap_or_default().to_string();
                    Member {
                        kind: convert_member_kind(m.member_type),
                        id: m.member_id,
                        role,
                    }
                })
                .collect();

            collector.relation(Relation {
                id: rel.id(),
                members,
                tags: convert_tags(rel.tags()),
                meta: convert_meta(&rel.info()),
            });

            relation_count += 1;
            if relation_count % 10_000 == 0 {
                pb.set_message(format!("Scanned {} relations...", relation_count));
            }
        }
    })?;

    pb.finish_with_message(format!("Scanned {} relations", relation_count));
    Ok(relation_count)
}

/// Pass 2: cache node locations and hand every needed way to the collector
pub fn read_members<K: GeometryKernel>(
    path: &Path,
    collector: &mut RelationCollector<K>,
    handler: &mut dyn AreaHandler,
    observer: &mut dyn PhaseObserver,
) -> Result<MemberPassStats> {
    log::info!("Reading nodes and ways from {}", path.display());

    let reader = ElementReader::from_path(path)
        .with_context(|| format!("Failed to open PBF file: {}", path.display()))?;

    let pb = spinner();
    pb.set_message("Reading nodes...");

    let closed_ways = collector.config().areas_from_closed_ways;
    let mut nodes = NodeCache::with_capacity(10_000_000);
    let mut stats = MemberPassStats::default();

    reader.for_each(|element| match element {
        Element::Node(node) => {
            nodes.insert(node.id(), Coord { x: node.lon(), y: node.lat() });
            stats.nodes += 1;
            if stats.nodes % 1_000_000 == 0 {
                pb.set_message(format!("Processed {} nodes...", stats.nodes));
            }
        }
        Element::DenseNode(node) => {
            nodes.insert(node.id(), Coord { x: node.lon(), y: node.lat() });
            stats.nodes += 1;
            if stats.nodes % 1_000_000 == 0 {
                pb.set_message(format!("Processed {} nodes...", stats.nodes));
            }
        }
        Element::Way(way) => {
            stats.ways += 1;
            if stats.ways % 100_000 == 0 {
                pb.set_message(format!("Processed {} nodes, {} ways...", stats.nodes, stats.ways));
            }
            if !closed_ways && !collector.wants_way(way.id()) {
                return;
            }

            let node_ids: Vec<i64> = way.refs().collect();
            let Some(coords) = resolve_coords(&node_ids, &nodes) else {
                stats.ways_unresolved += 1;
                return;
            };
            let way = Way {
                id: way.id(),
                node_ids,
                coords,
                tags: convert_tags(way.tags()),
                meta: convert_meta(&way.info()),
            };
            stats.ways_resolved += 1;
            collector.way_observed(&way, handler, observer);
        }
        Element::Relation(_) => {}
    })?;

    pb.finish_with_message(format!(
        "Processed {} nodes, {} ways",
        stats.nodes, stats.ways
    ));

    log::info!("Node cache: {} nodes", nodes.len());
    if stats.ways_unresolved > 0 {
        log::warn!(
            "{} ways could not be resolved (missing nodes)",
            stats.ways_unresolved
        );
    }

    Ok(stats)
}

/// Resolve way node references to coordinates
pub fn resolve_coords(node_ids: &[i64], nodes: &NodeCache) -> Option<Vec<Coord<f64>>> {
    node_ids.iter().map(|&id| nodes.get(id).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_coords() {
        let mut nodes = NodeCache::with_capacity(4);
        nodes.insert(1, Coord { x: 0.0, y: 0.0 });
        nodes.insert(2, Coord { x: 1.0, y: 0.0 });
        assert_eq!(nodes.len(), 2);

        let coords = resolve_coords(&[1, 2, 1], &nodes).unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[1], Coord { x: 1.0, y: 0.0 });

        assert!(resolve_coords(&[1, 3], &nodes).is_none());
    }

    #[test]
    fn test_convert_tags() {
        let tags = convert_tags([("type", "multipolygon"), ("natural", "water")].into_iter());
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("natural").map(String::as_str), Some("water"));
    }

    #[test]
    fn test_convert_member_kind() {
        assert_eq!(convert_member_kind(RelMemberType::Way), MemberKind::Way);
        assert_eq!(convert_member_kind(RelMemberType::Node), MemberKind::Node);
        assert_eq!(convert_member_kind(RelMemberType::Relation), MemberKind::Relation);
    }
}
