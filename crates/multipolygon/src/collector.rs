//! Two-pass relation collector.
//!
//! Pass 1 sees every relation and remembers which member ways the retained
//! ones need. Pass 2 sees the ways (with resolved coordinates); as soon as a
//! relation has all of its member ways it is built and the result handed to
//! an [`AreaHandler`].

use crate::builder::MultipolygonBuilder;
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::geometry::{GeometryKernel, PlanarKernel};
use crate::instrument::PhaseObserver;
use crate::model::{area_kind, Area, AreaKind, MemberKind, MemberRole, Relation, Tags, Way};
use crate::tags;

/// Receives everything the collector produces
pub trait AreaHandler {
    fn area(&mut self, area: Area);

    fn failure(&mut self, _relation_id: i64, _error: &BuildError) {}

    /// Called from [`RelationCollector::finish`] for relations still missing members
    fn incomplete(&mut self, _relation_id: i64, _missing: usize) {}
}

/// Decides which relations become areas, and of which kind
pub type RelationFilter = fn(&Tags) -> Option<AreaKind>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub relations_seen: u64,
    pub relations_retained: u64,
    pub relations_built: u64,
    pub relations_failed: u64,
    pub relations_incomplete: u64,
    /// Node and relation members of retained relations, which are not used
    pub ignored_members: u64,
    pub extra_areas: u64,
    pub closed_way_areas: u64,
    pub warnings: u64,
}

impl CollectorStats {
    pub fn log_summary(&self) {
        log::info!("=== Relation Statistics ===");
        log::info!("Relations seen: {}", self.relations_seen);
        log::info!("Relations retained: {}", self.relations_retained);
        log::info!("Areas built: {}", self.relations_built);
        log::info!("Failed: {}", self.relations_failed);
        log::info!("Incomplete: {}", self.relations_incomplete);
        log::info!("Extra inner-way areas: {}", self.extra_areas);
        log::info!("Closed-way areas: {}", self.closed_way_areas);
        log::info!("Warnings: {}", self.warnings);
        if self.ignored_members > 0 {
            log::info!("Ignored non-way members: {}", self.ignored_members);
        }
    }
}

/// Where a needed way goes: ordered by way id for binary search
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MemberInfo {
    way_id: i64,
    relation_pos: usize,
    member_pos: usize,
}

struct PendingRelation {
    relation: Relation,
    kind: AreaKind,
    roles: Vec<MemberRole>,
    ways: Vec<Option<Way>>,
    missing: usize,
}

impl PendingRelation {
    fn members(&self) -> Vec<(&Way, MemberRole)> {
        self.ways
            .iter()
            .zip(&self.roles)
            .filter_map(|(way, &role)| way.as_ref().map(|w| (w, role)))
            .collect()
    }
}

pub struct RelationCollector<K = PlanarKernel> {
    builder: MultipolygonBuilder<K>,
    filter: RelationFilter,
    relations: Vec<Option<PendingRelation>>,
    members: Vec<MemberInfo>,
    sorted: bool,
    stats: CollectorStats,
}

impl RelationCollector<PlanarKernel> {
    pub fn new(config: BuildConfig) -> Self {
        Self::with_builder(MultipolygonBuilder::new(config))
    }
}

impl<K: GeometryKernel> RelationCollector<K> {
    pub fn with_builder(builder: MultipolygonBuilder<K>) -> Self {
        Self {
            builder,
            filter: area_kind,
            relations: Vec::new(),
            members: Vec::new(),
            sorted: true,
            stats: CollectorStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: RelationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub fn config(&self) -> &BuildConfig {
        self.builder.config()
    }

    /// Pass 1: look at a relation and remember its way members if it is kept
    pub fn relation(&mut self, relation: Relation) {
        self.stats.relations_seen += 1;
        let Some(kind) = (self.filter)(&relation.tags) else {
            return;
        };
        self.stats.relations_retained += 1;

        let relation_pos = self.relations.len();
        let mut roles = Vec::new();
        for member in &relation.members {
            if member.kind != MemberKind::Way {
                log::trace!(
                    "Relation {}: ignoring {:?} member {}",
                    relation.id,
                    member.kind,
                    member.id
                );
                self.stats.ignored_members += 1;
                continue;
            }
            self.members.push(MemberInfo {
                way_id: member.id,
                relation_pos,
                member_pos: roles.len(),
            });
            roles.push(MemberRole::parse(&member.role));
        }

        let missing = roles.len();
        self.relations.push(Some(PendingRelation {
            relation,
            kind,
            ways: vec![None; missing],
            roles,
            missing,
        }));
        self.sorted = false;
    }

    /// Sort the member index. Must be called between the two passes.
    pub fn end_pass1(&mut self) {
        self.members.sort_unstable();
        self.sorted = true;
        log::info!(
            "Collected {} relations needing {} member ways",
            self.relations.len(),
            self.members.len()
        );
    }

    /// Members for `way_id`. The index must be sorted.
    fn member_range(&self, way_id: i64) -> std::ops::Range<usize> {
        let start = self.members.partition_point(|m| m.way_id < way_id);
        let end = start + self.members[start..].partition_point(|m| m.way_id == way_id);
        start..end
    }

    /// True if some pending relation is waiting for this way
    pub fn wants_way(&self, way_id: i64) -> bool {
        if self.sorted {
            !self.member_range(way_id).is_empty()
        } else {
            self.members.iter().any(|m| m.way_id == way_id)
        }
    }

    /// Pass 2: hand over a way with resolved coordinates
    pub fn way(&mut self, way: &Way, handler: &mut dyn AreaHandler) {
        self.way_observed(way, handler, &mut ())
    }

    pub fn way_observed(&mut self, way: &Way, handler: &mut dyn AreaHandler, observer: &mut dyn PhaseObserver) {
        if !self.sorted {
            log::warn!("Way {} arrived before end_pass1, sorting member index now", way.id);
            self.end_pass1();
        }
        let range = self.member_range(way.id);
        if range.is_empty() {
            self.closed_way_area(way, handler);
            return;
        }

        for i in range {
            let info = self.members[i];
            let Some(pending) = self.relations[info.relation_pos].as_mut() else {
                continue;
            };
            let slot = &mut pending.ways[info.member_pos];
            if slot.is_none() {
                *slot = Some(way.clone());
                pending.missing -= 1;
            }
            if pending.missing == 0 {
                self.complete(info.relation_pos, handler, observer);
            }
        }
    }

    fn closed_way_area(&mut self, way: &Way, handler: &mut dyn AreaHandler) {
        if !self.builder.config().areas_from_closed_ways || !way.is_closed() || tags::untagged(&way.tags) {
            return;
        }
        match self.builder.build_closed_way(way) {
            Ok(area) => {
                self.stats.closed_way_areas += 1;
                handler.area(area);
            }
            Err(e) => log::debug!("Closed way {}: {}", way.id, e),
        }
    }

    fn complete(&mut self, relation_pos: usize, handler: &mut dyn AreaHandler, observer: &mut dyn PhaseObserver) {
        let Some(pending) = self.relations[relation_pos].take() else {
            return;
        };
        let relation_id = pending.relation.id;
        let output = self.builder.build_observed(&pending.relation, pending.kind, &pending.members(), observer);

        for warning in &output.warnings {
            log::debug!("Relation {}: {}", relation_id, warning);
        }
        self.stats.warnings += output.warnings.len() as u64;

        for extra in output.extras {
            self.stats.extra_areas += 1;
            handler.area(extra);
        }

        match output.area {
            Ok(area) => {
                self.stats.relations_built += 1;
                handler.area(area);
            }
            Err(e) => {
                self.stats.relations_failed += 1;
                log::warn!("Relation {}: {}", relation_id, e);
                handler.failure(relation_id, &e);
            }
        }
    }

    /// End of pass 2: build relations without way members, report the ones
    /// still missing members, and return the final counts.
    pub fn finish(&mut self, handler: &mut dyn AreaHandler) -> CollectorStats {
        for pos in 0..self.relations.len() {
            let Some(pending) = self.relations[pos].as_ref() else {
                continue;
            };
            if pending.missing == 0 {
                self.complete(pos, handler, &mut ());
                continue;
            }
            let (relation_id, missing) = (pending.relation.id, pending.missing);
            log::warn!("Relation {} is missing {} member ways", relation_id, missing);
            self.stats.relations_incomplete += 1;
            handler.incomplete(relation_id, missing);
            self.relations[pos] = None;
        }
        self.stats
    }
}
