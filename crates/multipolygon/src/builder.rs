//! Turns the member ways of one relation into an area.
//!
//! All ring and way state lives in vectors owned by a single `build` call and
//! is dropped when it returns.

use crate::config::BuildConfig;
use crate::containment;
use crate::error::{BuildError, BuildWarning};
use crate::geometry::{reversed, GeometryKernel, PlanarKernel};
use crate::instrument::{Phase, PhaseObserver};
use crate::model::{Area, AreaKind, MemberRole, Origin, Relation, Tags, Way};
use crate::repair;
use crate::ring::{Direction, RingAssembler, RingInfo};
use crate::tags::{self, TagMerge};
use crate::touching;
use crate::way_info::{self, WayInfo};
use geo::{LineString, MultiPolygon, Polygon};

/// Everything one relation produced
#[derive(Debug)]
pub struct BuildOutput {
    pub area: Result<Area, BuildError>,
    /// Standalone areas for inner ways tagged differently from the relation
    pub extras: Vec<Area>,
    pub warnings: Vec<BuildWarning>,
}

pub struct MultipolygonBuilder<K = PlanarKernel> {
    kernel: K,
    config: BuildConfig,
}

impl MultipolygonBuilder<PlanarKernel> {
    pub fn new(config: BuildConfig) -> Self {
        Self::with_kernel(PlanarKernel, config)
    }
}

impl Default for MultipolygonBuilder<PlanarKernel> {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

/// Scratch state for one relation
struct Assembly<'a> {
    ways: Vec<WayInfo<'a>>,
    rings: Vec<RingInfo>,
}

fn timed<T>(observer: &mut dyn PhaseObserver, phase: Phase, f: impl FnOnce() -> T) -> T {
    observer.enter(phase);
    let result = f();
    observer.exit(phase);
    result
}

impl<K: GeometryKernel> MultipolygonBuilder<K> {
    pub fn with_kernel(kernel: K, config: BuildConfig) -> Self {
        Self { kernel, config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Build the area of `relation` from its member ways, given in member order.
    pub fn build(&self, relation: &Relation, kind: AreaKind, members: &[(&Way, MemberRole)]) -> BuildOutput {
        self.build_observed(relation, kind, members, &mut ())
    }

    pub fn build_observed(
        &self,
        relation: &Relation,
        kind: AreaKind,
        members: &[(&Way, MemberRole)],
        observer: &mut dyn PhaseObserver,
    ) -> BuildOutput {
        let mut extras = Vec::new();
        let mut warnings = Vec::new();
        let area = self.assemble(relation, kind, members, observer, &mut extras, &mut warnings);
        BuildOutput {
            area,
            extras,
            warnings,
        }
    }

    fn assemble(
        &self,
        relation: &Relation,
        kind: AreaKind,
        members: &[(&Way, MemberRole)],
        observer: &mut dyn PhaseObserver,
        extras: &mut Vec<Area>,
        warnings: &mut Vec<BuildWarning>,
    ) -> Result<Area, BuildError> {
        let ways = timed(observer, Phase::AssembleWays, || {
            way_info::register(members, self.config.attempt_repair)
        })?;
        let mut assembly = Assembly {
            ways,
            rings: Vec::new(),
        };

        self.find_rings(&mut assembly, observer)?;

        timed(observer, Phase::Containment, || {
            containment::classify(&self.kernel, &mut assembly.rings)
        })
        .map_err(|e| BuildError::InvalidRing(e.to_string()))?;

        timed(observer, Phase::ExtraPolygons, || {
            self.extra_polygons(relation, kind, &assembly, extras, warnings)
        });

        let mut area_tags = relation.tags.clone();
        let polygons = self.build_polygons(&mut assembly, &mut area_tags, observer, warnings)?;
        self.check_roles(&assembly, warnings);

        let geometry = MultiPolygon::new(polygons);
        let valid = timed(observer, Phase::MultipolygonBuild, || {
            self.kernel.is_valid_multipolygon(&geometry)
        });
        if !matches!(valid, Ok(true)) {
            return Err(BuildError::InvalidMultiPolygon);
        }

        let mut meta = relation.meta;
        meta.timestamp = members
            .iter()
            .map(|(way, _)| way.meta.timestamp)
            .fold(meta.timestamp, i64::max);

        Ok(Area {
            origin: Origin::Relation(relation.id),
            kind,
            geometry,
            tags: area_tags,
            meta,
        })
    }

    /// Ring assembly, gap repair and a second assembly pass
    fn find_rings(&self, assembly: &mut Assembly<'_>, observer: &mut dyn PhaseObserver) -> Result<(), BuildError> {
        let assembler = RingAssembler::new(&self.kernel, self.config.attempt_repair);
        timed(observer, Phase::MakeRings, || {
            assembler.assemble(&mut assembly.ways, &mut assembly.rings)
        });

        let dangling = repair::dangling_nodes(&assembly.ways);
        if !dangling.is_empty() {
            if !self.config.attempt_repair {
                return Err(BuildError::DanglingEnds {
                    nodes: dangling.keys().copied().collect(),
                });
            }
            timed(observer, Phase::GapRepair, || {
                let connectors = repair::connect_dangling_ends(dangling, self.config.gap_metric);
                repair::reset_rejected(&mut assembly.ways);
                assembly.ways.extend(connectors);
            });
            timed(observer, Phase::MakeRings, || {
                assembler.assemble(&mut assembly.ways, &mut assembly.rings)
            });
        }

        let dangling = repair::dangling_nodes(&assembly.ways);
        if !dangling.is_empty() {
            return Err(BuildError::DanglingEnds {
                nodes: dangling.keys().copied().collect(),
            });
        }
        if let Some(way) = assembly.ways.iter().find(|w| w.is_free()) {
            return Err(BuildError::InvalidRing(match way.way_id() {
                Some(id) => format!("ring through way {} is not valid", id),
                None => "ring through gap connector is not valid".to_string(),
            }));
        }
        if assembly.rings.is_empty() {
            return Err(BuildError::NoRings);
        }
        Ok(())
    }

    /// Inner rings made of a single tagged way become areas of their own,
    /// unless the way just repeats the tags of the relation or of its outer way.
    fn extra_polygons(
        &self,
        relation: &Relation,
        kind: AreaKind,
        assembly: &Assembly<'_>,
        extras: &mut Vec<Area>,
        warnings: &mut Vec<BuildWarning>,
    ) {
        for ring in assembly.rings.iter().filter(|r| r.inner && r.ways.len() == 1) {
            let Some(way) = assembly.ways[ring.ways[0]].way else {
                continue;
            };
            if tags::untagged(&way.tags) {
                continue;
            }

            if tags::same_tags(&way.tags, &relation.tags) || self.repeats_outer_way(assembly, ring, &way.tags) {
                log::debug!("Relation {}: inner way {} repeats outer tags", relation.id, way.id);
                warnings.push(BuildWarning::DuplicateTagsOnInner { way_id: way.id });
                continue;
            }

            let Some(exterior) = ring.exterior() else {
                continue;
            };
            let exterior = self.oriented(exterior, ring.direction, Direction::CounterClockwise);
            extras.push(Area {
                origin: Origin::Way(way.id),
                kind,
                geometry: MultiPolygon::new(vec![Polygon::new(exterior, vec![])]),
                tags: way.tags.clone(),
                meta: way.meta,
            });
        }
    }

    fn repeats_outer_way(&self, assembly: &Assembly<'_>, ring: &RingInfo, way_tags: &Tags) -> bool {
        let Some(parent) = ring.contained_by.map(|p| &assembly.rings[p]) else {
            return false;
        };
        if parent.ways.len() != 1 {
            return false;
        }
        assembly.ways[parent.ways[0]]
            .way
            .map_or(false, |outer| tags::same_tags(&outer.tags, way_tags))
    }

    /// One polygon per outer ring, merging way tags into `area_tags` on the way
    fn build_polygons(
        &self,
        assembly: &mut Assembly<'_>,
        area_tags: &mut Tags,
        observer: &mut dyn PhaseObserver,
        warnings: &mut Vec<BuildWarning>,
    ) -> Result<Vec<Polygon<f64>>, BuildError> {
        let outer_rings: Vec<usize> = (0..assembly.rings.len())
            .filter(|&r| assembly.rings[r].contained_by.is_none() && assembly.rings[r].polygon.is_some())
            .collect();
        let sole_outer = outer_rings.len() == 1;

        let mut polygons = Vec::with_capacity(outer_rings.len());
        for &r in &outer_rings {
            timed(observer, Phase::InnerRingTouch, || {
                touching::merge_touching_inner_rings(&self.kernel, &mut assembly.rings, r)
            });

            let polygon = timed(observer, Phase::PolygonBuild, || self.ring_polygon(&assembly.rings, r))?;

            let sole_outer_way = sole_outer && assembly.rings[r].ways.len() == 1;
            for &w in &assembly.rings[r].ways {
                let Some(way) = assembly.ways[w].way else {
                    continue;
                };
                match tags::apply_way_tags(area_tags, &way.tags, sole_outer_way) {
                    TagMerge::Conflict => warnings.push(BuildWarning::TagConflict { way_id: way.id }),
                    TagMerge::Merged { conflict: true } => {
                        log::debug!("Way {} overrides differing tags of its relation", way.id)
                    }
                    _ => {}
                }
            }
            polygons.push(polygon);
        }

        if polygons.is_empty() {
            return Err(BuildError::NoRings);
        }
        Ok(polygons)
    }

    fn ring_polygon(&self, rings: &[RingInfo], r: usize) -> Result<Polygon<f64>, BuildError> {
        let ring = &rings[r];
        let exterior = ring
            .exterior()
            .map(|e| self.oriented(e, ring.direction, Direction::CounterClockwise))
            .ok_or(BuildError::NoRings)?;

        let holes: Vec<LineString<f64>> = ring
            .inner_rings
            .iter()
            .filter_map(|&i| {
                let hole = &rings[i];
                hole.exterior()
                    .map(|e| self.oriented(e, hole.direction, Direction::Clockwise))
            })
            .collect();

        let polygon = Polygon::new(exterior, holes);
        match self.kernel.is_valid_polygon(&polygon) {
            Ok(true) => Ok(polygon),
            Ok(false) => Err(BuildError::InvalidRing(format!(
                "polygon of outer ring {} with {} holes is not valid",
                r,
                polygon.interiors().len()
            ))),
            Err(e) => Err(BuildError::InvalidRing(e.to_string())),
        }
    }

    fn oriented(&self, ring: &LineString<f64>, current: Direction, wanted: Direction) -> LineString<f64> {
        if current == wanted {
            ring.clone()
        } else {
            reversed(ring)
        }
    }

    /// Warn about ways whose role disagrees with the ring they ended up in
    fn check_roles(&self, assembly: &Assembly<'_>, warnings: &mut Vec<BuildWarning>) {
        for ring in assembly.rings.iter().filter(|r| r.polygon.is_some()) {
            let placed = if ring.inner {
                MemberRole::Inner
            } else {
                MemberRole::Outer
            };
            for &w in &ring.ways {
                let info = &assembly.ways[w];
                let Some(way_id) = info.way_id() else {
                    continue;
                };
                if info.role != MemberRole::Unknown && info.role != placed {
                    warnings.push(BuildWarning::RoleMismatch {
                        way_id,
                        role: info.role,
                        placed,
                    });
                }
            }
        }
    }

    /// Simple area for a closed way outside any relation
    pub fn build_closed_way(&self, way: &Way) -> Result<Area, BuildError> {
        if !way.is_closed() {
            return Err(BuildError::InvalidWayGeometry(way.id));
        }
        let ring = LineString::new(way.coords.clone());
        if !self.kernel.is_valid_ring(&ring) {
            return Err(BuildError::InvalidRing(format!("closed way {} is not valid", way.id)));
        }
        let exterior = self.oriented(&ring, Direction::of(&self.kernel, &ring), Direction::CounterClockwise);
        Ok(Area {
            origin: Origin::Way(way.id),
            kind: AreaKind::Multipolygon,
            geometry: MultiPolygon::new(vec![Polygon::new(exterior, vec![])]),
            tags: way.tags.clone(),
            meta: way.meta,
        })
    }
}
