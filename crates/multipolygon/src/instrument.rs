//! Optional instrumentation hooks around the build phases.

use std::time::{Duration, Instant};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Phases of building one relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    AssembleWays,
    MakeRings,
    GapRepair,
    Containment,
    ExtraPolygons,
    PolygonBuild,
    InnerRingTouch,
    MultipolygonBuild,
}

impl Phase {
    fn index(self) -> usize {
        self as usize
    }
}

/// Called at phase boundaries while a relation is built
pub trait PhaseObserver {
    fn enter(&mut self, phase: Phase);
    fn exit(&mut self, phase: Phase);
}

impl PhaseObserver for () {
    fn enter(&mut self, _phase: Phase) {}
    fn exit(&mut self, _phase: Phase) {}
}

/// Accumulates wall-clock time per phase over many relations
#[derive(Debug, Default)]
pub struct PhaseTimings {
    totals: [Duration; Phase::COUNT],
    counts: [u64; Phase::COUNT],
    started: [Option<Instant>; Phase::COUNT],
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self, phase: Phase) -> Duration {
        self.totals[phase.index()]
    }

    pub fn count(&self, phase: Phase) -> u64 {
        self.counts[phase.index()]
    }

    pub fn log_summary(&self) {
        log::info!("=== Multipolygon Timings ===");
        for phase in Phase::iter() {
            log::info!(
                "{}: {:.3}s ({} calls)",
                phase,
                self.total(phase).as_secs_f64(),
                self.count(phase)
            );
        }
    }
}

impl PhaseObserver for PhaseTimings {
    fn enter(&mut self, phase: Phase) {
        self.started[phase.index()] = Some(Instant::now());
    }

    fn exit(&mut self, phase: Phase) {
        if let Some(start) = self.started[phase.index()].take() {
            self.totals[phase.index()] += start.elapsed();
            self.counts[phase.index()] += 1;
        }
    }
}
