/// How the gap repair measures the distance between two dangling ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GapMetric {
    /// Euclidean distance in degrees
    #[default]
    Planar,
    /// Great-circle distance in meters
    Haversine,
}

/// Settings for building areas from relations
#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    /// Try to fix broken geometries: drop duplicate member ways, close gaps
    /// between dangling ends and cut self-intersections out of rings.
    pub attempt_repair: bool,

    pub gap_metric: GapMetric,

    /// Emit simple areas for closed ways that are not part of any relation
    pub areas_from_closed_ways: bool,
}

impl BuildConfig {
    pub fn with_repair(mut self, attempt_repair: bool) -> Self {
        self.attempt_repair = attempt_repair;
        self
    }
}
