//! # osm-multipolygon
//!
//! Assemble OpenStreetMap multipolygon and boundary relations into area
//! geometries.
//!
//! ## Features
//!
//! - **Ring assembly**: depth-first search over way endpoints with backtracking
//! - **Repair**: gap connectors between dangling ends, bisection of self-intersecting rings
//! - **Nesting**: arbitrarily deep outer/inner nesting by containment parity
//! - **Tag merging**: relation and member way tags combined into one area
//! - **Two-pass collection**: relations first, member ways second
//! - **Pluggable geometry**: algorithm depends only on [`geometry::GeometryKernel`];
//!   a GEOS-backed kernel is available with the `geos` feature
//!
//! ## Example
//!
//! ```
//! use osm_multipolygon::prelude::*;
//! use geo::Coord;
//!
//! let square = Way {
//!     id: 10,
//!     node_ids: vec![1, 2, 3, 4, 1],
//!     coords: vec![
//!         Coord { x: 0.0, y: 0.0 },
//!         Coord { x: 1.0, y: 0.0 },
//!         Coord { x: 1.0, y: 1.0 },
//!         Coord { x: 0.0, y: 1.0 },
//!         Coord { x: 0.0, y: 0.0 },
//!     ],
//!     tags: Tags::new(),
//!     meta: Meta::default(),
//! };
//!
//! let mut tags = Tags::new();
//! tags.insert("type".into(), "multipolygon".into());
//! tags.insert("natural".into(), "water".into());
//! let relation = Relation {
//!     id: 1,
//!     members: vec![Member { kind: MemberKind::Way, id: 10, role: "outer".into() }],
//!     tags,
//!     meta: Meta::default(),
//! };
//!
//! let builder = MultipolygonBuilder::default();
//! let output = builder.build(&relation, AreaKind::Multipolygon, &[(&square, MemberRole::Outer)]);
//! let area = output.area.unwrap();
//! assert_eq!(area.geometry.0.len(), 1);
//! ```

pub mod builder;
pub mod collector;
pub mod config;
pub mod containment;
pub mod error;
pub mod geometry;
pub mod instrument;
pub mod model;
pub mod repair;
pub mod ring;
pub mod tags;
pub mod touching;
pub mod way_info;

// Re-exports for convenience
pub mod prelude {
    pub use crate::builder::{BuildOutput, MultipolygonBuilder};
    pub use crate::collector::{AreaHandler, CollectorStats, RelationCollector, RelationFilter};
    pub use crate::config::{BuildConfig, GapMetric};
    pub use crate::error::{BuildError, BuildWarning};
    pub use crate::geometry::{GeometryError, GeometryKernel, PlanarKernel, RingIntersection};
    #[cfg(feature = "geos")]
    pub use crate::geometry::GeosKernel;
    pub use crate::instrument::{Phase, PhaseObserver, PhaseTimings};
    pub use crate::model::*;
}

pub use prelude::*;
