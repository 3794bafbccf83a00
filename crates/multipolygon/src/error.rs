use crate::model::MemberRole;

/// Why a relation could not be turned into an area.
///
/// Every variant is local to one relation; the collector logs it and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("un-connectable dangling ends at nodes {nodes:?}")]
    DanglingEnds { nodes: Vec<i64> },

    #[error("no rings")]
    NoRings,

    #[error("invalid ring: {0}")]
    InvalidRing(String),

    #[error("multipolygon invalid")]
    InvalidMultiPolygon,

    #[error("invalid way geometry in member way {0}")]
    InvalidWayGeometry(i64),
}

/// Diagnostics that never block output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildWarning {
    /// A one-way inner ring carries the same tags as the relation or its outer way.
    #[error("duplicate tags on inner way {way_id}")]
    DuplicateTagsOnInner { way_id: i64 },

    /// The member role disagrees with where the way ended up.
    #[error("way {way_id} has role {role:?} but forms an {placed:?} ring")]
    RoleMismatch {
        way_id: i64,
        role: MemberRole,
        placed: MemberRole,
    },

    /// An outer way's tags differ from the relation's and were not merged.
    #[error("tags of way {way_id} conflict with relation tags")]
    TagConflict { way_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BuildError::DanglingEnds { nodes: vec![1, 4] }.to_string(),
            "un-connectable dangling ends at nodes [1, 4]"
        );
        assert_eq!(
            BuildWarning::RoleMismatch {
                way_id: 7,
                role: MemberRole::Inner,
                placed: MemberRole::Outer,
            }
            .to_string(),
            "way 7 has role Inner but forms an Outer ring"
        );
        assert_eq!(
            BuildWarning::DuplicateTagsOnInner { way_id: 3 }.to_string(),
            "duplicate tags on inner way 3"
        );
    }
}
