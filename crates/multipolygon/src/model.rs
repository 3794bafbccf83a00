//! OSM objects as delivered by the stream source, and the areas built from them.

use geo::{Coord, MultiPolygon};
use hashbrown::HashMap;

/// Tag storage type
pub type Tags = HashMap<String, String>;

/// Object metadata copied through to the built areas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub changeset: i64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub uid: i32,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: i64,
    pub coord: Coord<f64>,
    pub tags: Tags,
}

/// A way with resolved coordinates.
///
/// `coords[i]` is the location of node `node_ids[i]`.
#[derive(Clone, Debug)]
pub struct Way {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub coords: Vec<Coord<f64>>,
    pub tags: Tags,
    pub meta: Meta,
}

impl Way {
    pub fn first_node(&self) -> Option<i64> {
        self.node_ids.first().copied()
    }

    pub fn last_node(&self) -> Option<i64> {
        self.node_ids.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.node_ids.len() >= 4 && self.first_node() == self.last_node()
    }
}

/// Member type in a relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

/// Member role in a relation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberRole {
    Outer,
    Inner,
    Unknown,
}

impl MemberRole {
    pub fn parse(role: &str) -> Self {
        match role {
            "outer" => MemberRole::Outer,
            "inner" => MemberRole::Inner,
            _ => MemberRole::Unknown,
        }
    }
}

/// Relation member
#[derive(Clone, Debug)]
pub struct Member {
    pub kind: MemberKind,
    pub id: i64,
    pub role: String,
}

#[derive(Clone, Debug)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
    pub meta: Meta,
}

/// What kind of relation an area was built from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AreaKind {
    Multipolygon,
    Boundary,
}

impl AreaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AreaKind::Multipolygon => "multipolygon",
            AreaKind::Boundary => "boundary",
        }
    }
}

/// The OSM object an area was built from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Relation(i64),
    Way(i64),
}

impl Origin {
    pub fn id(self) -> i64 {
        match self {
            Origin::Relation(id) | Origin::Way(id) => id,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Origin::Relation(_) => "relation",
            Origin::Way(_) => "way",
        }
    }
}

/// A finished area: geometry plus the tags and metadata of its source object.
///
/// Exterior rings wind counterclockwise, holes clockwise.
#[derive(Clone, Debug)]
pub struct Area {
    pub origin: Origin,
    pub kind: AreaKind,
    pub geometry: MultiPolygon<f64>,
    pub tags: Tags,
    pub meta: Meta,
}

/// Default relation retention policy: keep `type=multipolygon` and `type=boundary`.
pub fn area_kind(tags: &Tags) -> Option<AreaKind> {
    match tags.get("type").map(String::as_str) {
        Some("multipolygon") => Some(AreaKind::Multipolygon),
        Some("boundary") => Some(AreaKind::Boundary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_kind() {
        let mut tags = Tags::new();
        assert_eq!(area_kind(&tags), None);

        tags.insert("type".to_string(), "multipolygon".to_string());
        assert_eq!(area_kind(&tags), Some(AreaKind::Multipolygon));

        tags.insert("type".to_string(), "boundary".to_string());
        assert_eq!(area_kind(&tags), Some(AreaKind::Boundary));

        tags.insert("type".to_string(), "route".to_string());
        assert_eq!(area_kind(&tags), None);
    }

    #[test]
    fn test_member_role_parse() {
        assert_eq!(MemberRole::parse("outer"), MemberRole::Outer);
        assert_eq!(MemberRole::parse("inner"), MemberRole::Inner);
        assert_eq!(MemberRole::parse(""), MemberRole::Unknown);
        assert_eq!(MemberRole::parse("Outer"), MemberRole::Unknown);
    }

    #[test]
    fn test_way_is_closed() {
        let coords = vec![Coord { x: 0.0, y: 0.0 }; 4];
        let way = Way {
            id: 1,
            node_ids: vec![1, 2, 3, 1],
            coords: coords.clone(),
            tags: Tags::new(),
            meta: Meta::default(),
        };
        assert!(way.is_closed());

        let open = Way {
            id: 2,
            node_ids: vec![1, 2, 3, 4],
            coords,
            tags: Tags::new(),
            meta: Meta::default(),
        };
        assert!(!open.is_closed());
    }
}
