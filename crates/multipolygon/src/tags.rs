//! Tag comparison and merging between a relation and its member ways.
//!
//! Structural keys (`type`, `created_by`, `source`, `note`) never take part
//! in a comparison or a merge.

use crate::model::Tags;

pub const EXCLUDED_KEYS: [&str; 4] = ["type", "created_by", "source", "note"];

pub fn is_excluded(key: &str) -> bool {
    EXCLUDED_KEYS.contains(&key)
}

/// True if the tag set has no keys other than the excluded ones
pub fn untagged(tags: &Tags) -> bool {
    tags.keys().all(|k| is_excluded(k))
}

/// Compare two tag sets, ignoring excluded keys
pub fn same_tags(a: &Tags, b: &Tags) -> bool {
    let relevant = |tags: &Tags| tags.keys().filter(|k| !is_excluded(k)).count();
    if relevant(a) != relevant(b) {
        return false;
    }
    a.iter()
        .filter(|(k, _)| !is_excluded(k))
        .all(|(k, v)| b.get(k) == Some(v))
}

/// Copy every non-excluded key from `source` that `target` lacks.
///
/// Existing values are kept. Returns false if some key had a different value.
pub fn merge_tags(target: &mut Tags, source: &Tags) -> bool {
    let mut consistent = true;
    for (k, v) in source.iter().filter(|(k, _)| !is_excluded(k)) {
        match target.get(k) {
            Some(existing) if existing != v => consistent = false,
            Some(_) => {}
            None => {
                target.insert(k.clone(), v.clone());
            }
        }
    }
    consistent
}

/// What happened when an outer way's tags met the area's tags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagMerge {
    /// The way has no relevant tags
    Untagged,
    /// The way is tagged the same as the area
    Same,
    /// The area was untagged and took over the way's tags
    Adopted,
    /// Sole way of the sole outer ring: tags merged into the area
    Merged { conflict: bool },
    /// Differing tags left alone
    Conflict,
}

/// Apply the merge policy for one way of an outer ring.
///
/// `sole_outer_way` is set when the multipolygon has exactly one outer ring
/// and that ring consists of exactly one way.
pub fn apply_way_tags(area_tags: &mut Tags, way_tags: &Tags, sole_outer_way: bool) -> TagMerge {
    if untagged(way_tags) {
        TagMerge::Untagged
    } else if same_tags(area_tags, way_tags) {
        TagMerge::Same
    } else if untagged(area_tags) {
        merge_tags(area_tags, way_tags);
        TagMerge::Adopted
    } else if sole_outer_way {
        let consistent = merge_tags(area_tags, way_tags);
        TagMerge::Merged {
            conflict: !consistent,
        }
    } else {
        TagMerge::Conflict
    }
}
