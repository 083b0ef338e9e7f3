//! Field paths and path sets.

use crate::model::entity::EntityId;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An ordered walk of fields from a root entity to a (possibly nested) leaf.
///
/// Equality, hashing and ordering consider only the field sequence (root
/// entity plus segment names). The sargability flag is derived from the
/// fields at resolution time and never participates in identity.
#[derive(Debug, Clone)]
pub struct FieldPath {
    root: EntityId,
    segments: Vec<String>,
    sargable: bool,
}

impl FieldPath {
    pub(crate) fn new(root: EntityId, segments: Vec<String>, sargable: bool) -> Self {
        Self {
            root,
            segments,
            sargable,
        }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A path is sargable when every field before the leaf is immutable and
    /// non-null, so the path can be baked into a key without going stale.
    pub fn is_sargable(&self) -> bool {
        self.sargable
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.segments == other.segments
    }
}

impl Eq for FieldPath {}

impl Hash for FieldPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        self.segments.hash(state);
    }
}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.root
            .cmp(&other.root)
            .then_with(|| self.segments.cmp(&other.segments))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// An unordered set of paths. Ordered storage keeps iteration deterministic.
pub type PathSet = BTreeSet<FieldPath>;

/// Render a path set as `{a, b.c}`.
pub fn display_set(paths: &PathSet) -> String {
    let names: Vec<String> = paths.iter().map(ToString::to_string).collect();
    format!("{{{}}}", names.join(", "))
}
