//! Collapse candidates into physical tables.

use crate::model::EntityId;
use crate::planner::logical::{IndexId, IndexKey, Workload};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueIndexId(pub usize);

/// One physical table and the candidates that would read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueIndex {
    pub id: UniqueIndexId,
    pub key: IndexKey,
    pub members: Vec<IndexId>,
}

impl UniqueIndex {
    pub fn root_entity(&self) -> EntityId {
        self.key.root_entity
    }
}

/// Partition of a workload's candidates by [`IndexKey`].
///
/// Ids follow key order, so the same candidate set yields the same tables
/// no matter how the candidates were ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueIndexes {
    tables: Vec<UniqueIndex>,
    by_index: Vec<UniqueIndexId>,
}

impl UniqueIndexes {
    pub fn collapse(workload: &Workload) -> Self {
        let mut groups: BTreeMap<&IndexKey, Vec<IndexId>> = BTreeMap::new();
        for id in workload.index_ids() {
            groups.entry(&workload.index(id).key).or_default().push(id);
        }

        let mut by_index = vec![UniqueIndexId(0); workload.indexes().len()];
        let tables = groups
            .into_iter()
            .enumerate()
            .map(|(i, (key, members))| {
                let id = UniqueIndexId(i);
                for member in &members {
                    by_index[member.0] = id;
                }
                UniqueIndex {
                    id,
                    key: key.clone(),
                    members,
                }
            })
            .collect();

        Self { tables, by_index }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniqueIndex> {
        self.tables.iter()
    }

    pub fn get(&self, id: UniqueIndexId) -> &UniqueIndex {
        &self.tables[id.0]
    }

    /// The table a candidate reads from.
    pub fn of(&self, index: IndexId) -> UniqueIndexId {
        self.by_index[index.0]
    }

    pub fn rooted_at(&self, entity: EntityId) -> impl Iterator<Item = &UniqueIndex> {
        self.tables.iter().filter(move |t| t.root_entity() == entity)
    }
}
