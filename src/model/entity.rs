//! Entities, fields and type references.

use crate::model::path::PathSet;
use crate::model::selectivity::Selectivity;
use crate::model::{ModelError, ModelResult};
use std::collections::BTreeMap;
use std::fmt;

/// Type name that marks an entity's identifier field.
pub const ID_TYPE: &str = "ID";

/// Index of an entity in the model arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// An entity type with its fields and statistics.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub fields: BTreeMap<String, Field>,
    /// Upper bound on the number of rows.
    pub max_rows: u64,
    /// Selectivity statistics keyed by the exact set of paths they describe.
    pub selectivity: BTreeMap<PathSet, Selectivity>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// The identifier field. Exactly one is required.
    pub fn id_field(&self) -> ModelResult<&Field> {
        let ids: Vec<&Field> = self
            .fields
            .values()
            .filter(|f| f.type_def.type_name == ID_TYPE)
            .collect();
        match ids.as_slice() {
            [field] => Ok(field),
            _ => Err(ModelError::MissingIdentifier {
                entity: self.name.clone(),
                count: ids.len(),
            }),
        }
    }
}

/// A field on an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_def: TypeDef,
    pub immutable: bool,
}

impl Field {
    /// True when the field's type resolves to another entity.
    pub fn is_relationship(&self) -> bool {
        self.type_def.entity.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    Single,
    List,
}

/// Reference to a scalar or entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub type_name: String,
    /// Resolved target entity, `None` for scalars.
    pub entity: Option<EntityId>,
    pub multiplicity: Multiplicity,
    pub non_null: bool,
}

impl TypeDef {
    pub fn scalar(type_name: impl Into<String>, non_null: bool) -> Self {
        Self {
            type_name: type_name.into(),
            entity: None,
            multiplicity: Multiplicity::Single,
            non_null,
        }
    }
}
