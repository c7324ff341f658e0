//! Payload types for the business capability surface.
//!
//! These are carried through the pool untouched; only sessions interpret them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A record of a named table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub logical_name: String,
    pub id: Option<Uuid>,
    pub attributes: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(logical_name: &str) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            id: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Copy of this entity keeping only the requested columns.
    pub fn project(&self, columns: &ColumnSet) -> Entity {
        match columns {
            ColumnSet::All => self.clone(),
            ColumnSet::Columns(names) => Entity {
                logical_name: self.logical_name.clone(),
                id: self.id,
                attributes: self
                    .attributes
                    .iter()
                    .filter(|(k, _)| names.iter().any(|n| n == *k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
        }
    }
}

/// Which attributes a retrieve should return.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnSet {
    #[default]
    All,
    Columns(Vec<String>),
}

impl ColumnSet {
    pub fn of(names: &[&str]) -> Self {
        Self::Columns(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Equality-filtered query over one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryExpression {
    pub entity_name: String,
    pub columns: ColumnSet,
    /// Attribute/value pairs that must all match.
    pub conditions: Vec<(String, Value)>,
    pub top: Option<usize>,
}

impl QueryExpression {
    pub fn new(entity_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn where_eq(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((attribute.to_string(), value.into()));
        self
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top = Some(n);
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        entity.logical_name == self.entity_name
            && self
                .conditions
                .iter()
                .all(|(attr, value)| entity.get(attr) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityCollection {
    pub entity_name: String,
    pub entities: Vec<Entity>,
    pub more_records: bool,
}

/// A named message executed on the remote service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrganizationRequest {
    pub name: String,
    pub parameters: BTreeMap<String, Value>,
}

impl OrganizationRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrganizationResponse {
    pub name: String,
    pub results: BTreeMap<String, Value>,
}
