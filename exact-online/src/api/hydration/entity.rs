//! Typed entity values

use std::collections::HashMap;
use std::sync::Arc;

use super::Value;
use crate::api::errors::{Error, Result, ValidationError};
use crate::api::metadata::EntityMetadata;

static NULL: Value = Value::Null;

/// One record of a metadata-described entity
///
/// Unset fields read as [`Value::Null`].
#[derive(Clone)]
pub struct Entity {
    metadata: Arc<EntityMetadata>,
    values: HashMap<String, Value>,
}

impl Entity {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self {
            metadata,
            values: HashMap::new(),
        }
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    pub fn tag(&self) -> &str {
        self.metadata.tag()
    }

    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Set a field after checking it exists and its codec accepts the value
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let descriptor = self.metadata.require_field(field)?;
        descriptor
            .edm_type()
            .validate(&value)
            .map_err(|e| e.for_field(field))?;

        if let (Some(tag), Value::Collection(items)) =
            (descriptor.edm_type().collection_of(), &value)
        {
            if let Some(stray) = items.iter().find(|item| item.tag() != tag) {
                return Err(Error::Validation(ValidationError::new(
                    field,
                    format!("expected `{}` entities, got `{}`", tag, stray.tag()),
                )));
            }
        }

        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Value of the first key field
    pub fn key(&self) -> Option<&Value> {
        self.metadata
            .key_field()
            .map(|f| self.get(f.name()))
            .filter(|v| !v.is_null())
    }

    /// Populated fields in declared order
    pub fn populated(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata.fields().iter().filter_map(|f| {
            self.values
                .get(f.name())
                .filter(|v| !v.is_null())
                .map(|v| (f.name(), v))
        })
    }

    pub(crate) fn assign(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag()
            && self
                .metadata
                .fields()
                .iter()
                .all(|f| self.get(f.name()) == other.get(f.name()))
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct(self.metadata.tag());
        for (name, value) in self.populated() {
            s.field(name, value);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::codec::EdmType;
    use crate::api::metadata::{EntityDescriptor, FieldSpec};

    fn metadata() -> Arc<EntityMetadata> {
        Arc::new(
            EntityMetadata::compile(
                &EntityDescriptor::new("Item", "/api/v1/{division}/logistics/Items")
                    .field(FieldSpec::new("ID", EdmType::Guid).key())
                    .field(FieldSpec::new("Code", EdmType::String))
                    .field(FieldSpec::new("Stock", EdmType::Int32)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_set_validates() {
        let mut item = Entity::new(metadata());
        item.set("Code", "BIKE-01").unwrap();
        assert_eq!(item.get("Code"), &Value::from("BIKE-01"));
        assert_eq!(item.get("Stock"), &Value::Null);

        assert!(matches!(item.set("Stock", "many"), Err(Error::Validation(_))));
        assert!(matches!(item.set("Colour", "red"), Err(Error::UnknownField { .. })));
    }

    #[test]
    fn test_key_and_populated_order() {
        let item = Entity::new(metadata())
            .with("Stock", 4)
            .unwrap()
            .with("ID", "2b5a7b99-e210-46ee-9511-3cac0b66405d")
            .unwrap();
        assert!(item.key().is_some());
        let names: Vec<&str> = item.populated().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["ID", "Stock"]);
    }
}
