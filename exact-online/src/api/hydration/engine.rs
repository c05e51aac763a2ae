//! Hydration/deflation engine

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use super::{Entity, Value};
use crate::api::errors::{Error, Result, ValidationError};
use crate::api::metadata::{EntityMetadata, MetadataRegistry};
use crate::api::operations::Operation;

const SNAPSHOT_TAG: &str = "$entity";

/// Serialized form of an entity, readable back by [`Hydrator::hydrate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(rename = "$entity")]
    pub entity: String,
    pub values: Map<String, Json>,
}

impl EntitySnapshot {
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Decode(e.to_string()))
    }

    fn into_values(self, tag: &str) -> Result<Map<String, Json>> {
        if self.entity != tag {
            return Err(Error::Decode(format!(
                "snapshot of `{}` cannot hydrate `{}`",
                self.entity, tag
            )));
        }
        Ok(self.values)
    }
}

/// Input accepted by hydration
#[derive(Debug, Clone)]
pub enum RawData {
    /// Already-parsed structured data
    Json(Json),
    /// Textual payload, parsed as JSON first
    Text(String),
    Snapshot(EntitySnapshot),
}

impl From<Json> for RawData {
    fn from(value: Json) -> Self {
        RawData::Json(value)
    }
}

impl From<String> for RawData {
    fn from(value: String) -> Self {
        RawData::Text(value)
    }
}

impl From<&str> for RawData {
    fn from(value: &str) -> Self {
        RawData::Text(value.to_string())
    }
}

impl From<EntitySnapshot> for RawData {
    fn from(value: EntitySnapshot) -> Self {
        RawData::Snapshot(value)
    }
}

impl RawData {
    fn into_object(self, tag: &str) -> Result<Map<String, Json>> {
        let json = match self {
            RawData::Json(json) => json,
            RawData::Text(text) => serde_json::from_str(text.trim())
                .map_err(|e| Error::Decode(format!("payload is not JSON: {}", e)))?,
            RawData::Snapshot(snapshot) => return snapshot.into_values(tag),
        };

        match json {
            Json::Object(map) if map.contains_key(SNAPSHOT_TAG) => {
                let snapshot: EntitySnapshot = serde_json::from_value(Json::Object(map))
                    .map_err(|e| Error::Decode(format!("malformed snapshot: {}", e)))?;
                snapshot.into_values(tag)
            }
            Json::Object(map) => Ok(map),
            other => Err(Error::Decode(format!(
                "expected a JSON object for `{}`, got {}",
                tag, other
            ))),
        }
    }
}

/// Nested collections arrive unexpanded as `{"__deferred": {...}}`
fn is_deferred(wire: &Json) -> bool {
    wire.as_object()
        .is_some_and(|map| map.contains_key("__deferred"))
}

fn in_field(err: Error, field: &str) -> Error {
    match err {
        Error::Validation(e) => Error::Validation(e.for_field(field)),
        other => other,
    }
}

/// Converts raw data to entities and back
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'r> {
    registry: &'r MetadataRegistry,
}

impl<'r> Hydrator<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self { registry }
    }

    /// Populate an entity from raw data
    ///
    /// Fields missing from the data keep their current value (null for a
    /// fresh entity); only a present value that fails to decode is an error.
    pub fn hydrate(
        &self,
        metadata: &Arc<EntityMetadata>,
        raw: impl Into<RawData>,
        target: Option<Entity>,
    ) -> Result<Entity> {
        let object = raw.into().into_object(metadata.tag())?;

        let mut entity = match target {
            Some(entity) if entity.tag() == metadata.tag() => entity,
            Some(entity) => {
                return Err(Error::Decode(format!(
                    "cannot hydrate `{}` data into a `{}` instance",
                    metadata.tag(),
                    entity.tag()
                )));
            }
            None => Entity::new(Arc::clone(metadata)),
        };

        for field in metadata.fields() {
            let Some(wire) = object.get(field.name()) else {
                continue;
            };
            if is_deferred(wire) {
                continue;
            }
            let value = match field.edm_type().collection_of() {
                Some(tag) => self
                    .hydrate_collection(tag, wire)
                    .map_err(|e| in_field(e, field.name()))?,
                None => field
                    .edm_type()
                    .decode(wire)
                    .map_err(|e| e.for_field(field.name()))?,
            };
            entity.assign(field.name(), value);
        }

        Ok(entity)
    }

    fn hydrate_collection(&self, tag: &str, wire: &Json) -> Result<Value> {
        let items = match wire {
            Json::Null => return Ok(Value::Null),
            Json::Array(items) => items,
            Json::Object(map) => match map.get("results") {
                Some(Json::Array(items)) => items,
                _ => return Err(ValidationError::reason("expected nested results").into()),
            },
            _ => return Err(ValidationError::reason("expected an array of records").into()),
        };

        let nested = self.registry.metadata(tag)?;
        items
            .iter()
            .map(|item| self.hydrate(&nested, RawData::Json(item.clone()), None))
            .collect::<Result<Vec<_>>>()
            .map(Value::Collection)
    }

    /// Encode an entity into structured data
    ///
    /// With an operation, only fields visible for it are emitted.
    pub fn deflate(
        &self,
        entity: &Entity,
        operation: Option<Operation>,
        skip_null: bool,
    ) -> Result<Map<String, Json>> {
        let mut out = Map::new();

        for field in entity.metadata().fields() {
            if let Some(op) = operation {
                if !field.is_visible_for(op) {
                    continue;
                }
            }

            let value = entity.get(field.name());
            let wire = match (field.edm_type().collection_of(), value) {
                (Some(_), Value::Collection(items)) => Json::Array(
                    items
                        .iter()
                        .map(|item| self.deflate(item, operation, skip_null).map(Json::Object))
                        .collect::<Result<Vec<_>>>()
                        .map_err(|e| in_field(e, field.name()))?,
                ),
                _ => field
                    .edm_type()
                    .encode(value)
                    .map_err(|e| e.for_field(field.name()))?,
            };

            if skip_null && wire.is_null() {
                continue;
            }
            out.insert(field.name().to_string(), wire);
        }

        Ok(out)
    }

    /// Serializable form of every field
    pub fn snapshot(&self, entity: &Entity) -> Result<EntitySnapshot> {
        Ok(EntitySnapshot {
            entity: entity.tag().to_string(),
            values: self.deflate(entity, None, false)?,
        })
    }

    /// Reject null required fields that `operation` would send
    pub fn check_required(&self, entity: &Entity, operation: Operation) -> Result<()> {
        let missing = entity.metadata().fields().iter().find(|f| {
            f.is_required() && f.is_visible_for(operation) && entity.get(f.name()).is_null()
        });
        match missing {
            Some(field) => Err(ValidationError::new(
                field.name(),
                format!("required for {}", operation),
            )
            .into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USER_ID: &str = "2b5a7b99-e210-46ee-9511-3cac0b66405d";

    fn registry() -> MetadataRegistry {
        MetadataRegistry::with_builtin_schemas()
    }

    #[test]
    fn test_hydrate_me_and_deflate_skip_null() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let me = registry.metadata("Me").unwrap();

        let raw = json!({"CurrentDivision": 4133185, "UserID": USER_ID});
        let entity = hydrator.hydrate(&me, raw.clone(), None).unwrap();
        assert_eq!(entity.get("CurrentDivision"), &Value::Int(4133185));
        assert_eq!(entity.get("FullName"), &Value::Null);

        let deflated = hydrator.deflate(&entity, None, true).unwrap();
        assert_eq!(Json::Object(deflated), raw);
    }

    #[test]
    fn test_deflate_without_skip_reproduces_input() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let account = registry.metadata("GLAccount").unwrap();

        let raw = json!({
            "ID": "6f4bd2c1-57ed-4b5f-9c3b-7a3c8e34a1f0",
            "Code": "8000",
            "Description": "Omzet",
            "Blocked": false,
            "Created": "/Date(1709296205000)/",
            "__metadata": {"uri": "https://start.exactonline.nl/..."}
        });
        let entity = hydrator.hydrate(&account, raw, None).unwrap();
        let deflated = hydrator.deflate(&entity, None, false).unwrap();

        assert_eq!(deflated.len(), account.fields().len());
        assert_eq!(deflated["Code"], json!("8000"));
        assert_eq!(deflated["Blocked"], json!(false));
        assert_eq!(deflated["Created"], json!("2024-03-01T12:30:05"));
        assert_eq!(deflated["VATCode"], Json::Null);
        assert!(!deflated.contains_key("__metadata"));
    }

    #[test]
    fn test_deflate_respects_operation_visibility() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let account = registry.metadata("GLAccount").unwrap();

        let entity = hydrator
            .hydrate(
                &account,
                json!({
                    "ID": "6f4bd2c1-57ed-4b5f-9c3b-7a3c8e34a1f0",
                    "Code": "8000",
                    "Description": "Omzet",
                    "Division": 4133185,
                    "Created": "2024-03-01T12:30:05"
                }),
                None,
            )
            .unwrap();

        for op in Operation::ALL {
            let deflated = hydrator.deflate(&entity, Some(op), false).unwrap();
            for name in deflated.keys() {
                assert!(account.field(name).unwrap().is_visible_for(op), "{} leaked into {}", name, op);
            }

            let back = hydrator.hydrate(&account, Json::Object(deflated), None).unwrap();
            for (name, _) in back.populated() {
                assert!(account.field(name).unwrap().is_visible_for(op));
            }
        }

        let update = hydrator.deflate(&entity, Some(Operation::Update), true).unwrap();
        assert!(!update.contains_key("ID"));
        assert!(!update.contains_key("Code"));
        assert_eq!(update["Description"], json!("Omzet"));
    }

    #[test]
    fn test_hydrate_text_and_snapshot() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let me = registry.metadata("Me").unwrap();

        let entity = hydrator
            .hydrate(&me, r#"  {"CurrentDivision": 17, "FullName": "Jan Jansen"} "#, None)
            .unwrap();
        assert_eq!(entity.get("FullName"), &Value::from("Jan Jansen"));

        let text = hydrator.snapshot(&entity).unwrap().to_text().unwrap();
        let restored = hydrator.hydrate(&me, text, None).unwrap();
        assert_eq!(restored, entity);

        let glaccount = registry.metadata("GLAccount").unwrap();
        let snapshot = hydrator.snapshot(&entity).unwrap();
        assert!(matches!(
            hydrator.hydrate(&glaccount, snapshot, None),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_hydrate_into_target_keeps_other_fields() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let me = registry.metadata("Me").unwrap();

        let target = hydrator
            .hydrate(&me, json!({"FullName": "Jan Jansen"}), None)
            .unwrap();
        let merged = hydrator
            .hydrate(&me, json!({"CurrentDivision": 17}), Some(target))
            .unwrap();
        assert_eq!(merged.get("FullName"), &Value::from("Jan Jansen"));
        assert_eq!(merged.get("CurrentDivision"), &Value::Int(17));
    }

    #[test]
    fn test_hydrate_rejects_bad_values() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let me = registry.metadata("Me").unwrap();

        let err = hydrator
            .hydrate(&me, json!({"CurrentDivision": "abc"}), None)
            .unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.field, "CurrentDivision"),
            other => panic!("unexpected error: {}", other),
        }

        assert!(matches!(hydrator.hydrate(&me, "not json", None), Err(Error::Decode(_))));
        assert!(matches!(hydrator.hydrate(&me, json!([1, 2]), None), Err(Error::Decode(_))));
    }

    #[test]
    fn test_nested_collections() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let invoice = registry.metadata("SalesInvoice").unwrap();

        let entity = hydrator
            .hydrate(
                &invoice,
                json!({
                    "Journal": "70",
                    "SalesInvoiceLines": {"results": [
                        {"Item": "6f4bd2c1-57ed-4b5f-9c3b-7a3c8e34a1f0", "Quantity": 2, "UnitPrice": 9.95},
                        {"Item": "7a4bd2c1-57ed-4b5f-9c3b-7a3c8e34a1f0", "Quantity": 1, "LineNumber": 2}
                    ]}
                }),
                None,
            )
            .unwrap();

        let lines = entity.get("SalesInvoiceLines").as_collection().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].tag(), "SalesInvoiceLine");
        assert_eq!(lines[0].get("Quantity"), &Value::Float(2.0));

        // LineNumber is read-only and must not be sent on create
        let body = hydrator.deflate(&entity, Some(Operation::Create), true).unwrap();
        let sent = body["SalesInvoiceLines"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].get("LineNumber").is_none());
        assert_eq!(sent[0]["UnitPrice"], json!(9.95));
    }

    #[test]
    fn test_deferred_collection_is_skipped() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let invoice = registry.metadata("SalesInvoice").unwrap();

        let entity = hydrator
            .hydrate(
                &invoice,
                json!({"SalesInvoiceLines": {"__deferred": {"uri": "https://start.exactonline.nl/api/..."}}}),
                None,
            )
            .unwrap();
        assert!(entity.get("SalesInvoiceLines").is_null());
    }

    #[test]
    fn test_check_required() {
        let registry = registry();
        let hydrator = Hydrator::new(&registry);
        let account = registry.metadata("GLAccount").unwrap();

        let entity = Entity::new(account.clone()).with("Code", "8000").unwrap();
        let err = hydrator.check_required(&entity, Operation::Create).unwrap_err();
        assert!(matches!(err, Error::Validation(ref e) if e.field == "Description"));

        let entity = entity
            .with("Description", "Omzet")
            .unwrap()
            .with("Type", 110)
            .unwrap();
        assert!(hydrator.check_required(&entity, Operation::Create).is_ok());
    }
}
