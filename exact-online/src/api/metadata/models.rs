//! Exact Online entity metadata models

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::api::codec::EdmType;
use crate::api::constants::{DEFAULT_PAGE_SIZE, DIVISION_PLACEHOLDER};
use crate::api::errors::{Error, Result};
use crate::api::operations::Operation;

/// Set of operations, stored as a bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationSet(u8);

impl OperationSet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self::of(&Operation::ALL);
    pub const READ: Self = Self::of(&[Operation::Read]);
    /// Read and create, e.g. fields fixed after creation
    pub const READ_CREATE: Self = Self::of(&[Operation::Read, Operation::Create]);
    /// Read, create and update
    pub const WRITABLE: Self = Self::of(&[Operation::Read, Operation::Create, Operation::Update]);

    pub const fn of(ops: &[Operation]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < ops.len() {
            bits |= ops[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub const fn contains(&self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    pub const fn with(self, op: Operation) -> Self {
        Self(self.0 | op.bit())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(|op| self.contains(*op))
    }
}

/// Field declaration as supplied by an entity descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub edm_type: EdmType,
    pub required: bool,
    pub is_key: bool,
    pub operations: OperationSet,
}

impl FieldSpec {
    /// A field visible for every operation
    pub fn new(name: impl Into<String>, edm_type: EdmType) -> Self {
        Self {
            name: name.into(),
            edm_type,
            required: false,
            is_key: false,
            operations: OperationSet::ALL,
        }
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn operations(mut self, operations: OperationSet) -> Self {
        self.operations = operations;
        self
    }

    /// Shorthand for fields the service computes
    pub fn read_only(self) -> Self {
        self.operations(OperationSet::READ)
    }
}

/// External description of one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub tag: String,
    /// Endpoint path; `{division}` is substituted per request
    pub endpoint: String,
    pub page_size: u32,
    /// Operations the endpoint supports
    pub methods: OperationSet,
    pub fields: Vec<FieldSpec>,
}

impl EntityDescriptor {
    pub fn new(tag: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            endpoint: endpoint.into(),
            page_size: DEFAULT_PAGE_SIZE,
            methods: OperationSet::ALL,
            fields: Vec::new(),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn methods(mut self, methods: OperationSet) -> Self {
        self.methods = methods;
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// Compiled, immutable field description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    edm_type: EdmType,
    required: bool,
    is_key: bool,
    operations: OperationSet,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edm_type(&self) -> &EdmType {
        &self.edm_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn operations(&self) -> OperationSet {
        self.operations
    }

    pub fn is_visible_for(&self, op: Operation) -> bool {
        self.operations.contains(op)
    }
}

/// Compiled description of one entity; never mutated after compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    tag: String,
    endpoint: String,
    page_size: u32,
    methods: OperationSet,
    fields: Vec<FieldDescriptor>,
    keys: Vec<String>,
}

impl EntityMetadata {
    /// Compile a descriptor, rejecting duplicate or malformed declarations
    pub fn compile(descriptor: &EntityDescriptor) -> Result<Self> {
        let schema_error = |reason: String| Error::Schema {
            entity: descriptor.tag.clone(),
            reason,
        };

        if descriptor.tag.trim().is_empty() {
            return Err(schema_error("entity tag is empty".into()));
        }
        if !descriptor.endpoint.starts_with('/') {
            return Err(schema_error(format!(
                "endpoint '{}' must be an absolute path",
                descriptor.endpoint
            )));
        }
        if descriptor.page_size == 0 {
            return Err(schema_error("page size must be positive".into()));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(descriptor.fields.len());
        let mut keys = Vec::new();
        for spec in &descriptor.fields {
            if spec.name.is_empty() {
                return Err(schema_error("field with an empty name".into()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(schema_error(format!("duplicate field '{}'", spec.name)));
            }
            if spec.is_key {
                if !spec.edm_type.is_filterable() {
                    return Err(schema_error(format!(
                        "key field '{}' must have a filterable type",
                        spec.name
                    )));
                }
                keys.push(spec.name.clone());
            }
            fields.push(FieldDescriptor {
                name: spec.name.clone(),
                edm_type: spec.edm_type.clone(),
                required: spec.required,
                is_key: spec.is_key,
                operations: spec.operations,
            });
        }

        Ok(Self {
            tag: descriptor.tag.clone(),
            endpoint: descriptor.endpoint.clone(),
            page_size: descriptor.page_size,
            methods: descriptor.methods,
            fields,
            keys,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn methods(&self) -> OperationSet {
        self.methods
    }

    /// Fields in declared order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field, failing with a schema mismatch
    pub fn require_field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            entity: self.tag.clone(),
            field: name.to_string(),
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The first declared key field
    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        self.keys.first().and_then(|k| self.field(k))
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.methods.contains(op)
    }

    /// Fail before any network call when the entity lacks `op`
    pub fn ensure_supports(&self, op: Operation) -> Result<()> {
        if self.supports(op) {
            Ok(())
        } else {
            Err(Error::MethodNotSupported {
                entity: self.tag.clone(),
                operation: op,
            })
        }
    }

    /// Whether requests need a resolved division
    pub fn requires_division(&self) -> bool {
        self.endpoint.contains(DIVISION_PLACEHOLDER)
    }

    /// Endpoint path with the division substituted
    pub fn endpoint_for(&self, division: Option<i64>) -> Result<String> {
        match (self.requires_division(), division) {
            (false, _) => Ok(self.endpoint.clone()),
            (true, Some(division)) => Ok(self
                .endpoint
                .replace(DIVISION_PLACEHOLDER, &division.to_string())),
            (true, None) => Err(Error::Config(format!(
                "endpoint of `{}` needs a division",
                self.tag
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("GLAccount", "/api/v1/{division}/financial/GLAccounts")
            .field(FieldSpec::new("ID", EdmType::Guid).key().read_only())
            .field(FieldSpec::new("Code", EdmType::String).required())
            .field(FieldSpec::new("Description", EdmType::String))
    }

    #[test]
    fn test_compile_preserves_order_and_keys() {
        let metadata = EntityMetadata::compile(&descriptor()).unwrap();
        let names: Vec<&str> = metadata.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["ID", "Code", "Description"]);
        assert_eq!(metadata.keys(), &["ID".to_string()]);
        assert_eq!(metadata.key_field().unwrap().name(), "ID");
        assert!(metadata.field("Code").unwrap().is_required());
        assert_eq!(metadata.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_compile_rejects_duplicates() {
        let dup = descriptor().field(FieldSpec::new("Code", EdmType::Int32));
        let err = EntityMetadata::compile(&dup).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_compile_rejects_collection_key() {
        let bad = EntityDescriptor::new("Bad", "/api/v1/{division}/bad")
            .field(FieldSpec::new("Lines", EdmType::Collection("Line".into())).key());
        assert!(EntityMetadata::compile(&bad).is_err());
    }

    #[test]
    fn test_endpoint_division_substitution() {
        let metadata = EntityMetadata::compile(&descriptor()).unwrap();
        assert!(metadata.requires_division());
        assert_eq!(
            metadata.endpoint_for(Some(4133185)).unwrap(),
            "/api/v1/4133185/financial/GLAccounts"
        );
        assert!(metadata.endpoint_for(None).is_err());
    }

    #[test]
    fn test_method_support() {
        let metadata = EntityMetadata::compile(
            &EntityDescriptor::new("Me", "/api/v1/current/Me").methods(OperationSet::READ),
        )
        .unwrap();
        assert!(!metadata.requires_division());
        assert!(metadata.ensure_supports(Operation::Read).is_ok());
        assert!(matches!(
            metadata.ensure_supports(Operation::Create),
            Err(Error::MethodNotSupported { operation: Operation::Create, .. })
        ));
    }

    #[test]
    fn test_operation_set() {
        let set = OperationSet::READ.with(Operation::Update);
        assert!(set.contains(Operation::Read));
        assert!(set.contains(Operation::Update));
        assert!(!set.contains(Operation::Create));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Operation::Read, Operation::Update]);
        assert!(OperationSet::NONE.is_empty());
        assert_eq!(OperationSet::ALL.iter().count(), 4);
    }
}
