//! Fluent construction of collection queries

use log::trace;

use super::filters::Expression;
use super::orderby::OrderBy;
use crate::api::errors::{Result, ValidationError};
use crate::api::metadata::EntityMetadata;
use crate::api::operations::Operation;

/// A validated query, ready to be appended to an endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<String>,
    pub select: Vec<String>,
    pub orderby: Vec<OrderBy>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl Query {
    /// Raw `(name, value)` pairs, not yet percent-encoded
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(filter) = &self.filter {
            params.push(("$filter".to_string(), filter.clone()));
        }
        if !self.select.is_empty() {
            params.push(("$select".to_string(), self.select.join(",")));
        }
        if !self.orderby.is_empty() {
            let terms: Vec<String> = self.orderby.iter().map(ToString::to_string).collect();
            params.push(("$orderby".to_string(), terms.join(",")));
        }
        if let Some(top) = self.top {
            params.push(("$top".to_string(), top.to_string()));
        }
        if let Some(skip) = self.skip {
            params.push(("$skip".to_string(), skip.to_string()));
        }
        params
    }

    /// `$filter=...&$select=...` with every value percent-encoded
    pub fn to_query_string(&self) -> String {
        self.to_query_params()
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.to_query_params().is_empty()
    }

    /// Fill `$top` when the caller left it open
    pub(crate) fn with_default_top(mut self, top: u32) -> Self {
        self.top.get_or_insert(top);
        self
    }
}

/// Builder for [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    filter: Option<Expression>,
    select: Vec<String>,
    orderby: Vec<OrderBy>,
    top: Option<u32>,
    skip: Option<u32>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, expression: Expression) -> Self {
        self.filter = Some(expression);
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn orderby(mut self, orderby: OrderBy) -> Self {
        self.orderby.push(orderby);
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Validate referenced fields against `metadata` and freeze the query
    pub fn build(self, metadata: &EntityMetadata) -> Result<Query> {
        for name in &self.select {
            let field = metadata.require_field(name)?;
            if !field.is_visible_for(Operation::Read) {
                return Err(ValidationError::new(name.as_str(), "field is not readable").into());
            }
        }
        for term in &self.orderby {
            metadata.require_field(&term.field)?;
        }
        if self.top == Some(0) {
            return Err(ValidationError::reason("$top must be positive").into());
        }

        let query = Query {
            filter: self.filter.map(|f| f.to_string()),
            select: self.select,
            orderby: self.orderby,
            top: self.top,
            skip: self.skip,
        };
        trace!("Built query for {}: {:?}", metadata.tag(), query.to_query_params());
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::codec::EdmType;
    use crate::api::errors::Error;
    use crate::api::metadata::{EntityDescriptor, FieldSpec, OperationSet};
    use crate::api::query::Criteria;

    fn metadata() -> EntityMetadata {
        EntityMetadata::compile(
            &EntityDescriptor::new("Account", "/api/v1/{division}/crm/Accounts")
                .field(FieldSpec::new("ID", EdmType::Guid).key())
                .field(FieldSpec::new("Name", EdmType::String))
                .field(FieldSpec::new("City", EdmType::String))
                .field(
                    FieldSpec::new("Secret", EdmType::String).operations(OperationSet::of(&[
                        Operation::Create,
                    ])),
                ),
        )
        .unwrap()
    }

    #[test]
    fn test_query_string_encoding() {
        let metadata = metadata();
        let c = Criteria::new(&metadata);

        let query = QueryBuilder::new()
            .filter(c.eq("City", "Den Haag").unwrap())
            .select(&["ID", "Name"])
            .orderby(OrderBy::desc("Name"))
            .top(10)
            .skip(20)
            .build(&metadata)
            .unwrap();

        assert_eq!(
            query.to_query_string(),
            "$filter=City%20eq%20%27Den%20Haag%27&$select=ID%2CName&$orderby=Name%20desc&$top=10&$skip=20"
        );
        assert_eq!(query.to_query_params()[0].1, "City eq 'Den Haag'");
    }

    #[test]
    fn test_select_validation() {
        let metadata = metadata();

        assert!(matches!(
            QueryBuilder::new().select(&["Nope"]).build(&metadata),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            QueryBuilder::new().select(&["Secret"]).build(&metadata),
            Err(Error::Validation(ref e)) if e.field == "Secret"
        ));
        assert!(QueryBuilder::new().orderby(OrderBy::asc("Nope")).build(&metadata).is_err());
        assert!(QueryBuilder::new().top(0).build(&metadata).is_err());
    }

    #[test]
    fn test_default_top() {
        let metadata = metadata();
        let query = QueryBuilder::new().build(&metadata).unwrap();
        assert!(query.is_empty());
        assert_eq!(query.clone().with_default_top(60).top, Some(60));
        let query = QueryBuilder::new().top(5).build(&metadata).unwrap();
        assert_eq!(query.with_default_top(60).top, Some(5));
    }
}
