//! Filter expressions checked against entity metadata

use std::fmt;

use crate::api::codec::{EdmType, TypedLiteral};
use crate::api::errors::{Result, ValidationError};
use crate::api::hydration::Value;
use crate::api::metadata::EntityMetadata;

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        }
    }
}

/// Left-hand side of a comparison: a field, optionally wrapped in string functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldExpr {
    Field(String),
    ToLower(Box<FieldExpr>),
    ToUpper(Box<FieldExpr>),
    Substring {
        inner: Box<FieldExpr>,
        start: u32,
        length: u32,
    },
}

impl FieldExpr {
    pub fn lower(self) -> Self {
        Self::ToLower(Box::new(self))
    }

    pub fn upper(self) -> Self {
        Self::ToUpper(Box::new(self))
    }

    pub fn substring(self, start: u32, length: u32) -> Self {
        Self::Substring {
            inner: Box::new(self),
            start,
            length,
        }
    }

    /// Name of the underlying field
    pub fn root(&self) -> &str {
        match self {
            Self::Field(name) => name,
            Self::ToLower(inner) | Self::ToUpper(inner) => inner.root(),
            Self::Substring { inner, .. } => inner.root(),
        }
    }

    fn is_plain(&self) -> bool {
        matches!(self, Self::Field(_))
    }
}

impl From<&str> for FieldExpr {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for FieldExpr {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl fmt::Display for FieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::ToLower(inner) => write!(f, "tolower({})", inner),
            Self::ToUpper(inner) => write!(f, "toupper({})", inner),
            Self::Substring {
                inner,
                start,
                length,
            } => write!(f, "substring({}, {}, {})", inner, start, length),
        }
    }
}

/// A rendered-on-demand filter expression
///
/// Literals are already encoded when an expression exists, so rendering
/// cannot fail. Groups always carry their own parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Comparison {
        field: FieldExpr,
        op: ComparisonOp,
        literal: TypedLiteral,
    },
    /// `substringof('v', F)`
    SubstringOf { field: FieldExpr, literal: TypedLiteral },
    /// `startswith(F, 'v')`
    StartsWith { field: FieldExpr, literal: TypedLiteral },
    /// `endswith(F, 'v')`
    EndsWith { field: FieldExpr, literal: TypedLiteral },
    And(Vec<Expression>),
    Or(Vec<Expression>),
}

impl Expression {
    fn write_group(f: &mut fmt::Formatter<'_>, joiner: &str, items: &[Expression]) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", joiner)?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison { field, op, literal } => {
                write!(f, "{} {} {}", field, op.as_str(), literal)
            }
            Self::SubstringOf { field, literal } => write!(f, "substringof({}, {})", literal, field),
            Self::StartsWith { field, literal } => write!(f, "startswith({}, {})", field, literal),
            Self::EndsWith { field, literal } => write!(f, "endswith({}, {})", field, literal),
            Self::And(items) => Self::write_group(f, "and", items),
            Self::Or(items) => Self::write_group(f, "or", items),
        }
    }
}

/// Builds expressions for one entity
#[derive(Debug, Clone, Copy)]
pub struct Criteria<'m> {
    metadata: &'m EntityMetadata,
}

impl<'m> Criteria<'m> {
    pub fn new(metadata: &'m EntityMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &'m EntityMetadata {
        self.metadata
    }

    pub fn eq(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Eq, value)
    }

    pub fn neq(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Ne, value)
    }

    pub fn lt(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Lt, value)
    }

    pub fn lte(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Le, value)
    }

    pub fn gt(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Gt, value)
    }

    pub fn gte(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        self.compare(field, ComparisonOp::Ge, value)
    }

    pub fn compare(
        &self,
        field: impl Into<FieldExpr>,
        op: ComparisonOp,
        value: impl Into<Value>,
    ) -> Result<Expression> {
        let field = field.into();
        let literal = self.literal(&field, value.into())?;
        Ok(Expression::Comparison { field, op, literal })
    }

    pub fn contains(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        let field = field.into();
        let literal = self.string_literal(&field, value.into())?;
        Ok(Expression::SubstringOf { field, literal })
    }

    pub fn starts_with(
        &self,
        field: impl Into<FieldExpr>,
        value: impl Into<Value>,
    ) -> Result<Expression> {
        let field = field.into();
        let literal = self.string_literal(&field, value.into())?;
        Ok(Expression::StartsWith { field, literal })
    }

    pub fn ends_with(&self, field: impl Into<FieldExpr>, value: impl Into<Value>) -> Result<Expression> {
        let field = field.into();
        let literal = self.string_literal(&field, value.into())?;
        Ok(Expression::EndsWith { field, literal })
    }

    pub fn lower(&self, field: impl Into<FieldExpr>) -> FieldExpr {
        field.into().lower()
    }

    pub fn upper(&self, field: impl Into<FieldExpr>) -> FieldExpr {
        field.into().upper()
    }

    pub fn substring(&self, field: impl Into<FieldExpr>, start: u32, length: u32) -> FieldExpr {
        field.into().substring(start, length)
    }

    /// `(F eq a or F eq b ...)`; the protocol has no native `in`
    pub fn in_<V: Into<Value>>(
        &self,
        field: impl Into<FieldExpr>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Expression> {
        let items = self.expand(field.into(), ComparisonOp::Eq, values)?;
        self.or_x(items)
    }

    /// `(F ne a and F ne b ...)`
    pub fn not_in<V: Into<Value>>(
        &self,
        field: impl Into<FieldExpr>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Expression> {
        let items = self.expand(field.into(), ComparisonOp::Ne, values)?;
        self.and_x(items)
    }

    pub fn and_x(&self, items: impl IntoIterator<Item = Expression>) -> Result<Expression> {
        let items: Vec<_> = items.into_iter().collect();
        if items.is_empty() {
            return Err(ValidationError::reason("`and` group needs at least one expression").into());
        }
        Ok(Expression::And(items))
    }

    pub fn or_x(&self, items: impl IntoIterator<Item = Expression>) -> Result<Expression> {
        let items: Vec<_> = items.into_iter().collect();
        if items.is_empty() {
            return Err(ValidationError::reason("`or` group needs at least one expression").into());
        }
        Ok(Expression::Or(items))
    }

    fn expand<V: Into<Value>>(
        &self,
        field: FieldExpr,
        op: ComparisonOp,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Vec<Expression>> {
        let items = values
            .into_iter()
            .map(|v| self.compare(field.clone(), op, v))
            .collect::<Result<Vec<_>>>()?;
        if items.is_empty() {
            return Err(ValidationError::new(field.root(), "value set is empty").into());
        }
        Ok(items)
    }

    /// Type a literal compared against `field` must be encoded as
    fn resolve(&self, field: &FieldExpr) -> Result<EdmType> {
        let descriptor = self.metadata.require_field(field.root())?;
        let edm_type = descriptor.edm_type();
        if !edm_type.is_filterable() {
            return Err(ValidationError::new(field.root(), "field cannot be filtered on").into());
        }
        if field.is_plain() {
            return Ok(edm_type.clone());
        }
        match edm_type {
            EdmType::String | EdmType::FixedString(_) => Ok(EdmType::String),
            other => Err(ValidationError::new(
                field.root(),
                format!("string functions need a string field, not {}", other.name()),
            )
            .into()),
        }
    }

    fn literal(&self, field: &FieldExpr, value: Value) -> Result<TypedLiteral> {
        let edm_type = self.resolve(field)?;
        Ok(edm_type
            .encode_for_filter(&value)
            .map_err(|e| e.for_field(field.root()))?)
    }

    fn string_literal(&self, field: &FieldExpr, value: Value) -> Result<TypedLiteral> {
        match self.resolve(field)? {
            EdmType::String | EdmType::FixedString(_) => {}
            other => {
                return Err(ValidationError::new(
                    field.root(),
                    format!("string functions need a string field, not {}", other.name()),
                )
                .into());
            }
        }
        // Function arguments match against the stored text, never padded
        Ok(EdmType::String
            .encode_for_filter(&value)
            .map_err(|e| e.for_field(field.root()))?)
    }
}
