//! OData query construction
//!
//! Filters are built against one entity's metadata so every literal goes
//! through the referenced field's codec. [`QueryBuilder`] combines a filter
//! with selection, ordering and paging into a reusable [`Query`].

pub mod builder;
pub mod filters;
pub mod orderby;
pub mod result;

pub use builder::{Query, QueryBuilder};
pub use filters::{ComparisonOp, Criteria, Expression, FieldExpr};
pub use orderby::OrderBy;
pub use result::Page;
