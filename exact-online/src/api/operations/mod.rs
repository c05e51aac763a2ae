//! Entity operations
//!
//! The four operations a field can be visible for and an entity can support.

pub mod operation;

pub use operation::Operation;
