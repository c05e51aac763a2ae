//! Hydration and deflation
//!
//! Converts between raw structured data and typed [`Entity`] values using
//! compiled metadata and the codec layer, honouring per-operation field
//! visibility.

mod engine;
mod entity;
mod value;

pub use engine::{EntitySnapshot, Hydrator, RawData};
pub use entity::Entity;
pub use value::Value;
