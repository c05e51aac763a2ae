//! Core operation type for Exact Online entity requests

use serde::{Deserialize, Serialize};

use crate::api::transport::Method;

/// An operation against an entity endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Fetch one record by key or a filtered collection
    Read,
    /// Create a new record
    Create,
    /// Update an existing record
    Update,
    /// Delete a record
    Delete,
}

impl Operation {
    /// All operations in declaration order
    pub const ALL: [Operation; 4] = [Self::Read, Self::Create, Self::Update, Self::Delete];

    /// Get the HTTP method for this operation
    pub fn http_method(&self) -> Method {
        match self {
            Self::Read => Method::Get,
            Self::Create => Method::Post,
            Self::Update => Method::Put, // The service replaces supplied fields via PUT
            Self::Delete => Method::Delete,
        }
    }

    /// Get the operation type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Bit used by [`OperationSet`](crate::api::metadata::OperationSet)
    pub const fn bit(&self) -> u8 {
        match self {
            Self::Read => 0b0001,
            Self::Create => 0b0010,
            Self::Update => 0b0100,
            Self::Delete => 0b1000,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation_type())
    }
}
