//! Failure vocabulary shared by codecs, metadata, queries and the session

use thiserror::Error;

use super::operations::Operation;
use super::resilience::RateLimits;
use super::transport::{ApiRequest, ApiResponse, TransportError};

/// A value rejected by a codec before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value{}: {reason}", describe_field(.field))]
pub struct ValidationError {
    /// Field the value was meant for; empty while still inside a codec
    pub field: String,
    pub reason: String,
}

fn describe_field(field: &str) -> String {
    if field.is_empty() {
        String::new()
    } else {
        format!(" for `{}`", field)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Error raised before the owning field is known
    pub fn reason(reason: impl Into<String>) -> Self {
        Self::new(String::new(), reason)
    }

    /// Attach the field name unless one is already set
    pub fn for_field(mut self, field: &str) -> Self {
        if self.field.is_empty() {
            self.field = field.to_string();
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The transport could not complete the exchange
    #[error("communication with {url} failed")]
    Communication {
        url: String,
        #[source]
        source: TransportError,
    },

    /// A completed request returned a non-success status
    #[error("{} {} returned {status} {reason}", .request.method, .request.url)]
    ResponseNotOk {
        status: u16,
        reason: String,
        request: Box<ApiRequest>,
        response: Box<ApiResponse>,
    },

    /// A successful response whose body could not be used
    #[error("unusable response from {}: {message}", .request.url)]
    Response {
        message: String,
        request: Box<ApiRequest>,
        response: Box<ApiResponse>,
    },

    #[error("rate limit reached (daily limited: {}, minutely limited: {})", .limits.is_daily_limited(), .limits.is_minutely_limited())]
    RateLimitReached { limits: RateLimits },

    #[error("entity `{entity}` does not support {operation}")]
    MethodNotSupported { entity: String, operation: Operation },

    #[error("no listener attached for mandatory `{event}` event")]
    MissingListener { event: &'static str },

    #[error("credentials needed, authorize at {authorization_url}")]
    CredentialsNeeded { authorization_url: String },

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("entity `{entity}` has no field `{field}`")]
    UnknownField { entity: String, field: String },

    #[error("invalid descriptor for `{entity}`: {reason}")]
    Schema { entity: String, reason: String },

    /// Raw data handed to hydration could not be interpreted
    #[error("cannot decode payload: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status of a failed response, if the failure came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ResponseNotOk { status, .. } => Some(*status),
            Self::Response { response, .. } => Some(response.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::reason("out of range");
        assert_eq!(err.to_string(), "invalid value: out of range");

        let err = err.for_field("Amount");
        assert_eq!(err.to_string(), "invalid value for `Amount`: out of range");

        // An existing field name is never overwritten
        let err = err.for_field("Other");
        assert_eq!(err.field, "Amount");
    }

    #[test]
    fn test_method_not_supported_display() {
        let err = Error::MethodNotSupported {
            entity: "Me".into(),
            operation: Operation::Delete,
        };
        assert_eq!(err.to_string(), "entity `Me` does not support delete");
        assert_eq!(err.status(), None);
    }
}
