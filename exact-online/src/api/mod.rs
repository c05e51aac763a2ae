//! Exact Online API core
//!
//! Layered from the wire up: codecs translate single values, metadata
//! describes entities, hydration converts whole records, the query module
//! renders filters, and the session drives authenticated requests through
//! an injected transport.

pub mod cache;
pub mod codec;
pub mod constants;
pub mod errors;
pub mod hydration;
pub mod metadata;
pub mod models;
pub mod operations;
pub mod query;
pub mod resilience;
pub mod session;
pub mod transport;

pub use cache::{Cache, MemoryCache};
pub use codec::{EdmType, LiteralTag, TypedLiteral};
pub use errors::{Error, Result, ValidationError};
pub use hydration::{Entity, EntitySnapshot, Hydrator, RawData, Value};
pub use metadata::{
    EntityDescriptor, EntityMetadata, FieldDescriptor, FieldSpec, MetadataRegistry, OperationSet,
};
pub use models::{CredentialProvider, Credentials, TokenSet};
pub use operations::Operation;
pub use query::{
    ComparisonOp, Criteria, Expression, FieldExpr, OrderBy, Page, Query, QueryBuilder,
};
pub use resilience::{RateLimits, RateWindow, WaitForReset};
pub use session::{
    CredentialsChanged, CredentialsObserver, DivisionChanged, DivisionObserver, EventDispatcher,
    Propagation, RateLimitObserver, RateLimitReached, RateLimitsUpdated, Session, SessionBuilder,
    SessionStatus, TokenCause,
};
pub use transport::{ApiRequest, ApiResponse, Method, RequestBody, Transport, TransportError};
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
