//! Client core for the Exact Online REST API
//!
//! Provides typed EDM codecs, compiled entity metadata with hydration and
//! deflation, an OData filter builder, and a session that owns the OAuth
//! token lifecycle, division selection and rate-limit state. HTTP is
//! delegated to an injected [`Transport`] and every sensitive state change
//! is published through session events instead of being persisted here.

pub mod api;
pub mod config;
pub mod schemas;

pub use api::{
    ApiRequest, ApiResponse, Cache, CredentialProvider, CredentialsChanged, CredentialsObserver,
    Credentials, Criteria, DivisionChanged, DivisionObserver, EdmType, Entity, EntityDescriptor,
    EntityMetadata, Error, EventDispatcher, FieldDescriptor, FieldSpec, Hydrator, MemoryCache,
    MetadataRegistry, Method, Operation, OperationSet, OrderBy, Page, Propagation, QueryBuilder,
    RateLimitObserver, RateLimitReached, RateLimits, RateLimitsUpdated, RawData, RequestBody,
    Result, Session, SessionBuilder, SessionStatus, TokenSet, Transport, TransportError,
    TypedLiteral, ValidationError, Value, WaitForReset,
};
pub use config::{Region, SessionConfig};
