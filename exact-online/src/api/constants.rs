//! Wire-level constants of the Exact Online REST API

/// Placeholder substituted with the active division in endpoint templates
pub const DIVISION_PLACEHOLDER: &str = "{division}";

/// OAuth2 authorization endpoint, relative to the regional base URL
pub const AUTHORIZE_PATH: &str = "/api/oauth2/auth";

/// OAuth2 token endpoint, relative to the regional base URL
pub const TOKEN_PATH: &str = "/api/oauth2/token";

/// Page size the service uses when a request does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 60;

/// Tag of the built-in identity entity used for division resolution
pub const ME_ENTITY: &str = "Me";

/// Field of `Me` carrying the user's current division
pub const CURRENT_DIVISION_FIELD: &str = "CurrentDivision";

// Rate limit headers (lower-cased, as transports normalize them)
pub const HEADER_DAILY_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_DAILY_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_DAILY_RESET: &str = "x-ratelimit-reset";
pub const HEADER_MINUTELY_LIMIT: &str = "x-ratelimit-minutely-limit";
pub const HEADER_MINUTELY_REMAINING: &str = "x-ratelimit-minutely-remaining";
pub const HEADER_MINUTELY_RESET: &str = "x-ratelimit-minutely-reset";

/// Prefix for compiled metadata entries in an external cache
pub const METADATA_CACHE_PREFIX: &str = "exact-online.metadata";
