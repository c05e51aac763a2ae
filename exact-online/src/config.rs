//! Session configuration with builder pattern
//!
//! Values come from code, the environment (`EXACT_*`, `.env` honoured) or a
//! TOML file under the user's config directory.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Regional deployments of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Nl,
    Be,
    De,
    Uk,
    Us,
    Es,
    Fr,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Self::Nl,
        Self::Be,
        Self::De,
        Self::Uk,
        Self::Us,
        Self::Es,
        Self::Fr,
    ];

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Nl => "https://start.exactonline.nl",
            Self::Be => "https://start.exactonline.be",
            Self::De => "https://start.exactonline.de",
            Self::Uk => "https://start.exactonline.co.uk",
            Self::Us => "https://start.exactonline.com",
            Self::Es => "https://start.exactonline.es",
            Self::Fr => "https://start.exactonline.fr",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Nl => "nl",
            Self::Be => "be",
            Self::De => "de",
            Self::Uk => "uk",
            Self::Us => "us",
            Self::Es => "es",
            Self::Fr => "fr",
        }
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .with_context(|| format!("unknown region '{}'", s))
    }
}

/// Upper bound for `token_expiry_margin_secs`; access tokens never live this long
pub const MAX_TOKEN_EXPIRY_MARGIN_SECS: u64 = 24 * 60 * 60;

/// Runtime settings for a [`Session`](crate::api::Session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Scheme and host of the regional deployment, without trailing slash
    pub base_url: String,
    /// Tokens are refreshed this many seconds before they expire
    pub token_expiry_margin_secs: u64,
    pub user_agent: Option<String>,
    /// Overrides every entity's default page size when set
    pub page_size: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: Region::default().base_url().to_string(),
            token_expiry_margin_secs: 30,
            user_agent: Some(format!("exact-online/{}", env!("CARGO_PKG_VERSION"))),
            page_size: None,
        }
    }
}

/// On-disk shape; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    region: Option<Region>,
    base_url: Option<String>,
    token_expiry_margin_secs: Option<u64>,
    user_agent: Option<String>,
    page_size: Option<u32>,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    pub fn for_region(region: Region) -> Self {
        Self {
            base_url: region.base_url().to_string(),
            ..Self::default()
        }
    }

    pub fn token_expiry_margin(&self) -> chrono::Duration {
        let secs = self.token_expiry_margin_secs.min(MAX_TOKEN_EXPIRY_MARGIN_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Load overrides from `EXACT_BASE_URL`, `EXACT_REGION` and
    /// `EXACT_TOKEN_EXPIRY_MARGIN_SECS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Self::builder();
        if let Ok(region) = std::env::var("EXACT_REGION") {
            builder = builder.region(region.parse()?);
        }
        if let Ok(base_url) = std::env::var("EXACT_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        if let Ok(margin) = std::env::var("EXACT_TOKEN_EXPIRY_MARGIN_SECS") {
            let margin = margin
                .trim()
                .parse()
                .with_context(|| format!("EXACT_TOKEN_EXPIRY_MARGIN_SECS is not a number: {}", margin))?;
            builder = builder.token_expiry_margin_secs(margin);
        }
        builder.try_build()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse session config")?;

        let mut builder = Self::builder();
        if let Some(region) = file.region {
            builder = builder.region(region);
        }
        if let Some(base_url) = file.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(margin) = file.token_expiry_margin_secs {
            builder = builder.token_expiry_margin_secs(margin);
        }
        if let Some(user_agent) = file.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(page_size) = file.page_size {
            builder = builder.page_size(page_size);
        }
        builder.try_build()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// `<config dir>/exact-online/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("exact-online").join("config.toml"))
    }

    /// The default file if it exists, otherwise built-in defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }
}

/// Builder for SessionConfig
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.config.base_url = region.base_url().to_string();
        self
    }

    /// Point at a custom host, e.g. a test server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_expiry_margin_secs(mut self, secs: u64) -> Self {
        self.config.token_expiry_margin_secs = secs;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = Some(page_size);
        self
    }

    /// Build, rejecting an unusable base URL, margin or page size
    pub fn try_build(self) -> Result<SessionConfig> {
        let config = self.config;
        if !(config.base_url.starts_with("https://") || config.base_url.starts_with("http://")) {
            bail!("base URL must be absolute: '{}'", config.base_url);
        }
        if config.token_expiry_margin_secs > MAX_TOKEN_EXPIRY_MARGIN_SECS {
            bail!(
                "token expiry margin of {}s exceeds {}s",
                config.token_expiry_margin_secs,
                MAX_TOKEN_EXPIRY_MARGIN_SECS
            );
        }
        if config.page_size == Some(0) {
            bail!("page size must be positive");
        }
        Ok(config)
    }

    /// Build the final configuration
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
