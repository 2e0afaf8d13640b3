use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::constants::database::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS,
};
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::constants::server::{DEFAULT_HOST, DEFAULT_PORT};
use crate::error::Error;
use crate::pagination::{CursorCodec, CursorPolicy, Paginator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub log_format: LogFormat,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub connection_timeout_secs: Option<u64>,
    #[cfg(feature = "mocks")]
    #[serde(default)]
    pub mock_mode: bool,
}

/// Pagination settings shared by every list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// What to do with cursors that fail to decode
    pub cursor_policy: CursorPolicy,
    /// Secret cursors are signed with; a built-in one is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_secret: Option<String>,
    /// Page size used when the request omits `pageSize`
    pub default_page_size: usize,
    pub min_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            cursor_policy: CursorPolicy::default(),
            cursor_secret: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            min_page_size: MIN_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PaginationConfig {
    /// Paginator applying the configured cursor policy and secret
    pub fn paginator(&self) -> Paginator {
        let paginator = Paginator::new(self.cursor_policy);

        match &self.cursor_secret {
            Some(secret) => paginator.with_codec(CursorCodec::new(secret.as_bytes())),
            None => paginator,
        }
    }

    /// Checks that the configured bounds stay inside the supported page-size range
    pub fn validate(&self) -> Result<(), Error> {
        if self.cursor_secret.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Config("cursor_secret must not be empty".to_string()));
        }

        if self.min_page_size < MIN_PAGE_SIZE || self.max_page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page size bounds must stay within [{MIN_PAGE_SIZE}, {MAX_PAGE_SIZE}]"
            )));
        }

        if self.min_page_size > self.max_page_size {
            return Err(Error::Config(
                "min_page_size is larger than max_page_size".to_string(),
            ));
        }

        if !(self.min_page_size..=self.max_page_size).contains(&self.default_page_size) {
            return Err(Error::Config(format!(
                "default_page_size {} is outside [{}, {}]",
                self.default_page_size, self.min_page_size, self.max_page_size
            )));
        }

        Ok(())
    }
}

/// Output format of the logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Bunyan JSON lines
    Json,
    /// Human readable text
    Text,
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
}

impl LogFormat {
    /// Resolves [`LogFormat::Auto`] by looking at stdout
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if std::io::stdout().is_terminal() => Self::Text,
            Self::Auto => Self::Json,
            other => other,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // these are just some sane defaults, most likely we will
        // have them overridden
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
                connection_timeout_secs: Some(DEFAULT_CONNECTION_TIMEOUT_SECS),
                #[cfg(feature = "mocks")]
                mock_mode: true,
            },
            pagination: PaginationConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> std::io::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
