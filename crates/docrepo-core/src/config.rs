//! Repository and connection configuration.

use crate::{
    DEFAULT_FEED_PAGE_SIZE, VERSION,
    error::{ErrorOrigin, InternalError},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

const USER_AGENT_PREFIX: &str = "docrepo";
const DEFAULT_MAX_PAGE_SIZE: u32 = 1_000;

///
/// ConfigError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("failed to parse repository config: {0}")]
    Parse(String),

    #[error("page size bounds invalid: default {default}, max {max}")]
    InvalidPageSize { default: u32, max: u32 },

    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error("account key must not be empty")]
    EmptyKey,

    #[error("database name must not be empty")]
    EmptyDatabase,

    #[error("invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(ErrorOrigin::Config, err.to_string())
    }
}

///
/// RepositoryConfig
///
/// Loaded from TOML. Unknown keys are rejected.
///
/// ```toml
/// default_page_size = 100
/// max_page_size = 1000
///
/// [properties]
/// "dynamic.collection.name" = "spel-property-collection"
///
/// [beans]
/// "collectionNames.student" = "spel-bean-collection"
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Store page size used when a feed read carries no explicit size.
    pub default_page_size: u32,
    /// Upper bound accepted for a caller-supplied page size.
    pub max_page_size: u32,
    pub properties: BTreeMap<String, String>,
    pub beans: BTreeMap<String, String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_FEED_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            properties: BTreeMap::new(),
            beans: BTreeMap::new(),
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0
            || self.max_page_size == 0
            || self.default_page_size > self.max_page_size
        {
            return Err(ConfigError::InvalidPageSize {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }

        Ok(())
    }
}

///
/// ConnectionConfig
///
/// Account endpoint, key and database for a document-store client.
/// The key never appears in `Debug` output.
///

#[derive(Clone, Eq, PartialEq)]
pub struct ConnectionConfig {
    endpoint: String,
    key: String,
    database: String,
    user_agent_suffix: Option<String>,
}

impl ConnectionConfig {
    #[must_use]
    pub fn builder(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        database: impl Into<String>,
    ) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            endpoint: endpoint.into(),
            key: key.into(),
            database: database.into(),
            user_agent_suffix: None,
        }
    }

    /// Start a builder from `AccountEndpoint=..;AccountKey=..;` form.
    pub fn from_connection_string(
        connection_string: &str,
        database: impl Into<String>,
    ) -> Result<ConnectionConfigBuilder, ConfigError> {
        let mut endpoint = None;
        let mut key = None;

        for pair in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((name, value)) = pair.split_once('=') else {
                return Err(ConfigError::InvalidConnectionString {
                    reason: format!("segment '{pair}' is not a key=value pair"),
                });
            };

            match name.trim() {
                "AccountEndpoint" => endpoint = Some(value.trim().to_string()),
                "AccountKey" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| ConfigError::InvalidConnectionString {
            reason: "missing AccountEndpoint".to_string(),
        })?;
        let key = key.ok_or_else(|| ConfigError::InvalidConnectionString {
            reason: "missing AccountKey".to_string(),
        })?;

        Ok(Self::builder(endpoint, key, database))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// User agent sent with every request: the crate identity, then the
    /// caller's suffix when one was configured.
    #[must_use]
    pub fn user_agent(&self) -> String {
        let base = format!("{USER_AGENT_PREFIX}/{VERSION}");
        match &self.user_agent_suffix {
            Some(suffix) => format!("{base} {suffix}"),
            None => base,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("database", &self.database)
            .field("user_agent_suffix", &self.user_agent_suffix)
            .finish()
    }
}

///
/// ConnectionConfigBuilder
///

#[derive(Clone)]
pub struct ConnectionConfigBuilder {
    endpoint: String,
    key: String,
    database: String,
    user_agent_suffix: Option<String>,
}

impl ConnectionConfigBuilder {
    #[must_use]
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.user_agent_suffix = (!suffix.trim().is_empty()).then_some(suffix);
        self
    }

    pub fn build(self) -> Result<ConnectionConfig, ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }

        Ok(ConnectionConfig {
            endpoint: self.endpoint,
            key: self.key,
            database: self.database,
            user_agent_suffix: self.user_agent_suffix,
        })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://localhost:8081/";

    #[test]
    fn empty_key_is_rejected() {
        let err = ConnectionConfig::builder(ENDPOINT, "", "db")
            .build()
            .expect_err("empty key should fail");
        assert_eq!(err, ConfigError::EmptyKey);
        assert!(InternalError::from(err).is_configuration());
    }

    #[test]
    fn malformed_connection_string_is_rejected() {
        for bad in ["invalid connection string", "AccountEndpoint=https://x/;", ""] {
            assert!(
                matches!(
                    ConnectionConfig::from_connection_string(bad, "db"),
                    Err(ConfigError::InvalidConnectionString { .. })
                ),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn connection_string_key_may_contain_equals() {
        let config = ConnectionConfig::from_connection_string(
            "AccountEndpoint=https://acct.example:443/;AccountKey=c2VjcmV0==;",
            "db",
        )
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(config.endpoint(), "https://acct.example:443/");
        assert_eq!(config.key(), "c2VjcmV0==");
    }

    #[test]
    fn user_agent_carries_suffix() {
        let config = ConnectionConfig::builder(ENDPOINT, "key", "db")
            .user_agent_suffix("my-app/1.2")
            .build()
            .unwrap();

        let agent = config.user_agent();
        assert!(agent.starts_with("docrepo/"));
        assert!(agent.ends_with(" my-app/1.2"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = ConnectionConfig::builder(ENDPOINT, "super-secret", "db")
            .build()
            .unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn repository_config_parses_toml_and_rejects_unknown_keys() {
        let config = RepositoryConfig::from_toml_str(
            r#"
            default_page_size = 10
            max_page_size = 50

            [properties]
            "dynamic.collection.name" = "people"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.properties["dynamic.collection.name"], "people");

        assert!(matches!(
            RepositoryConfig::from_toml_str("bogus = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn repository_config_rejects_inverted_page_bounds() {
        assert_eq!(
            RepositoryConfig::from_toml_str("default_page_size = 100\nmax_page_size = 10"),
            Err(ConfigError::InvalidPageSize {
                default: 100,
                max: 10
            })
        );
    }
}
