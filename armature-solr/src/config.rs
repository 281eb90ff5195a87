//! Solr client configuration.

use crate::error::{Result, SolrError};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// When writes become visible to searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Hard commit with every write (`commit=true`).
    Immediate,
    /// Ask Solr to commit within the given time (`commitWithin`).
    Within(Duration),
    /// No commit parameter; rely on server auto-commit or explicit `commit`.
    Deferred,
}

impl CommitPolicy {
    /// Request parameter for an update call, if any.
    pub fn to_param(&self) -> Option<(&'static str, String)> {
        match self {
            CommitPolicy::Immediate => Some(("commit", "true".to_string())),
            CommitPolicy::Within(d) => Some(("commitWithin", d.as_millis().to_string())),
            CommitPolicy::Deferred => None,
        }
    }
}

/// Solr client configuration.
#[derive(Debug, Clone)]
pub struct SolrConfig {
    /// Base URL, e.g. `http://localhost:8983/solr`.
    pub url: String,
    /// Default collection (core).
    pub collection: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Commit behaviour for writes.
    pub commit: CommitPolicy,
    /// Maximum number of retries for retryable failures.
    pub max_retries: u32,
    /// User agent string.
    pub user_agent: String,
}

impl SolrConfig {
    /// Default collection name, as shipped with the Solr examples.
    pub const DEFAULT_COLLECTION: &'static str = "collection1";

    /// Create a new configuration for a base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: Self::DEFAULT_COLLECTION.to_string(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            commit: CommitPolicy::Immediate,
            max_retries: 0,
            user_agent: format!("armature-solr/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the default collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set commit policy.
    pub fn with_commit(mut self, commit: CommitPolicy) -> Self {
        self.commit = commit;
        self
    }

    /// Set maximum retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load configuration from `SOLR_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = env::var("SOLR_URL")
            .map_err(|_| SolrError::Config("SOLR_URL is not set".to_string()))?;
        let mut config = Self::new(url);

        if let Ok(collection) = env::var("SOLR_COLLECTION") {
            config.collection = collection;
        }
        if let (Ok(user), Ok(pass)) = (env::var("SOLR_USERNAME"), env::var("SOLR_PASSWORD")) {
            config = config.with_basic_auth(user, pass);
        }
        if let Some(secs) = parse_var::<u64>("SOLR_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>("SOLR_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>("SOLR_COMMIT_WITHIN_MS")? {
            config.commit = CommitPolicy::Within(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// ```toml
    /// url = "http://localhost:8983/solr"
    /// collection = "collection1"
    /// request_timeout_secs = 30
    /// commit_within_ms = 1000
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| SolrError::Config(format!("TOML parse error: {}", e)))?;
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SolrError::Validation("No URL provided".to_string()));
        }
        url::Url::parse(&self.url)?;
        if self.collection.trim().is_empty() {
            return Err(SolrError::Validation("No collection provided".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SolrError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    url: String,
    collection: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    commit_within_ms: Option<u64>,
    #[serde(default)]
    deferred_commit: bool,
    max_retries: Option<u32>,
}

impl ConfigFile {
    fn into_config(self) -> SolrConfig {
        let mut config = SolrConfig::new(self.url);
        if let Some(collection) = self.collection {
            config.collection = collection;
        }
        config.username = self.username;
        config.password = self.password;
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if self.deferred_commit {
            config.commit = CommitPolicy::Deferred;
        }
        if let Some(ms) = self.commit_within_ms {
            config.commit = CommitPolicy::Within(Duration::from_millis(ms));
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolrConfig::new("http://localhost:8983/solr");
        assert_eq!(config.collection, "collection1");
        assert_eq!(config.commit, CommitPolicy::Immediate);
        assert_eq!(config.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(SolrConfig::new("").validate().is_err());
        assert!(SolrConfig::new("not a url").validate().is_err());
        assert!(
            SolrConfig::new("http://localhost:8983/solr")
                .with_collection(" ")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_toml() {
        let config = SolrConfig::from_toml(
            r#"
            url = "http://solr:8983/solr"
            collection = "products"
            request_timeout_secs = 5
            commit_within_ms = 250
            max_retries = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.url, "http://solr:8983/solr");
        assert_eq!(config.collection, "products");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.commit, CommitPolicy::Within(Duration::from_millis(250)));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = SolrConfig::from_toml("url = \"http://x\"\nbogus = 1").unwrap_err();
        assert!(matches!(err, SolrError::Config(_)));
    }

    #[test]
    fn test_commit_param() {
        assert_eq!(
            CommitPolicy::Immediate.to_param(),
            Some(("commit", "true".to_string()))
        );
        assert_eq!(
            CommitPolicy::Within(Duration::from_secs(1)).to_param(),
            Some(("commitWithin", "1000".to_string()))
        );
        assert_eq!(CommitPolicy::Deferred.to_param(), None);
    }
}
