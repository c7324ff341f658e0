//! Factory options document.
//!
//! ```toml
//! client_id = "00000000-0000-0000-0000-000000000000"
//! client_secret = "..."
//! instance_uri = "https://contoso.crm.example.com"
//! defer_connection = false
//! enable_affinity_cookie = true
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::error::ConfigResult;
use crate::params::ConnectionParams;

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryOptions {
    /// Application (client) id registered with the identity provider.
    #[serde(default)]
    pub client_id: String,
    /// Client secret paired with `client_id`.
    #[serde(default)]
    pub client_secret: String,
    /// Absolute URI of the instance, e.g. `https://contoso.crm.example.com`.
    #[serde(default)]
    pub instance_uri: String,
    /// Connect on first use instead of at construction (default: false).
    #[serde(default)]
    pub defer_connection: bool,
    /// Pin requests to one backend node via the affinity cookie (default: true).
    #[serde(default = "default_affinity_cookie")]
    pub enable_affinity_cookie: bool,
    /// Span the factory logs under. Not part of the file format; set in code.
    #[serde(skip)]
    pub logger: Option<Span>,
}

fn default_affinity_cookie() -> bool {
    true
}

impl FactoryOptions {
    pub fn new(client_id: &str, client_secret: &str, instance_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            instance_uri: instance_uri.to_string(),
            defer_connection: false,
            enable_affinity_cookie: true,
            logger: None,
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let options: FactoryOptions = toml::from_str(content)?;
        Ok(options)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Check the construction preconditions and produce connection parameters.
    pub fn validate(&self) -> ConfigResult<ConnectionParams> {
        Ok(ConnectionParams::client_credentials(
            &self.client_id,
            &self.client_secret,
            &self.instance_uri,
            self.logger.clone(),
        )?
        .with_deferred_connection(self.defer_connection)
        .with_affinity_cookie(self.enable_affinity_cookie))
    }
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

impl fmt::Debug for FactoryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryOptions")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("instance_uri", &self.instance_uri)
            .field("defer_connection", &self.defer_connection)
            .field("enable_affinity_cookie", &self.enable_affinity_cookie)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
