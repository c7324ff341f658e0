//! Connection parameters handed to session construction.
//!
//! [`ConnectionParams`] is the validated form of the factory's inputs. It is
//! only ever built through [`ConnectionParams::client_credentials`], so holding one
//! means every precondition (non-blank credentials, absolute instance URI,
//! logger present) has already been checked.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::Span;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Authentication mode used to establish a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// OAuth client-credential exchange (client id + client secret).
    #[default]
    ClientSecret,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::ClientSecret => write!(f, "client_secret"),
        }
    }
}

/// Validated parameters for opening a session against one instance.
#[derive(Clone)]
pub struct ConnectionParams {
    auth_mode: AuthMode,
    client_id: String,
    client_secret: String,
    service_uri: Url,
    defer_connection: bool,
    enable_affinity_cookie: bool,
    logger: Span,
}

impl ConnectionParams {
    /// Validate client-credential inputs and build connection parameters.
    ///
    /// Checks run in a fixed order: `client_id`, `client_secret`,
    /// `instance_uri` (blankness), `logger`, then `instance_uri` (absolute
    /// URI with a host). The first failure wins.
    pub fn client_credentials(
        client_id: &str,
        client_secret: &str,
        instance_uri: &str,
        logger: Option<Span>,
    ) -> ConfigResult<Self> {
        require_non_blank("client_id", client_id)?;
        require_non_blank("client_secret", client_secret)?;
        require_non_blank("instance_uri", instance_uri)?;
        let logger = logger.ok_or_else(|| ConfigError::invalid("logger", "a logger is required"))?;
        let service_uri = parse_instance_uri(instance_uri)?;

        Ok(Self {
            auth_mode: AuthMode::ClientSecret,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            service_uri,
            defer_connection: false,
            enable_affinity_cookie: true,
            logger,
        })
    }

    /// Connect lazily on first use instead of at construction.
    pub fn with_deferred_connection(mut self, defer: bool) -> Self {
        self.defer_connection = defer;
        self
    }

    /// Toggle the transport-level affinity cookie.
    pub fn with_affinity_cookie(mut self, enabled: bool) -> Self {
        self.enable_affinity_cookie = enabled;
        self
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn service_uri(&self) -> &Url {
        &self.service_uri
    }

    pub fn defer_connection(&self) -> bool {
        self.defer_connection
    }

    pub fn enable_affinity_cookie(&self) -> bool {
        self.enable_affinity_cookie
    }

    /// Span that session and factory events are recorded under.
    pub fn logger(&self) -> &Span {
        &self.logger
    }
}

// The secret never appears in logs or panics.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("auth_mode", &self.auth_mode)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("service_uri", &self.service_uri.as_str())
            .field("defer_connection", &self.defer_connection)
            .field("enable_affinity_cookie", &self.enable_affinity_cookie)
            .finish_non_exhaustive()
    }
}

fn require_non_blank(param: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(param, "must not be empty or whitespace"));
    }
    Ok(())
}

fn parse_instance_uri(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        ConfigError::invalid("instance_uri", format!("not an absolute URI ({e}): {raw}"))
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid(
            "instance_uri",
            format!("URI has no host: {raw}"),
        ));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "https://contoso.crm.example.com";

    fn logger() -> Option<Span> {
        Some(Span::none())
    }

    /// Name of the parameter validation rejects.
    fn rejected(id: &str, secret: &str, uri: &str, logger: Option<Span>) -> &'static str {
        ConnectionParams::client_credentials(id, secret, uri, logger)
            .unwrap_err()
            .param()
    }

    #[test]
    fn valid_inputs_build_client_secret_params() {
        let params = ConnectionParams::client_credentials("app", "s3cret", URI, logger()).unwrap();
        assert_eq!(params.auth_mode(), AuthMode::ClientSecret);
        assert_eq!(params.client_id(), "app");
        assert_eq!(params.service_uri().host_str(), Some("contoso.crm.example.com"));
        assert!(!params.defer_connection());
        assert!(params.enable_affinity_cookie());
    }

    #[test]
    fn builder_toggles_apply() {
        let params = ConnectionParams::client_credentials("app", "s3cret", URI, logger())
            .unwrap()
            .with_deferred_connection(true)
            .with_affinity_cookie(false);
        assert!(params.defer_connection());
        assert!(!params.enable_affinity_cookie());
    }

    #[test]
    fn blank_client_id_rejected() {
        assert_eq!(rejected("", "s", URI, logger()), "client_id");
        assert_eq!(rejected("  \t", "s", URI, logger()), "client_id");
    }

    #[test]
    fn blank_secret_rejected() {
        assert_eq!(rejected("app", " ", URI, logger()), "client_secret");
    }

    #[test]
    fn blank_uri_rejected() {
        assert_eq!(rejected("app", "s", "", logger()), "instance_uri");
    }

    #[test]
    fn missing_logger_rejected() {
        assert_eq!(rejected("app", "s", URI, None), "logger");
    }

    #[test]
    fn relative_uri_rejected() {
        assert_eq!(rejected("app", "s", "/api/data/v9.2", logger()), "instance_uri");
        assert_eq!(rejected("app", "s", "not a uri", logger()), "instance_uri");
    }

    #[test]
    fn hostless_uri_rejected() {
        assert_eq!(rejected("app", "s", "mailto:someone", logger()), "instance_uri");
    }

    #[test]
    fn blank_checks_run_before_logger_check() {
        // Missing logger and blank id: the id is reported first.
        assert_eq!(rejected("", "s", URI, None), "client_id");
    }

    #[test]
    fn debug_redacts_secret() {
        let params = ConnectionParams::client_credentials("app", "hunter2", URI, logger()).unwrap();
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn auth_mode_display() {
        assert_eq!(AuthMode::ClientSecret.to_string(), "client_secret");
    }
}
