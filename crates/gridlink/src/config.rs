//! Client configuration.
//!
//! Plain structs with sensible defaults. Every field is public so callers
//! can use struct update syntax:
//!
//! ```rust
//! use std::time::Duration;
//! use gridlink::{ClientConfig, GovernorConfig};
//!
//! let config = ClientConfig {
//!     host: Some("grid.example.com".into()),
//!     governor: GovernorConfig { fallback: Duration::from_secs(3) },
//!     ..ClientConfig::default()
//! };
//! assert_eq!(config.resolve_url().unwrap().as_str(), "wss://grid.example.com/websocket");
//! ```

use std::time::Duration;

use gridlink_sync::SessionConfig;
use gridlink_transport::ReconnectConfig;
use url::Url;

use crate::GridlinkError;

/// Path of the realtime endpoint on the game host.
pub const DEFAULT_WS_PATH: &str = "/websocket";

/// How long a gesture may keep the UI lock before it is force-released.
pub const DEFAULT_MOVE_FALLBACK: Duration = Duration::from_millis(2000);

/// Settings for [`MoveGovernor`](crate::MoveGovernor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    /// After this long, the UI lock is released even if the move has not
    /// finished. The move itself keeps running.
    pub fallback: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_MOVE_FALLBACK,
        }
    }
}

impl GovernorConfig {
    /// Clamps a zero fallback up to 1 ms so the timer always yields first.
    pub fn validated(mut self) -> Self {
        self.fallback = self.fallback.max(Duration::from_millis(1));
        self
    }
}

/// Everything needed to open a [`GridClient`](crate::GridClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Game host, e.g. `"grid.example.com"` or `"localhost:8080"`.
    pub host: Option<String>,
    /// Endpoint path joined onto the host. Default: `/websocket`.
    pub path: String,
    /// Full endpoint URL. Takes precedence over `host` and `path`.
    pub url: Option<String>,
    /// Accept `ws://` endpoints. Only meant for local development.
    pub allow_insecure: bool,
    pub reconnect: ReconnectConfig,
    pub session: SessionConfig,
    pub governor: GovernorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            path: DEFAULT_WS_PATH.to_owned(),
            url: None,
            allow_insecure: false,
            reconnect: ReconnectConfig::default(),
            session: SessionConfig::default(),
            governor: GovernorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Returns a copy with every sub-config clamped to valid ranges.
    pub fn validated(self) -> Self {
        Self {
            reconnect: self.reconnect.validated(),
            session: self.session.validated(),
            governor: self.governor.validated(),
            ..self
        }
    }

    /// Works out the WebSocket endpoint.
    ///
    /// `url` wins if set. Otherwise `path` is resolved against
    /// `wss://<host>`, the way a browser resolves a relative link.
    ///
    /// # Errors
    /// - [`GridlinkError::MissingEndpoint`] if neither is set.
    /// - [`GridlinkError::InvalidUrl`] if parsing fails.
    /// - [`GridlinkError::InsecureUrl`] for a non-`wss` scheme, unless
    ///   `allow_insecure` is set and the scheme is `ws`.
    pub fn resolve_url(&self) -> Result<Url, GridlinkError> {
        let url = match (&self.url, &self.host) {
            (Some(url), _) => Url::parse(url)?,
            (None, Some(host)) => Url::parse(&format!("wss://{host}"))?.join(&self.path)?,
            (None, None) => return Err(GridlinkError::MissingEndpoint),
        };

        match url.scheme() {
            "wss" => Ok(url),
            "ws" if self.allow_insecure => {
                tracing::warn!(%url, "using insecure WebSocket endpoint");
                Ok(url)
            }
            _ => Err(GridlinkError::InsecureUrl(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_host(host: &str) -> ClientConfig {
        ClientConfig {
            host: Some(host.into()),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.path, "/websocket");
        assert_eq!(config.governor.fallback, Duration::from_millis(2000));
        assert_eq!(config.reconnect.buffer_capacity, 5);
        assert_eq!(config.session.response_timeout, None);
        assert!(!config.allow_insecure);
    }

    #[test]
    fn test_host_resolves_to_wss_websocket_path() {
        let url = with_host("localhost:8443").resolve_url().unwrap();
        assert_eq!(url.as_str(), "wss://localhost:8443/websocket");
    }

    #[test]
    fn test_relative_path_is_joined_like_a_link() {
        let config = ClientConfig {
            path: "realtime/ws".into(),
            ..with_host("grid.example.com")
        };
        assert_eq!(
            config.resolve_url().unwrap().as_str(),
            "wss://grid.example.com/realtime/ws"
        );
    }

    #[test]
    fn test_explicit_url_takes_precedence() {
        let config = ClientConfig {
            url: Some("wss://other.example.com/socket".into()),
            ..with_host("grid.example.com")
        };
        assert_eq!(
            config.resolve_url().unwrap().host_str(),
            Some("other.example.com")
        );
    }

    #[test]
    fn test_plain_ws_is_rejected_unless_allowed() {
        let mut config = ClientConfig {
            url: Some("ws://127.0.0.1:9000/websocket".into()),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.resolve_url(),
            Err(GridlinkError::InsecureUrl(_))
        ));

        config.allow_insecure = true;
        assert_eq!(config.resolve_url().unwrap().scheme(), "ws");
    }

    #[test]
    fn test_non_websocket_scheme_is_always_rejected() {
        let config = ClientConfig {
            url: Some("https://grid.example.com/websocket".into()),
            allow_insecure: true,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.resolve_url(),
            Err(GridlinkError::InsecureUrl(_))
        ));
    }

    #[test]
    fn test_missing_endpoint() {
        assert!(matches!(
            ClientConfig::default().resolve_url(),
            Err(GridlinkError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_validated_clamps_zero_fallback() {
        let config = ClientConfig {
            governor: GovernorConfig {
                fallback: Duration::ZERO,
            },
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(config.governor.fallback, Duration::from_millis(1));
    }
}
