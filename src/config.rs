use std::fmt;

/// Default upstream base URL when `VENICE_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://api.venice.ai/api/v1";

fn default_port() -> u16 {
    4001
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VENICE_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("Invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Process configuration, read once from the environment at startup and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream base URL; only its origin matters for request routing since
    /// forwarded paths are absolute.
    pub base_url: url::Url,
    /// Bearer credential injected into every upstream request.
    pub api_key: String,
    /// Inbound listen port.
    pub port: u16,
    /// Verbose request logging toggle.
    pub debug: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when `VENICE_API_KEY` is unset
    /// or empty, and [`ConfigError::Invalid`] when `VENICE_BASE_URL` or
    /// `VENICE_PROXY_PORT` fail to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup("VENICE_BASE_URL") {
            Some(raw) if !raw.trim().is_empty() => {
                url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                    name: "VENICE_BASE_URL",
                    message: e.to_string(),
                })?
            }
            _ => url::Url::parse(DEFAULT_BASE_URL).map_err(|e| ConfigError::Invalid {
                name: "VENICE_BASE_URL",
                message: e.to_string(),
            })?,
        };

        let api_key = match lookup("VENICE_API_KEY") {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => return Err(ConfigError::MissingApiKey),
        };

        let port = match lookup("VENICE_PROXY_PORT") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::Invalid {
                        name: "VENICE_PROXY_PORT",
                        message: e.to_string(),
                    })?
            }
            _ => default_port(),
        };

        let debug = lookup("VENICE_PROXY_DEBUG")
            .is_some_and(|value| !value.is_empty() && value != "0");

        Ok(Self {
            base_url,
            api_key,
            port,
            debug,
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // api_key deliberately excluded
        write!(
            f,
            "base_url={} port={} debug={}",
            self.base_url, self.port, self.debug
        )
    }
}
