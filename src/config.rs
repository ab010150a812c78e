//! Client configuration.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::options::{DEFAULT_WRITE_OPTIONS, Precision, QueryOptions, WriteOptions};

/// Environment variable holding the server URL.
pub const ENV_HOST: &str = "INFLUX_HOST";
/// Environment variable holding the authentication token.
pub const ENV_TOKEN: &str = "INFLUX_TOKEN";
/// Environment variable holding the default database.
pub const ENV_DATABASE: &str = "INFLUX_DATABASE";
/// Environment variable holding the write precision.
pub const ENV_PRECISION: &str = "INFLUX_PRECISION";
/// Environment variable holding the write gzip threshold.
pub const ENV_GZIP_THRESHOLD: &str = "INFLUX_GZIP_THRESHOLD";

/// Configuration for [`Client`](crate::Client).
///
/// # Example
///
/// ```
/// use influxdb3_flight::ClientConfig;
///
/// let config = ClientConfig::new("https://us-east-1-1.aws.cloud2.influxdata.com", "my-token")
///     .with_database("sensors");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server URL. `http://` selects a plaintext connection.
    pub host: String,
    /// Authentication token, sent as a bearer token.
    pub token: String,
    /// Database used when a call does not name one.
    pub database: Option<String>,
    /// Defaults for query calls.
    pub query_options: Option<QueryOptions>,
    /// Defaults for write calls.
    pub write_options: Option<WriteOptions>,
}

impl ClientConfig {
    /// Create a configuration for `host` authenticated with `token`.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    /// Set the session database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the default query options.
    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.query_options = Some(options);
        self
    }

    /// Set the default write options.
    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = Some(options);
        self
    }

    /// Read the configuration from `INFLUX_*` environment variables.
    ///
    /// `INFLUX_HOST` and `INFLUX_TOKEN` are required; the database, precision
    /// and gzip threshold are optional.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(ENV_HOST)
            .map_err(|_| Error::Configuration(format!("{} is not set", ENV_HOST)))?;
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| Error::Configuration(format!("{} is not set", ENV_TOKEN)))?;

        let mut config = Self::new(host, token);

        if let Some(database) = env_non_empty(ENV_DATABASE) {
            config.database = Some(database);
        }

        let precision = env_non_empty(ENV_PRECISION)
            .map(|p| p.parse::<Precision>())
            .transpose()?;
        let gzip_threshold = env_non_empty(ENV_GZIP_THRESHOLD)
            .map(|t| {
                t.parse::<usize>().map_err(|e| {
                    Error::Configuration(format!("invalid {} '{}': {}", ENV_GZIP_THRESHOLD, t, e))
                })
            })
            .transpose()?;

        if precision.is_some() || gzip_threshold.is_some() {
            let mut write = DEFAULT_WRITE_OPTIONS;
            if let Some(precision) = precision {
                write.precision = precision;
            }
            if let Some(threshold) = gzip_threshold {
                write.gzip_threshold = threshold;
            }
            config.write_options = Some(write);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the fields needed to build a client.
    ///
    /// The database is not checked: it may be supplied per call.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("empty host".to_string()));
        }
        if self.token.is_empty() {
            return Err(Error::Configuration("no token specified".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("database", &self.database)
            .field("query_options", &self.query_options)
            .field("write_options", &self.write_options)
            .finish()
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
