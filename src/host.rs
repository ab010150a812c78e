//! Host normalization for the Flight endpoint.
//!
//! The scheme of the configured host decides the transport: `http://`
//! selects a plaintext channel, `https://` or no scheme selects TLS.

use url::Url;

use crate::error::{Error, Result};

/// A normalized gRPC target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// Endpoint URI handed to the gRPC channel, always with an explicit port.
    pub uri: String,
    /// Host name without port, used for TLS server name checks.
    pub host: String,
    /// Port, defaulted from the scheme when absent.
    pub port: u16,
    /// Whether certificates must be validated against the system trust store.
    pub secure: bool,
}

/// Normalize a configured host string into a [`Target`].
///
/// # Examples
///
/// ```
/// use influxdb3_flight::host::normalize_host;
///
/// let target = normalize_host("https://cloud.example.com/").unwrap();
/// assert_eq!(target.uri, "https://cloud.example.com:443");
/// assert!(target.secure);
///
/// let local = normalize_host("http://localhost:8181").unwrap();
/// assert_eq!(local.uri, "http://localhost:8181");
/// assert!(!local.secure);
/// ```
pub fn normalize_host(host: &str) -> Result<Target> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Configuration("empty host".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|e| Error::Configuration(format!("invalid host '{}': {}", host, e)))?;

    let secure = match parsed.scheme() {
        "https" => true,
        "http" => false,
        other => {
            return Err(Error::Configuration(format!(
                "unsupported scheme '{}' in host '{}'",
                other, host
            )));
        }
    };

    let host_name = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Configuration(format!("no host name in '{}'", host)))?
        .to_string();

    // port_or_known_default gives 443/80 for https/http
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| Error::Configuration(format!("no port for host '{}'", host)))?;

    let scheme = if secure { "https" } else { "http" };
    Ok(Target {
        uri: format!("{}://{}:{}", scheme, host_name, port),
        host: host_name,
        port,
        secure,
    })
}
