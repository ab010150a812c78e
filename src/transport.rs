//! Flight SQL transport.
//!
//! [`FlightTransport`] is the seam between the query session and the wire:
//! it prepares statements and redeems tickets. [`FlightSqlTransport`] is the
//! gRPC implementation built on `arrow-flight` and `tonic`.

use std::pin::Pin;

use arrow_array::RecordBatch;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::sql::client::{FlightSqlServiceClient, PreparedStatement};
use arrow_flight::{FlightClient, FlightInfo, Ticket};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::host::{Target, normalize_host};

/// Stream of decoded record batches returned by a fetch.
pub type RecordBatchStream = Pin<Box<dyn Stream<Item = Result<RecordBatch>> + Send>>;

/// Metadata attached to every request of a single query call.
#[derive(Clone, PartialEq, Eq)]
pub struct CallHeaders {
    authorization: String,
    database: String,
}

impl CallHeaders {
    /// Header carrying the bearer token.
    pub const AUTHORIZATION: &'static str = "authorization";
    /// Header carrying the target database.
    pub const DATABASE: &'static str = "database";

    /// Build headers for `database` authenticated with `token`.
    pub fn new(token: &str, database: &str) -> Self {
        Self {
            authorization: format!("Bearer {}", token),
            database: database.to_string(),
        }
    }

    /// Value of the `authorization` header.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Value of the `database` header.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// All header pairs in the order they are attached.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (Self::AUTHORIZATION, self.authorization.as_str()),
            (Self::DATABASE, self.database.as_str()),
        ]
        .into_iter()
    }
}

impl std::fmt::Debug for CallHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHeaders")
            .field("authorization", &"Bearer <redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// A server-side prepared statement.
///
/// Must be closed exactly once; see [`StatementGuard`].
#[async_trait]
pub trait PreparedStatementHandle: Send + 'static {
    /// Bind a parameter record to the statement.
    fn set_parameters(&mut self, params: RecordBatch) -> Result<()>;

    /// Execute the statement, returning where to fetch the results.
    async fn execute(&mut self) -> Result<FlightInfo>;

    /// Release the statement on the server.
    async fn close(self) -> Result<()>;
}

/// The remote operations a query call needs.
#[async_trait]
pub trait FlightTransport: Send + Sync + 'static {
    /// Prepared statement type produced by [`FlightTransport::prepare`].
    type Statement: PreparedStatementHandle;

    /// Prepare `query` under `headers`.
    async fn prepare(&self, headers: &CallHeaders, query: &str) -> Result<Self::Statement>;

    /// Open a streaming fetch for `ticket` under `headers`.
    async fn do_get(&self, headers: &CallHeaders, ticket: Ticket) -> Result<RecordBatchStream>;
}

/// Owns a prepared statement and releases it on every exit path.
///
/// [`StatementGuard::release`] closes the statement and waits for the
/// server. If the guard is dropped instead (the calling future was
/// cancelled), the close is spawned onto the current Tokio runtime.
pub struct StatementGuard<S: PreparedStatementHandle> {
    statement: Option<S>,
}

impl<S: PreparedStatementHandle> StatementGuard<S> {
    /// Take ownership of `statement`.
    pub fn new(statement: S) -> Self {
        Self {
            statement: Some(statement),
        }
    }

    /// Access the guarded statement.
    pub fn statement_mut(&mut self) -> &mut S {
        self.statement
            .as_mut()
            .expect("statement is only taken by release or drop")
    }

    /// Close the statement now. A failed close is logged, not returned, so
    /// it never masks the outcome of the query that used the statement.
    pub async fn release(mut self) {
        if let Some(statement) = self.statement.take() {
            if let Err(e) = statement.close().await {
                warn!(error = %e, "failed to close prepared statement");
            }
        }
    }
}

impl<S: PreparedStatementHandle> Drop for StatementGuard<S> {
    fn drop(&mut self) {
        let Some(statement) = self.statement.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = statement.close().await {
                        warn!(error = %e, "failed to close abandoned prepared statement");
                    }
                });
            }
            Err(_) => warn!("prepared statement dropped outside a Tokio runtime; not closed"),
        }
    }
}

/// gRPC transport holding the generic Flight client and the Flight SQL client.
///
/// Both clients share one lazily-connected channel. Each call stamps its
/// headers onto cheap clones of the clients, so concurrent calls against
/// different databases never see each other's metadata.
#[derive(Clone, Debug)]
pub struct FlightSqlTransport {
    target: Target,
    flight: FlightServiceClient<Channel>,
    sql: FlightSqlServiceClient<Channel>,
}

impl FlightSqlTransport {
    /// Build the transport for `host`.
    ///
    /// `http://` hosts get a plaintext channel; every other host gets TLS
    /// verified against the system trust store. The channel connects on
    /// first use, so this performs no I/O, but it must run inside a Tokio
    /// runtime: outside one it returns [`Error::Connection`].
    pub fn connect(host: &str) -> Result<Self> {
        let target = normalize_host(host)?;

        // The lazy channel spawns its buffer worker on the current runtime.
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::Connection {
                message: format!("no Tokio runtime available to drive '{}'", target.uri),
            });
        }

        let mut endpoint =
            Endpoint::from_shared(target.uri.clone()).map_err(|e| Error::Connection {
                message: format!("invalid endpoint '{}': {}", target.uri, e),
            })?;

        if target.secure {
            let tls = system_tls_config(&target.host)?;
            endpoint = endpoint.tls_config(tls).map_err(|e| Error::Connection {
                message: format!("TLS setup for '{}' failed: {}", target.uri, e),
            })?;
        }

        debug!(uri = %target.uri, secure = target.secure, "created flight channel");

        let channel = endpoint.connect_lazy();
        Ok(Self {
            target,
            flight: FlightServiceClient::new(channel.clone()),
            sql: FlightSqlServiceClient::new(channel),
        })
    }

    /// The normalized target this transport talks to.
    pub fn target(&self) -> &Target {
        &self.target
    }
}

#[async_trait]
impl FlightTransport for FlightSqlTransport {
    type Statement = PreparedStatement<Channel>;

    async fn prepare(&self, headers: &CallHeaders, query: &str) -> Result<Self::Statement> {
        let mut sql = self.sql.clone();
        for (key, value) in headers.iter() {
            sql.set_header(key, value);
        }
        sql.prepare(query.to_string(), None)
            .await
            .map_err(|e| Error::remote("prepare", e))
    }

    async fn do_get(&self, headers: &CallHeaders, ticket: Ticket) -> Result<RecordBatchStream> {
        let mut flight = FlightClient::new_from_inner(self.flight.clone());
        for (key, value) in headers.iter() {
            flight
                .add_header(key, value)
                .map_err(|e| Error::Validation(format!("invalid '{}' header: {}", key, e)))?;
        }

        let stream = flight
            .do_get(ticket)
            .await
            .map_err(|e| Error::from_flight("do_get", e))?;

        Ok(Box::pin(
            stream.map_err(|e| Error::from_flight("do_get", e)),
        ))
    }
}

#[async_trait]
impl PreparedStatementHandle for PreparedStatement<Channel> {
    fn set_parameters(&mut self, params: RecordBatch) -> Result<()> {
        PreparedStatement::set_parameters(self, params).map_err(|e| Error::remote("bind", e))
    }

    async fn execute(&mut self) -> Result<FlightInfo> {
        PreparedStatement::execute(self)
            .await
            .map_err(|e| Error::remote("execute", e))
    }

    async fn close(self) -> Result<()> {
        PreparedStatement::close(self)
            .await
            .map_err(|e| Error::remote("close", e))
    }
}

/// TLS config for `domain` trusting the system roots.
///
/// tonic loads the roots itself when the channel is built; the store is
/// checked here first so an empty store is reported as a configuration error.
fn system_tls_config(domain: &str) -> Result<ClientTlsConfig> {
    let loaded = rustls_native_certs::load_native_certs();
    if loaded.certs.is_empty() {
        let detail = loaded
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Configuration(format!(
            "system trust store unavailable: {}",
            if detail.is_empty() { "no certificates found" } else { detail.as_str() }
        )));
    }

    debug!(certificates = loaded.certs.len(), "loaded system trust store");

    Ok(ClientTlsConfig::new()
        .domain_name(domain)
        .with_native_roots())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_headers() {
        let h = CallHeaders::new("secret", "metrics");
        assert_eq!(h.authorization(), "Bearer secret");
        assert_eq!(h.database(), "metrics");

        let pairs: Vec<_> = h.iter().collect();
        assert_eq!(
            pairs,
            vec![("authorization", "Bearer secret"), ("database", "metrics")]
        );
    }

    #[test]
    fn test_call_headers_debug_hides_token() {
        let h = CallHeaders::new("secret", "metrics");
        let printed = format!("{:?}", h);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("metrics"));
    }

    #[test]
    fn test_connect_outside_runtime_is_connection_error() {
        let err = FlightSqlTransport::connect("http://localhost:8181").unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn test_bad_host_reported_before_runtime_check() {
        let err = FlightSqlTransport::connect("ftp://localhost").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_tls_transport_uses_system_roots() {
        match FlightSqlTransport::connect("https://us-east-1.aws.example.com") {
            Ok(transport) => {
                assert!(transport.target().secure);
                assert_eq!(transport.target().port, 443);
            }
            // Hosts without a trust store report it as configuration.
            Err(err) => assert!(matches!(err, Error::Configuration(_))),
        }
    }

    #[tokio::test]
    async fn test_plaintext_transport_builds_without_io() {
        let transport = FlightSqlTransport::connect("http://localhost:8181").unwrap();
        assert!(!transport.target().secure);
        assert_eq!(transport.target().uri, "http://localhost:8181");
    }
}
