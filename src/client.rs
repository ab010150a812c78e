//! InfluxDB 3 query client.
//!
//! This module provides the main `Client` type for executing SQL and InfluxQL
//! queries against an InfluxDB 3 server over Arrow Flight.

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_flight::{FlightInfo, Ticket};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::iterator::QueryIterator;
use crate::options::{
    DEFAULT_QUERY_OPTIONS, DEFAULT_WRITE_OPTIONS, QueryOption, QueryOptions, QueryType,
    WriteOption, WriteOptions, resolve_query_options, resolve_write_options,
};
use crate::transport::{
    CallHeaders, FlightSqlTransport, FlightTransport, PreparedStatementHandle, StatementGuard,
};

/// InfluxDB 3 query client.
///
/// The client owns one transport for its whole lifetime; every query call
/// reuses it. Cloning a client is cheap and clones share the transport.
///
/// # Example
///
/// ```ignore
/// use influxdb3_flight::{Client, ClientConfig};
/// use influxdb3_flight::options::with_database;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::new("https://us-east-1-1.aws.cloud2.influxdata.com", "my-token")
///         .with_database("sensors");
///     let client = Client::new(config)?;
///
///     let mut it = client
///         .query_with("SELECT * FROM temperature LIMIT 10", [with_database("lab")])
///         .await?;
///
///     while let Some(record) = it.next_record().await? {
///         println!("Got: {:?}", record);
///     }
///
///     Ok(())
/// }
/// ```
pub struct Client<T: FlightTransport = FlightSqlTransport> {
    transport: Arc<T>,
    config: Arc<ClientConfig>,
}

impl<T: FlightTransport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: FlightTransport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Ticket body for queries that bypass prepared statements.
#[derive(Debug, Serialize)]
struct TicketPayload<'a> {
    database: &'a str,
    sql_query: &'a str,
    query_type: &'static str,
}

impl Client<FlightSqlTransport> {
    /// Create a new client from `config`.
    ///
    /// The Flight channel is built here and connects on first use. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if the host or token is missing, or the
    ///   system trust store cannot be loaded for a TLS host.
    /// - [`Error::Connection`] if the endpoint cannot be constructed or no
    ///   Tokio runtime is running.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = FlightSqlTransport::connect(&config.host)?;
        Self::with_transport(config, transport)
    }

    /// Create a new client from `INFLUX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: FlightTransport> Client<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Query defaults: the configured ones, else [`DEFAULT_QUERY_OPTIONS`].
    fn query_defaults(&self) -> QueryOptions {
        self.config
            .query_options
            .clone()
            .unwrap_or(DEFAULT_QUERY_OPTIONS)
    }

    /// Resolve write overrides onto the configured write defaults.
    ///
    /// When no database was resolved, the session database is filled in.
    pub fn write_options(&self, overrides: impl IntoIterator<Item = WriteOption>) -> WriteOptions {
        let defaults = self
            .config
            .write_options
            .clone()
            .unwrap_or(DEFAULT_WRITE_OPTIONS);
        let mut options = resolve_write_options(Some(&defaults), overrides);
        if options.database.is_empty() {
            if let Some(database) = &self.config.database {
                options.database = database.clone();
            }
        }
        options
    }

    /// Database for a call: the option's, else the session's.
    fn effective_database(&self, options: &QueryOptions) -> Result<String> {
        if !options.database.is_empty() {
            return Ok(options.database.clone());
        }
        match self.config.database.as_deref() {
            Some(database) if !database.is_empty() => Ok(database.to_string()),
            _ => Err(Error::Validation("database not specified".to_string())),
        }
    }

    /// Execute a query with the default query options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let batches = client.query("SELECT count(*) FROM cpu").await?.collect_batches().await?;
    /// ```
    pub async fn query(&self, query: &str) -> Result<QueryIterator> {
        let options = self.query_defaults();
        self.query_with_options(&options, query, None).await
    }

    /// Execute a query with bound parameters.
    ///
    /// `params` is a single-row record batch whose columns bind the
    /// statement's placeholders; it is sent as-is.
    pub async fn query_parametrized(
        &self,
        query: &str,
        params: RecordBatch,
    ) -> Result<QueryIterator> {
        let options = self.query_defaults();
        self.query_with_options(&options, query, Some(params)).await
    }

    /// Execute a query with per-call overrides applied to the query defaults.
    pub async fn query_with(
        &self,
        query: &str,
        overrides: impl IntoIterator<Item = QueryOption>,
    ) -> Result<QueryIterator> {
        let defaults = self.query_defaults();
        let options = resolve_query_options(Some(&defaults), overrides);
        self.query_with_options(&options, query, None).await
    }

    /// Execute a query with explicit options and optional parameters.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if no database can be resolved, before any
    ///   request is sent.
    /// - [`Error::Remote`] if the server rejects prepare, execute or fetch.
    /// - [`Error::Decode`] if the result stream cannot be decoded.
    pub async fn query_with_options(
        &self,
        options: &QueryOptions,
        query: &str,
        params: Option<RecordBatch>,
    ) -> Result<QueryIterator> {
        let database = self.effective_database(options)?;
        let headers = CallHeaders::new(&self.config.token, &database);

        debug!(
            database = %database,
            query_type = %options.query_type,
            parametrized = params.is_some(),
            "executing query"
        );

        match options.query_type {
            QueryType::FlightSql => self.query_prepared(&headers, query, params).await,
            QueryType::InfluxQl => {
                if params.is_some() {
                    return Err(Error::Validation(
                        "parameters are not supported for InfluxQL queries".to_string(),
                    ));
                }
                self.query_ticket(&headers, query, options.query_type).await
            }
        }
    }

    /// Prepare, bind, execute and fetch. The statement is released before
    /// returning, whatever the outcome.
    async fn query_prepared(
        &self,
        headers: &CallHeaders,
        query: &str,
        params: Option<RecordBatch>,
    ) -> Result<QueryIterator> {
        let statement = self.transport.prepare(headers, query).await?;
        let mut guard = StatementGuard::new(statement);

        let result = self
            .execute_and_fetch(guard.statement_mut(), headers, params)
            .await;

        guard.release().await;
        result
    }

    async fn execute_and_fetch(
        &self,
        statement: &mut T::Statement,
        headers: &CallHeaders,
        params: Option<RecordBatch>,
    ) -> Result<QueryIterator> {
        if let Some(params) = params {
            statement.set_parameters(params)?;
        }
        let info = statement.execute().await?;
        let ticket = first_ticket(info)?;
        self.fetch(headers, ticket).await
    }

    /// Query through a JSON ticket, without a prepared statement.
    async fn query_ticket(
        &self,
        headers: &CallHeaders,
        query: &str,
        query_type: QueryType,
    ) -> Result<QueryIterator> {
        let payload = TicketPayload {
            database: headers.database(),
            sql_query: query,
            query_type: query_type.ticket_name(),
        };
        let ticket = Ticket::new(serde_json::to_vec(&payload)?);
        self.fetch(headers, ticket).await
    }

    async fn fetch(&self, headers: &CallHeaders, ticket: Ticket) -> Result<QueryIterator> {
        trace!(ticket_bytes = ticket.ticket.len(), "fetching results");
        let stream = self.transport.do_get(headers, ticket).await?;
        QueryIterator::open(stream).await
    }
}

/// Take the ticket of the first endpoint.
///
/// Partitioned results with several endpoints are not merged; only the
/// first partition is read.
fn first_ticket(info: FlightInfo) -> Result<Ticket> {
    let endpoints = info.endpoint.len();
    if endpoints > 1 {
        debug!(endpoints, "result has several endpoints, reading the first");
    }

    info.endpoint
        .into_iter()
        .next()
        .and_then(|endpoint| endpoint.ticket)
        .ok_or_else(|| Error::Remote {
            operation: "execute",
            message: "response contained no endpoint ticket".to_string(),
        })
}
