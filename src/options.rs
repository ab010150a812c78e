//! Query and write options.
//!
//! Options are resolved by copying a defaults record into a fresh draft and
//! applying an ordered list of overrides to it. Later overrides win over
//! earlier ones and over the defaults; the defaults themselves are `const`
//! values and are never mutated.
//!
//! ```
//! use influxdb3_flight::options::{
//!     DEFAULT_WRITE_OPTIONS, Precision, resolve_write_options, with_gzip_threshold,
//!     with_precision,
//! };
//!
//! let options = resolve_write_options(
//!     Some(&DEFAULT_WRITE_OPTIONS),
//!     [with_precision(Precision::Millisecond), with_gzip_threshold(0)],
//! );
//! assert_eq!(options.precision, Precision::Millisecond);
//! assert_eq!(options.gzip_threshold, 0);
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Query dialect sent to the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    /// SQL executed through Flight SQL prepared statements.
    #[default]
    #[serde(rename = "FlightSQL", alias = "sql")]
    FlightSql,
    /// InfluxQL executed through a JSON ticket.
    #[serde(rename = "InfluxQL", alias = "influxql")]
    InfluxQl,
}

impl QueryType {
    /// Lower-case name used inside query tickets.
    pub fn ticket_name(&self) -> &'static str {
        match self {
            QueryType::FlightSql => "sql",
            QueryType::InfluxQl => "influxql",
        }
    }
}

impl FromStr for QueryType {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "flightsql" | "sql" => Ok(Self::FlightSql),
            "influxql" => Ok(Self::InfluxQl),
            _ => Err(Error::Configuration(format!("unknown query type: {}", input))),
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryType::FlightSql => "FlightSQL",
            QueryType::InfluxQl => "InfluxQL",
        };
        write!(f, "{}", s)
    }
}

/// Timestamp precision of written points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Nanoseconds (`ns`).
    #[default]
    Nanosecond,
    /// Microseconds (`us`).
    Microsecond,
    /// Milliseconds (`ms`).
    Millisecond,
    /// Seconds (`s`).
    Second,
}

impl Precision {
    /// Short unit name, as used by the write API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanosecond => "ns",
            Precision::Microsecond => "us",
            Precision::Millisecond => "ms",
            Precision::Second => "s",
        }
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "ns" | "nanosecond" => Ok(Self::Nanosecond),
            "us" | "microsecond" => Ok(Self::Microsecond),
            "ms" | "millisecond" => Ok(Self::Millisecond),
            "s" | "second" => Ok(Self::Second),
            _ => Err(Error::Configuration(format!("unsupported precision: {}", input))),
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for a single query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Database to query. Empty means the client's configured database.
    pub database: String,
    /// Query dialect.
    pub query_type: QueryType,
}

/// Options for a single write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Database to write to. Empty means the client's configured database.
    pub database: String,
    /// Timestamp precision of the written points.
    pub precision: Precision,
    /// Tags added to every point. Tags already present on a point are kept.
    pub default_tags: BTreeMap<String, String>,
    /// Bodies larger than this many bytes are gzipped. 0 disables compression.
    pub gzip_threshold: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        DEFAULT_WRITE_OPTIONS
    }
}

impl WriteOptions {
    /// Merge the default tags into `point_tags`, leaving existing keys untouched.
    pub fn apply_default_tags(&self, point_tags: &mut BTreeMap<String, String>) {
        for (key, value) in &self.default_tags {
            point_tags
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Whether a body of `body_len` bytes should be compressed.
    pub fn should_gzip(&self, body_len: usize) -> bool {
        self.gzip_threshold > 0 && body_len > self.gzip_threshold
    }
}

/// Default query options.
pub const DEFAULT_QUERY_OPTIONS: QueryOptions = QueryOptions {
    database: String::new(),
    query_type: QueryType::FlightSql,
};

/// Default write options.
pub const DEFAULT_WRITE_OPTIONS: WriteOptions = WriteOptions {
    database: String::new(),
    precision: Precision::Nanosecond,
    default_tags: BTreeMap::new(),
    gzip_threshold: 1_000,
};

/// A single option override.
///
/// Overrides are built with the `with_*` functions and applied in order;
/// an override only touches the field it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opt {
    /// Database for both queries and writes.
    Database(String),
    /// Query dialect.
    QueryType(QueryType),
    /// Write timestamp precision.
    Precision(Precision),
    /// Write compression threshold in bytes.
    GzipThreshold(usize),
    /// Write default tags (replaces the whole map).
    DefaultTags(BTreeMap<String, String>),
}

/// Override accepted by query calls.
pub type QueryOption = Opt;

/// Override accepted by write calls.
pub type WriteOption = Opt;

impl Opt {
    fn apply(self, draft: &mut Options) {
        match self {
            Opt::Database(database) => {
                draft.query.database = database.clone();
                draft.write.database = database;
            }
            Opt::QueryType(query_type) => draft.query.query_type = query_type,
            Opt::Precision(precision) => draft.write.precision = precision,
            Opt::GzipThreshold(threshold) => draft.write.gzip_threshold = threshold,
            Opt::DefaultTags(tags) => draft.write.default_tags = tags,
        }
    }
}

/// Override the database for queries and writes.
pub fn with_database(database: impl Into<String>) -> Opt {
    Opt::Database(database.into())
}

/// Override the query dialect.
pub fn with_query_type(query_type: QueryType) -> Opt {
    Opt::QueryType(query_type)
}

/// Override the write timestamp precision.
pub fn with_precision(precision: Precision) -> Opt {
    Opt::Precision(precision)
}

/// Override the write gzip threshold.
pub fn with_gzip_threshold(threshold: usize) -> Opt {
    Opt::GzipThreshold(threshold)
}

/// Override the default tags added to written points.
pub fn with_default_tags<K, V>(tags: impl IntoIterator<Item = (K, V)>) -> Opt
where
    K: Into<String>,
    V: Into<String>,
{
    Opt::DefaultTags(
        tags.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

/// Resolution draft holding both the query and the write half.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Query half.
    pub query: QueryOptions,
    /// Write half.
    pub write: WriteOptions,
}

impl Default for Options {
    /// The empty draft: no database, default dialect and precision, no
    /// default tags and compression disabled.
    fn default() -> Self {
        Self {
            query: QueryOptions::default(),
            write: WriteOptions {
                gzip_threshold: 0,
                ..DEFAULT_WRITE_OPTIONS
            },
        }
    }
}

/// Resolve defaults and overrides into a fresh [`Options`] draft.
///
/// An absent half starts from the empty draft (see [`Options::default`]),
/// not from [`DEFAULT_QUERY_OPTIONS`]/[`DEFAULT_WRITE_OPTIONS`].
pub fn resolve_options(
    query_defaults: Option<&QueryOptions>,
    write_defaults: Option<&WriteOptions>,
    overrides: impl IntoIterator<Item = Opt>,
) -> Options {
    let mut draft = Options::default();

    if let Some(defaults) = query_defaults {
        draft.query = defaults.clone();
    }
    if let Some(defaults) = write_defaults {
        draft.write = defaults.clone();
    }

    for opt in overrides {
        opt.apply(&mut draft);
    }

    draft
}

/// Resolve query options, discarding the write half.
pub fn resolve_query_options(
    defaults: Option<&QueryOptions>,
    overrides: impl IntoIterator<Item = QueryOption>,
) -> QueryOptions {
    resolve_options(defaults, None, overrides).query
}

/// Resolve write options, discarding the query half.
pub fn resolve_write_options(
    defaults: Option<&WriteOptions>,
    overrides: impl IntoIterator<Item = WriteOption>,
) -> WriteOptions {
    resolve_options(None, defaults, overrides).write
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = resolve_query_options(Some(&DEFAULT_QUERY_OPTIONS), []);
        assert_eq!(q.database, "");
        assert_eq!(q.query_type, QueryType::FlightSql);

        let w = resolve_write_options(Some(&DEFAULT_WRITE_OPTIONS), []);
        assert_eq!(w.precision, Precision::Nanosecond);
        assert_eq!(w.gzip_threshold, 1000);
        assert!(w.default_tags.is_empty());
    }

    #[test]
    fn test_defaults_are_not_mutated() {
        let defaults = WriteOptions {
            database: "base".to_string(),
            default_tags: BTreeMap::from([("rack".to_string(), "a".to_string())]),
            ..DEFAULT_WRITE_OPTIONS
        };
        let snapshot = defaults.clone();

        let resolved = resolve_write_options(
            Some(&defaults),
            [
                with_database("other"),
                with_default_tags([("rack", "b")]),
                with_gzip_threshold(5),
            ],
        );
        assert_eq!(resolved.database, "other");
        assert_eq!(resolved.default_tags["rack"], "b");

        assert_eq!(defaults, snapshot);
        assert_eq!(resolve_write_options(Some(&defaults), []), snapshot);
    }

    #[test]
    fn test_last_override_wins() {
        for n in 1..6 {
            let overrides = (0..n).map(|i| with_database(format!("db{}", i)));
            let q = resolve_query_options(Some(&DEFAULT_QUERY_OPTIONS), overrides);
            assert_eq!(q.database, format!("db{}", n - 1));
        }

        let w = resolve_write_options(
            Some(&DEFAULT_WRITE_OPTIONS),
            [
                with_precision(Precision::Second),
                with_gzip_threshold(10),
                with_precision(Precision::Millisecond),
            ],
        );
        assert_eq!(w.precision, Precision::Millisecond);
        assert_eq!(w.gzip_threshold, 10);
    }

    #[test]
    fn test_query_and_write_halves_are_separate() {
        let draft = resolve_options(
            Some(&DEFAULT_QUERY_OPTIONS),
            Some(&DEFAULT_WRITE_OPTIONS),
            [
                with_query_type(QueryType::InfluxQl),
                with_precision(Precision::Second),
                with_database("shared"),
            ],
        );
        assert_eq!(draft.query.query_type, QueryType::InfluxQl);
        assert_eq!(draft.query.database, "shared");
        assert_eq!(draft.write.precision, Precision::Second);
        assert_eq!(draft.write.database, "shared");

        // Write-only overrides have no effect on the query view and vice versa.
        let q = resolve_query_options(
            Some(&DEFAULT_QUERY_OPTIONS),
            [with_precision(Precision::Second), with_gzip_threshold(1)],
        );
        assert_eq!(q, DEFAULT_QUERY_OPTIONS);

        let w = resolve_write_options(
            Some(&DEFAULT_WRITE_OPTIONS),
            [with_query_type(QueryType::InfluxQl)],
        );
        assert_eq!(w, DEFAULT_WRITE_OPTIONS);
    }

    #[test]
    fn test_gzip_threshold_override_keeps_precision() {
        let w = resolve_write_options(Some(&DEFAULT_WRITE_OPTIONS), [with_gzip_threshold(0)]);
        assert_eq!(w.gzip_threshold, 0);
        assert_eq!(w.precision, Precision::Nanosecond);
        assert!(!w.should_gzip(1_000_000));
    }

    #[test]
    fn test_should_gzip() {
        let w = DEFAULT_WRITE_OPTIONS;
        assert!(!w.should_gzip(999));
        assert!(!w.should_gzip(1000));
        assert!(w.should_gzip(1001));
    }

    #[test]
    fn test_apply_default_tags_keeps_point_tags() {
        let w = resolve_write_options(
            Some(&DEFAULT_WRITE_OPTIONS),
            [with_default_tags([("rack", "main"), ("dc", "eu")])],
        );
        let mut tags = BTreeMap::from([("rack".to_string(), "spare".to_string())]);
        w.apply_default_tags(&mut tags);

        assert_eq!(tags["rack"], "spare");
        assert_eq!(tags["dc"], "eu");
    }

    #[test]
    fn test_no_defaults() {
        let draft = resolve_options(None, None, [with_database("x")]);
        assert_eq!(draft.query.database, "x");
        assert_eq!(draft.query.query_type, QueryType::FlightSql);
        assert_eq!(draft.write.database, "x");
        assert_eq!(draft.write.gzip_threshold, 0);

        let w = resolve_write_options(None, []);
        assert_eq!(w.gzip_threshold, 0);
        assert!(!w.should_gzip(10_000));
        assert_eq!(w.precision, Precision::Nanosecond);
        assert!(w.default_tags.is_empty());
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("ms".parse::<Precision>().unwrap(), Precision::Millisecond);
        assert_eq!("Second".parse::<Precision>().unwrap(), Precision::Second);
        assert_eq!(Precision::Microsecond.to_string(), "us");
        assert!("hours".parse::<Precision>().is_err());
    }

    #[test]
    fn test_query_type_parse() {
        assert_eq!("InfluxQL".parse::<QueryType>().unwrap(), QueryType::InfluxQl);
        assert_eq!("flightsql".parse::<QueryType>().unwrap(), QueryType::FlightSql);
        assert_eq!(QueryType::FlightSql.to_string(), "FlightSQL");
        assert!("flux".parse::<QueryType>().is_err());
    }
}
