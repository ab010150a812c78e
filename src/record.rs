//! Row view over query result batches.

use std::collections::BTreeMap;

use arrow_array::RecordBatch;

use crate::error::Result;
use crate::value::Value;

/// Column holding the point timestamp in InfluxDB 3 results.
pub const TIME_COLUMN: &str = "time";

/// Column holding the measurement name when querying across tables.
pub const MEASUREMENT_COLUMN: &str = "iox::measurement";

/// A single row from a query result.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRecord {
    /// Index of the batch this row came from.
    pub batch: usize,
    /// Column name to value mapping.
    pub values: BTreeMap<String, Value>,
}

impl QueryRecord {
    /// Create a new empty QueryRecord.
    pub fn new(batch: usize) -> Self {
        Self {
            batch,
            values: BTreeMap::new(),
        }
    }

    /// Build the record for `row` of `batch`.
    pub fn from_batch(batch_index: usize, batch: &RecordBatch, row: usize) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
            values.insert(field.name().clone(), Value::from_array(column.as_ref(), row)?);
        }
        Ok(Self {
            batch: batch_index,
            values,
        })
    }

    /// Get a value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get value as string.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.get(name).and_then(|v| v.string())
    }

    /// Get value as f64.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(|v| v.as_double())
    }

    /// Get value as i64.
    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|v| v.as_long())
    }

    /// Get value as bool.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }

    /// Get the timestamp (`time` column).
    pub fn time(&self) -> Option<&chrono::DateTime<chrono::FixedOffset>> {
        self.values.get(TIME_COLUMN).and_then(|v| v.as_time())
    }

    /// Get the measurement name (`iox::measurement` column).
    pub fn measurement(&self) -> Option<String> {
        self.get_string(MEASUREMENT_COLUMN)
    }
}
