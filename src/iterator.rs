//! Iterator over a query's result stream.

use std::pin::Pin;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::record::QueryRecord;
use crate::transport::RecordBatchStream;

/// Handle over the record batches of one query.
///
/// The iterator owns the underlying stream: drain it, or drop it to cancel
/// the fetch and release the server-side resources.
///
/// # Example
///
/// ```ignore
/// let mut it = client.query("SELECT * FROM cpu").await?;
/// while let Some(record) = it.next_record().await? {
///     println!("{:?} {:?}", record.time(), record.get("usage_user"));
/// }
/// ```
pub struct QueryIterator {
    stream: RecordBatchStream,
    schema: Option<SchemaRef>,
    /// First batch, pulled when the iterator was opened.
    pending: Option<RecordBatch>,
    /// Batch currently being walked by `next_record`, with its index.
    current: Option<(usize, RecordBatch)>,
    row: usize,
    batches_read: usize,
    done: bool,
}

impl QueryIterator {
    /// Wrap `stream`, reading its first message.
    ///
    /// Reading eagerly makes a malformed or rejected stream fail here,
    /// while the caller is still in the query call.
    pub async fn open(mut stream: RecordBatchStream) -> Result<Self> {
        let first = stream.next().await.transpose()?;
        Ok(Self {
            schema: first.as_ref().map(|b| b.schema()),
            done: first.is_none(),
            pending: first,
            stream,
            current: None,
            row: 0,
            batches_read: 0,
        })
    }

    /// Schema of the results, once a batch has been seen.
    pub fn schema(&self) -> Option<SchemaRef> {
        self.schema.clone()
    }

    /// Whether the stream has been fully consumed.
    pub fn is_done(&self) -> bool {
        self.done && self.pending.is_none()
    }

    /// Number of batches handed out so far.
    pub fn batches_read(&self) -> usize {
        self.batches_read
    }

    /// Next record batch, or `None` at the end of the stream.
    pub async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if let Some(batch) = self.pending.take() {
            self.batches_read += 1;
            return Ok(Some(batch));
        }
        if self.done {
            return Ok(None);
        }

        match self.stream.next().await {
            Some(Ok(batch)) => {
                if self.schema.is_none() {
                    self.schema = Some(batch.schema());
                }
                self.batches_read += 1;
                Ok(Some(batch))
            }
            Some(Err(e)) => {
                self.done = true;
                Err(e)
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Next row, or `None` at the end of the stream.
    ///
    /// Empty batches are skipped.
    pub async fn next_record(&mut self) -> Result<Option<QueryRecord>> {
        loop {
            if let Some((index, batch)) = &self.current {
                if self.row < batch.num_rows() {
                    let record = QueryRecord::from_batch(*index, batch, self.row)?;
                    self.row += 1;
                    return Ok(Some(record));
                }
            }

            match self.next_batch().await? {
                Some(batch) => {
                    self.current = Some((self.batches_read - 1, batch));
                    self.row = 0;
                }
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    /// Read every remaining batch into memory.
    pub async fn collect_batches(mut self) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Read every remaining row into memory.
    ///
    /// **Warning**: for large results, iterate with `next_record()` instead.
    pub async fn collect_records(mut self) -> Result<Vec<QueryRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Turn the iterator into a stream of batches. The stream ends after the
    /// first error.
    pub fn into_batch_stream(mut self) -> Pin<Box<dyn Stream<Item = Result<RecordBatch>> + Send>> {
        let s = stream! {
            loop {
                match self.next_batch().await {
                    Ok(Some(batch)) => yield Ok(batch),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Box::pin(s)
    }

    /// Turn the iterator into a stream of rows. The stream ends after the
    /// first error.
    pub fn into_record_stream(
        mut self,
    ) -> Pin<Box<dyn Stream<Item = Result<QueryRecord>> + Send>> {
        let s = stream! {
            loop {
                match self.next_record().await {
                    Ok(Some(record)) => yield Ok(record),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Box::pin(s)
    }
}

impl std::fmt::Debug for QueryIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIterator")
            .field("schema", &self.schema)
            .field("batches_read", &self.batches_read)
            .field("done", &self.is_done())
            .finish()
    }
}
