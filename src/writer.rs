use super::{error::Error, row::Row};

use async_trait::async_trait;
use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

/// Storage for the rows of materialized resources.
///
/// Rows of one resource arrive in a single call, every parent row before its children.
#[async_trait]
pub trait RowWriter: Send + Sync {
    async fn write(&self, rows: Vec<Row>) -> Result<(), Error>;
}

/// Keeps every written row in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    rows: Mutex<Vec<Row>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of every row written so far, in write order.
    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RowWriter for MemoryWriter {
    async fn write(&self, mut rows: Vec<Row>) -> Result<(), Error> {
        self.rows
            .lock()
            .map_err(|err| Error::Write(err.to_string()))?
            .append(&mut rows);
        Ok(())
    }
}

/// Writes every row as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> RowWriter for JsonLinesWriter<W> {
    async fn write(&self, rows: Vec<Row>) -> Result<(), Error> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|err| Error::Write(err.to_string()))?;

        for row in rows {
            serde_json::to_writer(&mut *inner, &row).map_err(|err| Error::Write(err.to_string()))?;
            inner
                .write_all(b"\n")
                .map_err(|err| Error::Write(err.to_string()))?;
        }

        inner.flush().map_err(|err| Error::Write(err.to_string()))
    }
}
