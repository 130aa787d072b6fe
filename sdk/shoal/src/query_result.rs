use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorKind, Result};
use shoal_core::servicecomponent::ServiceRows;

/// A streamed query result: rows arrive one at a time, the metadata blob is
/// available once the rows are exhausted.
pub struct QueryResult {
    rows: ServiceRows,
}

impl QueryResult {
    pub(crate) fn new(rows: ServiceRows) -> Self {
        Self { rows }
    }

    pub async fn next_row_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        self.rows.read_row().await.map_err(Error::from)
    }

    pub async fn next_row<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let row = match self.next_row_bytes().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        serde_json::from_slice(&row)
            .map(Some)
            .map_err(|_e| Error::new(ErrorKind::ParsingFailure))
    }

    /// Collects every remaining row.
    pub async fn rows<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let mut rows = vec![];
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// The trailing metadata; present once all rows have been read.
    pub fn metadata_bytes(&self) -> Option<&[u8]> {
        self.rows.metadata()
    }
}
