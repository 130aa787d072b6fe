use bytes::Bytes;
use futures::Stream;

use crate::httpx::error::{Error, Result};

pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    pub async fn bytes(self) -> Result<Bytes> {
        self.inner
            .bytes()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to read body: {e}")))
    }

    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        self.inner
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to decode body: {e}")))
    }

    pub fn bytes_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> + Send {
        self.inner.bytes_stream()
    }
}

impl From<reqwest::Response> for Response {
    fn from(inner: reqwest::Response) -> Self {
        Self { inner }
    }
}
