use std::collections::HashMap;

use futures::{stream, Stream};
use serde_json::Value;

use crate::httpx::decoder::{Decoder, Token};
use crate::httpx::error::Error;
use crate::httpx::error::Result as HttpxResult;

#[derive(PartialEq, Eq, PartialOrd, Debug)]
enum RowStreamState {
    Start = 0,
    Rows = 1,
    PostRows = 2,
    End = 3,
}

/// Walks a row-shaped service response: a leading metadata prelude, then the
/// rows array streamed row by row, then trailing metadata. Attributes seen
/// before and after the rows are merged into one metadata blob.
pub struct RawJsonRowStreamer {
    stream: Decoder,
    rows_attrib: String,
    attribs: HashMap<String, Value>,
    state: RowStreamState,
}

pub enum RawJsonRowItem {
    Row(Vec<u8>),
    Metadata(Vec<u8>),
}

impl RawJsonRowStreamer {
    pub fn new(stream: Decoder, rows_attrib: impl Into<String>) -> Self {
        Self {
            stream,
            rows_attrib: rows_attrib.into(),
            attribs: HashMap::new(),
            state: RowStreamState::Start,
        }
    }

    async fn begin(&mut self) -> HttpxResult<()> {
        if self.state != RowStreamState::Start {
            return Err(Error::new_message_error(
                "unexpected parsing state during begin",
            ));
        }

        let first = self.stream.token().await?;

        if first != Token::Delim('{') {
            return Err(Error::new_message_error(
                "expected an opening brace for the result",
            ));
        }

        loop {
            if !self.stream.more().await {
                self.state = RowStreamState::End;
                break;
            }

            let token = self.stream.token().await?;
            let key = match token {
                Token::String(s) => s,
                _ => {
                    return Err(Error::new_message_error(
                        "expected a string key in the result",
                    ));
                }
            };

            if key == self.rows_attrib.as_str() {
                match self.stream.token().await? {
                    Token::Delim('[') => {}
                    Token::Value(v) => {
                        if v == b"null" {
                            continue;
                        }

                        return Err(Error::new_message_error(
                            "expected an opening bracket for the rows",
                        ));
                    }
                    _ => {
                        return Err(Error::new_message_error(
                            "expected an opening bracket for the rows",
                        ));
                    }
                }

                if self.stream.more().await {
                    self.state = RowStreamState::Rows;
                    break;
                }

                // No rows at all; consume the closing bracket and read the
                // rest of the metadata.
                match self.stream.token().await? {
                    Token::Delim(']') => {}
                    _ => {
                        return Err(Error::new_message_error(
                            "expected a closing bracket for the rows",
                        ));
                    }
                }

                self.state = RowStreamState::PostRows;
                break;
            }

            let value = self.stream.decode().await?;
            let value = serde_json::from_slice(&value)
                .map_err(|e| Error::new_message_error(format!("failed to parse value: {e}")))?;

            self.attribs.insert(key, value);
        }

        Ok(())
    }

    pub async fn has_more_rows(&mut self) -> bool {
        if self.state != RowStreamState::Rows {
            return false;
        }

        self.stream.more().await
    }

    /// Reads everything up to the first row and returns the metadata seen so
    /// far, serialized back to JSON.
    pub async fn read_prelude(&mut self) -> HttpxResult<Vec<u8>> {
        self.begin().await?;
        serde_json::to_vec(&self.attribs)
            .map_err(|e| Error::new_message_error(format!("failed to encode prelude: {e}")))
    }

    pub async fn next(&mut self) -> Option<HttpxResult<RawJsonRowItem>> {
        loop {
            match self.state {
                RowStreamState::Start => {
                    if let Err(e) = self.begin().await {
                        return Some(Err(e));
                    }
                    continue;
                }
                RowStreamState::End => return None,
                RowStreamState::PostRows => {
                    let token = match self.stream.token().await {
                        Ok(t) => t,
                        Err(e) => return Some(Err(e)),
                    };

                    let key = match token {
                        Token::String(s) => s,
                        Token::Delim('}') => {
                            self.state = RowStreamState::End;

                            let metadata =
                                match serde_json::to_vec(&self.attribs).map_err(|e| {
                                    Error::new_message_error(format!(
                                        "failed to encode metadata: {e}"
                                    ))
                                }) {
                                    Ok(m) => m,
                                    Err(e) => return Some(Err(e)),
                                };

                            return Some(Ok(RawJsonRowItem::Metadata(metadata)));
                        }
                        _ => {
                            return Some(Err(Error::new_message_error(
                                "expected a string key in the result",
                            )));
                        }
                    };

                    let value = match self.stream.decode().await {
                        Ok(v) => v,
                        Err(e) => return Some(Err(e)),
                    };

                    let value = match serde_json::from_slice::<Value>(&value) {
                        Ok(v) => v,
                        Err(e) => {
                            return Some(Err(Error::new_message_error(format!(
                                "failed to parse value: {e}"
                            ))))
                        }
                    };

                    self.attribs.insert(key, value);
                    continue;
                }
                RowStreamState::Rows => {
                    let row = match self.stream.decode().await {
                        Ok(v) => v,
                        Err(e) => return Some(Err(e)),
                    };

                    if !self.stream.more().await {
                        match self.stream.token().await {
                            Ok(Token::Delim(']')) => {}
                            Ok(_) => {
                                return Some(Err(Error::new_message_error(
                                    "expected a closing bracket for the rows",
                                )));
                            }
                            Err(e) => return Some(Err(e)),
                        }

                        self.state = RowStreamState::PostRows;
                    }

                    return Some(Ok(RawJsonRowItem::Row(row)));
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = HttpxResult<RawJsonRowItem>> {
        stream::unfold(self, |mut streamer| async move {
            streamer.next().await.map(|row| (row, streamer))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream as fstream;

    fn streamer_for(body: &'static [u8], rows_attrib: &str) -> RawJsonRowStreamer {
        let chunks: Vec<reqwest::Result<Bytes>> = body
            .chunks(7)
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        RawJsonRowStreamer::new(Decoder::new(fstream::iter(chunks)), rows_attrib)
    }

    #[tokio::test]
    async fn streams_rows_between_metadata() {
        let body = br#"{
            "requestID": "1234",
            "results": [ {"a": 1}, {"a": 2}, {"a": 3} ],
            "status": "success",
            "metrics": { "resultCount": 3 }
        }"#;

        let mut streamer = streamer_for(body, "results");

        let prelude = streamer.read_prelude().await.unwrap();
        let prelude: Value = serde_json::from_slice(&prelude).unwrap();
        assert_eq!(prelude["requestID"], "1234");

        let mut rows = vec![];
        let mut metadata = None;
        while let Some(item) = streamer.next().await {
            match item.unwrap() {
                RawJsonRowItem::Row(row) => rows.push(row),
                RawJsonRowItem::Metadata(meta) => metadata = Some(meta),
            }
        }

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], br#"{"a": 1}"#.to_vec());

        let metadata: Value = serde_json::from_slice(&metadata.unwrap()).unwrap();
        assert_eq!(metadata["status"], "success");
        assert_eq!(metadata["metrics"]["resultCount"], 3);
        // The prelude attributes carry into the trailing metadata blob.
        assert_eq!(metadata["requestID"], "1234");
    }

    #[tokio::test]
    async fn handles_empty_rows() {
        let body = br#"{ "results": [], "status": "success" }"#;

        let mut streamer = streamer_for(body, "results");
        streamer.read_prelude().await.unwrap();

        let mut rows = 0;
        let mut saw_metadata = false;
        while let Some(item) = streamer.next().await {
            match item.unwrap() {
                RawJsonRowItem::Row(_) => rows += 1,
                RawJsonRowItem::Metadata(_) => saw_metadata = true,
            }
        }

        assert_eq!(rows, 0);
        assert!(saw_metadata);
    }

    #[tokio::test]
    async fn rejects_non_object_results() {
        let body = br#"[1, 2, 3]"#;

        let mut streamer = streamer_for(body, "results");
        assert!(streamer.read_prelude().await.is_err());
    }
}
