use std::pin::Pin;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::httpx::error::{Error, Result as HttpxResult};

/// A pull-based tokenizer over a streaming JSON body. It hands back one
/// structural token or one complete raw value at a time without ever
/// buffering the whole response, which is what lets query rows flow while
/// the body is still arriving.
pub struct Decoder {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buf: BytesMut,
    eof: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // One of '{', '}', '[' or ']'.
    Delim(char),
    // A JSON string, unescaped.
    String(String),
    // A scalar (number, bool or null) as its raw bytes.
    Value(Vec<u8>),
}

impl Decoder {
    pub fn new(stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
            buf: BytesMut::new(),
            eof: false,
        }
    }

    async fn fill(&mut self) -> HttpxResult<bool> {
        if self.eof {
            return Ok(false);
        }

        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.buf.extend_from_slice(&chunk);
                Ok(true)
            }
            Some(Err(e)) => Err(Error::new_message_error(format!(
                "failed to read body chunk: {e}"
            ))),
            None => {
                self.eof = true;
                Ok(false)
            }
        }
    }

    async fn peek(&mut self) -> HttpxResult<Option<u8>> {
        while self.buf.is_empty() {
            if !self.fill().await? {
                return Ok(None);
            }
        }

        Ok(Some(self.buf[0]))
    }

    async fn peek_at(&mut self, idx: usize) -> HttpxResult<Option<u8>> {
        while self.buf.len() <= idx {
            if !self.fill().await? {
                return Ok(None);
            }
        }

        Ok(Some(self.buf[idx]))
    }

    // Skips whitespace plus the ':' and ',' separators; like Go's streaming
    // decoder, element boundaries are reported through more() instead.
    async fn skip_separators(&mut self) -> HttpxResult<Option<u8>> {
        loop {
            let b = match self.peek().await? {
                Some(b) => b,
                None => return Ok(None),
            };

            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b':' | b',' => {
                    self.buf.advance(1);
                }
                _ => return Ok(Some(b)),
            }
        }
    }

    /// Reports whether another element follows in the array or object being
    /// walked (i.e. the next token is not a closing delimiter).
    pub async fn more(&mut self) -> bool {
        let b = match self.skip_separators().await {
            Ok(Some(b)) => b,
            _ => return false,
        };

        b != b']' && b != b'}'
    }

    /// Reads the next token: a delimiter, a string, or a scalar value.
    pub async fn token(&mut self) -> HttpxResult<Token> {
        let b = self
            .skip_separators()
            .await?
            .ok_or_else(|| Error::new_message_error("unexpected end of body"))?;

        match b {
            b'{' | b'}' | b'[' | b']' => {
                self.buf.advance(1);
                Ok(Token::Delim(b as char))
            }
            b'"' => {
                let raw = self.read_string_raw().await?;
                let value: String = serde_json::from_slice(&raw).map_err(|e| {
                    Error::new_message_error(format!("invalid string in body: {e}"))
                })?;
                Ok(Token::String(value))
            }
            _ => Ok(Token::Value(self.read_scalar_raw().await?)),
        }
    }

    /// Reads one complete JSON value (of any kind) as raw bytes.
    pub async fn decode(&mut self) -> HttpxResult<Vec<u8>> {
        let b = self
            .skip_separators()
            .await?
            .ok_or_else(|| Error::new_message_error("unexpected end of body"))?;

        match b {
            b'{' | b'[' => self.read_nested_raw().await,
            b'"' => self.read_string_raw().await,
            _ => self.read_scalar_raw().await,
        }
    }

    async fn read_string_raw(&mut self) -> HttpxResult<Vec<u8>> {
        // Scan for the closing quote, honouring escapes.
        let mut idx = 1;
        let mut escaped = false;
        loop {
            let b = self
                .peek_at(idx)
                .await?
                .ok_or_else(|| Error::new_message_error("unterminated string in body"))?;

            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                break;
            }

            idx += 1;
        }

        let raw = self.buf.split_to(idx + 1);
        Ok(raw.to_vec())
    }

    async fn read_scalar_raw(&mut self) -> HttpxResult<Vec<u8>> {
        let mut idx = 0;
        loop {
            let b = match self.peek_at(idx).await? {
                Some(b) => b,
                None => break,
            };

            match b {
                b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r' => break,
                _ => idx += 1,
            }
        }

        if idx == 0 {
            return Err(Error::new_message_error("empty value in body"));
        }

        let raw = self.buf.split_to(idx);
        Ok(raw.to_vec())
    }

    async fn read_nested_raw(&mut self) -> HttpxResult<Vec<u8>> {
        let mut idx = 0;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let b = self
                .peek_at(idx)
                .await?
                .ok_or_else(|| Error::new_message_error("unterminated value in body"))?;

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
            } else {
                match b {
                    b'"' => in_string = true,
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            let raw = self.buf.split_to(idx + 1);
                            return Ok(raw.to_vec());
                        }
                    }
                    _ => {}
                }
            }

            idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn decoder_for(body: &'static [u8], chunk_size: usize) -> Decoder {
        let chunks: Vec<reqwest::Result<Bytes>> = body
            .chunks(chunk_size)
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Decoder::new(stream::iter(chunks))
    }

    #[tokio::test]
    async fn tokenizes_object_keys_and_values() {
        // Chunked one byte at a time to exercise refilling mid-token.
        let mut dec = decoder_for(br#"{"a": 1, "b": "two"}"#, 1);

        assert_eq!(dec.token().await.unwrap(), Token::Delim('{'));
        assert!(dec.more().await);
        assert_eq!(dec.token().await.unwrap(), Token::String("a".to_string()));
        assert_eq!(dec.token().await.unwrap(), Token::Value(b"1".to_vec()));
        assert!(dec.more().await);
        assert_eq!(dec.token().await.unwrap(), Token::String("b".to_string()));
        assert_eq!(dec.token().await.unwrap(), Token::String("two".to_string()));
        assert!(!dec.more().await);
        assert_eq!(dec.token().await.unwrap(), Token::Delim('}'));
    }

    #[tokio::test]
    async fn decodes_nested_values_raw() {
        let mut dec = decoder_for(br#"[{"x": [1, 2, "]"]}, "tail"]"#, 3);

        assert_eq!(dec.token().await.unwrap(), Token::Delim('['));
        let value = dec.decode().await.unwrap();
        assert_eq!(value, br#"{"x": [1, 2, "]"]}"#.to_vec());
        assert!(dec.more().await);
        let value = dec.decode().await.unwrap();
        assert_eq!(value, br#""tail""#.to_vec());
        assert!(!dec.more().await);
    }

    #[tokio::test]
    async fn handles_escaped_strings() {
        let mut dec = decoder_for(br#""a\"b\\c""#, 2);

        assert_eq!(
            dec.token().await.unwrap(),
            Token::String("a\"b\\c".to_string())
        );
    }

    #[tokio::test]
    async fn reports_truncated_bodies() {
        let mut dec = decoder_for(br#"{"a": [1, 2"#, 4);

        assert_eq!(dec.token().await.unwrap(), Token::Delim('{'));
        assert_eq!(dec.token().await.unwrap(), Token::String("a".to_string()));
        assert!(dec.decode().await.is_err());
    }
}
