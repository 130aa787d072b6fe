use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, ErrorKind, Result};

// Common flags: the upper byte carries the value format.
const FORMAT_JSON: u32 = 2 << 24;
const FORMAT_BINARY: u32 = 3 << 24;

/// Encodes values into (bytes, flags) pairs and back. The flags travel with
/// the document so any client can tell how to interpret the bytes.
pub trait Transcoder: Send + Sync {
    fn encode_raw(&self, value: &[u8]) -> Result<(Vec<u8>, u32)>;
    fn decode_raw(&self, value: &[u8], flags: u32) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTranscoder {}

impl JsonTranscoder {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<(Vec<u8>, u32)> {
        let bytes = serde_json::to_vec(value)?;
        Ok((bytes, FORMAT_JSON))
    }

    pub fn decode<T: DeserializeOwned>(&self, value: &[u8], flags: u32) -> Result<T> {
        if flags != 0 && (flags & (0xFF << 24)) != FORMAT_JSON {
            return Err(Error::new(ErrorKind::ParsingFailure));
        }

        serde_json::from_slice(value).map_err(|_e| Error::new(ErrorKind::ParsingFailure))
    }
}

impl Transcoder for JsonTranscoder {
    fn encode_raw(&self, value: &[u8]) -> Result<(Vec<u8>, u32)> {
        Ok((value.to_vec(), FORMAT_JSON))
    }

    fn decode_raw(&self, value: &[u8], _flags: u32) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RawBinaryTranscoder {}

impl Transcoder for RawBinaryTranscoder {
    fn encode_raw(&self, value: &[u8]) -> Result<(Vec<u8>, u32)> {
        Ok((value.to_vec(), FORMAT_BINARY))
    }

    fn decode_raw(&self, value: &[u8], _flags: u32) -> Result<Vec<u8>> {
        Ok(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let transcoder = JsonTranscoder::default();
        let (bytes, flags) = transcoder.encode(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(flags, FORMAT_JSON);

        let value: serde_json::Value = transcoder.decode(&bytes, flags).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn json_decode_rejects_binary_flags() {
        let transcoder = JsonTranscoder::default();
        assert!(transcoder
            .decode::<serde_json::Value>(b"\x01\x02", FORMAT_BINARY)
            .is_err());
    }

    #[test]
    fn binary_round_trip() {
        let transcoder = RawBinaryTranscoder::default();
        let (bytes, flags) = transcoder.encode_raw(&[1, 2, 3]).unwrap();
        assert_eq!(flags, FORMAT_BINARY);
        assert_eq!(transcoder.decode_raw(&bytes, flags).unwrap(), vec![1, 2, 3]);
    }
}
