use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::io::Cursor;

use crate::memd::error;
use crate::memd::error::Error;
use crate::memd::extframe::read_uleb128_32;

/// The key space selector for a scan. A prefix scan is expressed as a range
/// from the prefix (inclusive) to the prefix with 0xFF appended (inclusive).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ScanType {
    Range {
        from_key_inclusive: Vec<u8>,
        to_key_exclusive: Vec<u8>,
    },
    Prefix {
        prefix: Vec<u8>,
    },
    Sampling {
        sample_size: u64,
        seed: Option<u64>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotRequirements {
    pub partition_uuid: u64,
    pub sequence_number: u64,
    pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RangeScanCreateBody {
    pub collection_id: u32,
    pub ids_only: bool,
    pub scan_type: Option<ScanType>,
    pub snapshot_requirements: Option<SnapshotRequirements>,
}

#[derive(Serialize)]
struct CreateBodyJsonRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    excl_end: Option<String>,
}

#[derive(Serialize)]
struct CreateBodyJsonSampling {
    samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct CreateBodyJsonSnapshot {
    vb_uuid: String,
    seqno: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct CreateBodyJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    key_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<CreateBodyJsonRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampling: Option<CreateBodyJsonSampling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_requirements: Option<CreateBodyJsonSnapshot>,
}

impl RangeScanCreateBody {
    pub fn to_json(&self) -> error::Result<Vec<u8>> {
        let (range, sampling) = match &self.scan_type {
            Some(ScanType::Range {
                from_key_inclusive,
                to_key_exclusive,
            }) => (
                Some(CreateBodyJsonRange {
                    start: Some(BASE64_STANDARD.encode(from_key_inclusive)),
                    end: None,
                    excl_end: Some(BASE64_STANDARD.encode(to_key_exclusive)),
                }),
                None,
            ),
            Some(ScanType::Prefix { prefix }) => {
                let mut end = prefix.clone();
                end.push(0xff);
                (
                    Some(CreateBodyJsonRange {
                        start: Some(BASE64_STANDARD.encode(prefix)),
                        end: Some(BASE64_STANDARD.encode(&end)),
                        excl_end: None,
                    }),
                    None,
                )
            }
            Some(ScanType::Sampling { sample_size, seed }) => (
                None,
                Some(CreateBodyJsonSampling {
                    samples: *sample_size,
                    seed: *seed,
                }),
            ),
            None => {
                return Err(Error::new_invalid_argument_error(
                    "scan type must be specified",
                    "scan_type".to_string(),
                ));
            }
        };

        let body = CreateBodyJson {
            collection: if self.collection_id != 0 {
                Some(format!("{:x}", self.collection_id))
            } else {
                None
            },
            key_only: self.ids_only,
            range,
            sampling,
            snapshot_requirements: self.snapshot_requirements.as_ref().map(|reqs| {
                CreateBodyJsonSnapshot {
                    vb_uuid: reqs.partition_uuid.to_string(),
                    seqno: reqs.sequence_number,
                    timeout_ms: reqs.timeout_ms,
                }
            }),
        };

        serde_json::to_vec(&body)
            .map_err(|e| Error::new_message_error(format!("failed to encode scan body: {e}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct RangeScanContinueLimits {
    pub item_limit: u32,
    pub byte_limit: u32,
    pub time_limit_ms: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeScanItemBody {
    pub flags: u32,
    pub expiry: u32,
    pub seq_no: u64,
    pub cas: u64,
    pub datatype: u8,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeScanItem {
    pub key: Vec<u8>,
    pub body: Option<RangeScanItemBody>,
}

// Continue payloads pack items back to back: a leb128-prefixed key when the
// scan is ids-only, otherwise a 25 byte metadata block (flags, expiry, seqno,
// cas, datatype) followed by leb128-prefixed key and value.
pub(crate) fn parse_items(payload: &[u8], ids_only: bool) -> error::Result<Vec<RangeScanItem>> {
    let mut items = vec![];
    let mut pos = 0;

    while pos < payload.len() {
        if ids_only {
            let (key, consumed) = read_length_prefixed(&payload[pos..])?;
            pos += consumed;

            items.push(RangeScanItem { key, body: None });
            continue;
        }

        if payload.len() - pos < 25 {
            return Err(Error::new_protocol_error("truncated scan item metadata"));
        }

        let mut cursor = Cursor::new(&payload[pos..pos + 25]);
        let flags = cursor.read_u32::<BigEndian>()?;
        let expiry = cursor.read_u32::<BigEndian>()?;
        let seq_no = cursor.read_u64::<BigEndian>()?;
        let cas = cursor.read_u64::<BigEndian>()?;
        let datatype = cursor.read_u8()?;
        pos += 25;

        let (key, consumed) = read_length_prefixed(&payload[pos..])?;
        pos += consumed;
        let (value, consumed) = read_length_prefixed(&payload[pos..])?;
        pos += consumed;

        items.push(RangeScanItem {
            key,
            body: Some(RangeScanItemBody {
                flags,
                expiry,
                seq_no,
                cas,
                datatype,
                value,
            }),
        });
    }

    Ok(items)
}

fn read_length_prefixed(buf: &[u8]) -> error::Result<(Vec<u8>, usize)> {
    let (len, len_size) = read_uleb128_32(buf)?;
    let len = len as usize;

    if buf.len() < len_size + len {
        return Err(Error::new_protocol_error("truncated scan item payload"));
    }

    Ok((buf[len_size..len_size + len].to_vec(), len_size + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_encodes_range() {
        let body = RangeScanCreateBody {
            collection_id: 0,
            ids_only: false,
            scan_type: Some(ScanType::Range {
                from_key_inclusive: b"aaa".to_vec(),
                to_key_exclusive: b"zzz".to_vec(),
            }),
            snapshot_requirements: Some(SnapshotRequirements {
                partition_uuid: 1234,
                sequence_number: 56,
                timeout_ms: None,
            }),
        };

        let json: serde_json::Value = serde_json::from_slice(&body.to_json().unwrap()).unwrap();
        assert_eq!(json["range"]["start"], "YWFh");
        assert_eq!(json["range"]["excl_end"], "enp6");
        assert_eq!(json["snapshot_requirements"]["vb_uuid"], "1234");
        assert_eq!(json["snapshot_requirements"]["seqno"], 56);
        assert!(json.get("collection").is_none());
        assert!(json.get("key_only").is_none());
    }

    #[test]
    fn create_body_encodes_prefix_as_inclusive_range() {
        let body = RangeScanCreateBody {
            collection_id: 0x1f2,
            ids_only: true,
            scan_type: Some(ScanType::Prefix {
                prefix: b"keys".to_vec(),
            }),
            snapshot_requirements: None,
        };

        let json: serde_json::Value = serde_json::from_slice(&body.to_json().unwrap()).unwrap();
        assert_eq!(json["collection"], "1f2");
        assert_eq!(json["key_only"], true);
        assert_eq!(json["range"]["start"], "a2V5cw==");
        // "keys" with 0xff appended.
        assert_eq!(json["range"]["end"], "a2V5c/8=");
        assert!(json["range"].get("excl_end").is_none());
    }

    #[test]
    fn create_body_encodes_sampling() {
        let body = RangeScanCreateBody {
            collection_id: 0,
            ids_only: false,
            scan_type: Some(ScanType::Sampling {
                sample_size: 10,
                seed: Some(42),
            }),
            snapshot_requirements: None,
        };

        let json: serde_json::Value = serde_json::from_slice(&body.to_json().unwrap()).unwrap();
        assert_eq!(json["sampling"]["samples"], 10);
        assert_eq!(json["sampling"]["seed"], 42);
        assert!(json.get("range").is_none());
    }

    #[test]
    fn parses_ids_only_items() {
        let mut payload = vec![];
        payload.push(3);
        payload.extend_from_slice(b"foo");
        payload.push(5);
        payload.extend_from_slice(b"fives");

        let items = parse_items(&payload, true).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, b"foo");
        assert!(items[0].body.is_none());
        assert_eq!(items[1].key, b"fives");
    }

    #[test]
    fn parses_document_items() {
        let mut payload = vec![];
        payload.extend_from_slice(&0x0102u32.to_be_bytes()); // flags
        payload.extend_from_slice(&0u32.to_be_bytes()); // expiry
        payload.extend_from_slice(&77u64.to_be_bytes()); // seqno
        payload.extend_from_slice(&999u64.to_be_bytes()); // cas
        payload.push(0); // datatype
        payload.push(3);
        payload.extend_from_slice(b"doc");
        payload.push(4);
        payload.extend_from_slice(b"body");

        let items = parse_items(&payload, false).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, b"doc");

        let body = items[0].body.as_ref().unwrap();
        assert_eq!(body.flags, 0x0102);
        assert_eq!(body.seq_no, 77);
        assert_eq!(body.cas, 999);
        assert_eq!(body.value, b"body");
    }

    #[test]
    fn rejects_truncated_items() {
        assert!(parse_items(&[5, b'a'], true).is_err());
        assert!(parse_items(&[0, 0, 0], false).is_err());
    }
}
