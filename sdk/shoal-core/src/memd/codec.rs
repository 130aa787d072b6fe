use tokio_util::bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::memd::error::Error;
use crate::memd::magic::Magic;
use crate::memd::opcode::OpCode;
use crate::memd::packet::{RequestPacket, ResponsePacket};
use crate::memd::status::Status;

pub const HEADER_SIZE: usize = 24;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct KeyValueCodec(());

impl Decoder for KeyValueCodec {
    type Item = ResponsePacket;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let total_body_len = match buf[8..12].try_into() {
            Ok(v) => u32::from_be_bytes(v),
            Err(e) => {
                return Err(Error::new_protocol_error("failed to read total body length").with(e));
            }
        } as usize;

        if buf.len() < HEADER_SIZE + total_body_len {
            buf.reserve(HEADER_SIZE + total_body_len);
            return Ok(None);
        }

        let mut slice = buf.split_to(HEADER_SIZE + total_body_len);

        let magic = Magic::try_from(slice.get_u8())?;
        let flexible = magic.is_extended();

        let opcode = OpCode::try_from(slice.get_u8())?;

        let flexible_extras_len = if flexible { slice.get_u8() } else { 0 } as usize;

        let key_len = if flexible {
            slice.get_u8() as u16
        } else {
            slice.get_u16()
        } as usize;

        let extras_len = slice.get_u8() as usize;
        let datatype = slice.get_u8();
        let status = Status::from(slice.get_u16());

        let total_body_len = slice.get_u32() as usize;
        let opaque = slice.get_u32();
        let cas = slice.get_u64();

        if key_len + extras_len + flexible_extras_len > total_body_len {
            return Err(Error::new_protocol_error(
                "response header lengths exceed total body length",
            ));
        }
        let body_len = total_body_len - key_len - extras_len - flexible_extras_len;

        let mut packet = ResponsePacket::new(magic, opcode, datatype, status, opaque);
        packet.cas = Some(cas);

        let mut payload_pos = 0;

        if flexible_extras_len > 0 {
            packet.framing_extras =
                Some(slice[payload_pos..(payload_pos + flexible_extras_len)].to_vec());
            payload_pos += flexible_extras_len;
        }

        if extras_len > 0 {
            packet.extras = Some(slice[payload_pos..(payload_pos + extras_len)].to_vec());
            payload_pos += extras_len;
        }

        if key_len > 0 {
            packet.key = Some(slice[payload_pos..(payload_pos + key_len)].to_vec());
            payload_pos += key_len;
        }

        if body_len > 0 {
            packet.value = Some(slice[payload_pos..].to_vec());
        }

        Ok(Some(packet))
    }
}

impl Encoder<RequestPacket<'_>> for KeyValueCodec {
    type Error = Error;

    fn encode(&mut self, item: RequestPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let key_size = item.key.map_or(0, |k| k.len());
        let extras_size = item.extras.map_or(0, |e| e.len());
        let framing_extras_size = item.framing_extras.map_or(0, |e| e.len());
        let body_size = item.value.map_or(0, |b| b.len());

        let total_body_size = key_size + extras_size + framing_extras_size + body_size;

        dst.reserve(HEADER_SIZE + total_body_size);

        dst.put_u8(item.magic.into());
        dst.put_u8(item.op_code.into());
        if item.framing_extras.is_some() {
            if key_size > u8::MAX as usize {
                return Err(Error::new_invalid_argument_error(
                    "key size too large",
                    "key".to_string(),
                ));
            }

            if framing_extras_size > u8::MAX as usize {
                return Err(Error::new_invalid_argument_error(
                    "frame extras too large",
                    "frame extras".to_string(),
                ));
            }

            dst.put_u8(framing_extras_size as u8);
            dst.put_u8(key_size as u8);
        } else {
            if key_size > u16::MAX as usize {
                return Err(Error::new_invalid_argument_error(
                    "key size too large",
                    "key".to_string(),
                ));
            }

            dst.put_u16(key_size as u16);
        }
        dst.put_u8(extras_size as u8);
        dst.put_u8(item.datatype);
        dst.put_u16(item.vbucket_id.unwrap_or_default());
        dst.put_u32(total_body_size as u32);
        dst.put_u32(item.opaque.unwrap_or_default());
        dst.put_u64(item.cas.unwrap_or_default());

        if let Some(framing_extras) = item.framing_extras {
            dst.extend_from_slice(framing_extras);
        }

        if let Some(extras) = item.extras {
            dst.extend_from_slice(extras);
        }

        if let Some(key) = item.key {
            dst.extend_from_slice(key);
        }

        if let Some(body) = item.value {
            dst.extend_from_slice(body);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_basic_request_header() {
        let mut codec = KeyValueCodec::default();
        let mut buf = BytesMut::new();

        let packet = RequestPacket::new(Magic::Req, OpCode::Get, 0)
            .vbucket_id(12)
            .key(b"hello")
            .opaque(7);

        codec.encode(packet, &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + 5);
        assert_eq!(buf[0], 0x80);
        assert_eq!(buf[1], 0x00);
        // key length
        assert_eq!(&buf[2..4], &[0x00, 0x05]);
        // vbucket
        assert_eq!(&buf[6..8], &[0x00, 0x0c]);
        // total body length
        assert_eq!(&buf[8..12], &[0x00, 0x00, 0x00, 0x05]);
        // opaque
        assert_eq!(&buf[12..16], &[0x00, 0x00, 0x00, 0x07]);
        assert_eq!(&buf[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn decodes_response_with_extras_and_value() {
        let mut codec = KeyValueCodec::default();
        let mut buf = BytesMut::new();

        // A Get response: 4 bytes of flags extras followed by a 3 byte value.
        buf.put_u8(0x81);
        buf.put_u8(0x00);
        buf.put_u16(0); // key len
        buf.put_u8(4); // extras len
        buf.put_u8(0); // datatype
        buf.put_u16(0); // status
        buf.put_u32(7); // total body
        buf.put_u32(99); // opaque
        buf.put_u64(0x1234); // cas
        buf.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        buf.extend_from_slice(b"abc");

        let packet = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(packet.magic, Magic::Res);
        assert_eq!(packet.op_code, OpCode::Get);
        assert_eq!(packet.status, Status::Success);
        assert_eq!(packet.opaque, 99);
        assert_eq!(packet.cas, Some(0x1234));
        assert_eq!(packet.extras, Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(packet.value, Some(b"abc".to_vec()));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_full_frame() {
        let mut codec = KeyValueCodec::default();
        let mut buf = BytesMut::new();

        buf.put_u8(0x81);
        buf.put_u8(0x00);
        buf.put_u16(0);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u16(0);
        buf.put_u32(10); // total body claims 10 bytes
        buf.put_u32(1);
        buf.put_u64(0);
        buf.extend_from_slice(b"abc"); // only 3 present

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"defghij");
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.value, Some(b"abcdefghij".to_vec()));
    }

    #[test]
    fn decode_rejects_inconsistent_lengths() {
        let mut codec = KeyValueCodec::default();
        let mut buf = BytesMut::new();

        buf.put_u8(0x81);
        buf.put_u8(0x00);
        buf.put_u16(6); // key len larger than body
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u16(0);
        buf.put_u32(3);
        buf.put_u32(1);
        buf.put_u64(0);
        buf.extend_from_slice(b"abc");

        assert!(codec.decode(&mut buf).is_err());
    }
}
