use crate::memd::durability_level::{DurabilityLevel, DurabilityLevelSettings};
use crate::memd::error;
use crate::memd::error::Error;
use crate::memd::ext_frame_code::{ExtReqFrameCode, ExtResFrameCode};
use std::time::Duration;

pub(crate) fn decode_res_ext_frames(buf: &[u8]) -> error::Result<Option<Duration>> {
    let mut server_duration = None;

    let mut remaining = buf;
    while !remaining.is_empty() {
        let (frame_code, frame_body, consumed) = decode_ext_frame(remaining)?;
        if frame_code == ExtResFrameCode::ServerDuration {
            server_duration = Some(decode_server_duration_ext_frame(frame_body)?);
        }
        remaining = &remaining[consumed..];
    }

    Ok(server_duration)
}

pub fn decode_ext_frame(buf: &[u8]) -> error::Result<(ExtResFrameCode, &[u8], usize)> {
    if buf.is_empty() {
        return Err(Error::new_protocol_error(
            "empty value buffer when decoding ext frame",
        ));
    }

    let mut buf_pos = 0;

    let frame_header = buf[buf_pos];
    let mut u_frame_code = ((frame_header & 0xF0) >> 4) as u16;
    let mut frame_len = (frame_header & 0x0F) as usize;
    buf_pos += 1;

    if u_frame_code == 15 {
        if buf.len() < buf_pos + 1 {
            return Err(Error::new_protocol_error(
                "unexpected eof decoding ext frame",
            ));
        }

        u_frame_code = 15 + buf[buf_pos] as u16;
        buf_pos += 1;
    }

    if frame_len == 15 {
        if buf.len() < buf_pos + 1 {
            return Err(Error::new_protocol_error(
                "unexpected eof decoding ext frame",
            ));
        }

        frame_len = 15 + buf[buf_pos] as usize;
        buf_pos += 1;
    }

    if buf.len() < buf_pos + frame_len {
        return Err(Error::new_protocol_error(
            "unexpected eof decoding ext frame",
        ));
    }

    let frame_body = &buf[buf_pos..buf_pos + frame_len];
    buf_pos += frame_len;

    Ok((ExtResFrameCode::from(u_frame_code), frame_body, buf_pos))
}

pub fn append_ext_frame(
    frame_code: ExtReqFrameCode,
    frame_body: &[u8],
    buf: &mut Vec<u8>,
) -> error::Result<()> {
    let frame_len = frame_body.len();
    let hdr_byte_pos = buf.len();
    buf.push(0);

    let u_frame_code: u16 = frame_code.into();
    if u_frame_code < 15 {
        buf[hdr_byte_pos] |= ((u_frame_code & 0x0F) << 4) as u8;
    } else {
        if u_frame_code - 15 >= 256 {
            return Err(Error::new_invalid_argument_error(
                "ext frame code too large to encode",
                "ext frame".to_string(),
            ));
        }
        buf[hdr_byte_pos] |= 0xF0;
        buf.push((u_frame_code - 15) as u8);
    }

    if frame_len < 15 {
        buf[hdr_byte_pos] |= (frame_len as u8) & 0x0F;
    } else {
        if frame_len - 15 >= 256 {
            return Err(Error::new_invalid_argument_error(
                "ext frame len too large to encode",
                "ext frame".to_string(),
            ));
        }
        buf[hdr_byte_pos] |= 0x0F;
        buf.push((frame_len - 15) as u8);
    }

    buf.extend_from_slice(frame_body);

    Ok(())
}

pub fn make_uleb128_32(value: u32, buf: &mut [u8]) -> usize {
    let mut remaining = value;
    let mut count = 0;
    loop {
        let mut c: u8 = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining != 0 {
            c |= 0x80;
        }

        buf[count] = c;
        count += 1;
        if c & 0x80 == 0 {
            break;
        }
    }

    count
}

pub fn read_uleb128_32(buf: &[u8]) -> error::Result<(u32, usize)> {
    let mut value: u64 = 0;
    for (i, b) in buf.iter().enumerate() {
        value |= ((b & 0x7f) as u64) << (i * 7);
        if value > u32::MAX as u64 {
            return Err(Error::new_protocol_error("uleb128 value overflows u32"));
        }
        if b & 0x80 == 0 {
            return Ok((value as u32, i + 1));
        }
    }

    Err(Error::new_protocol_error(
        "unexpected eof decoding uleb128 value",
    ))
}

pub fn encode_durability_ext_frame(
    level: DurabilityLevel,
    timeout: Option<Duration>,
) -> error::Result<Vec<u8>> {
    let timeout = match timeout {
        Some(t) => t,
        None => return Ok(vec![level.into()]),
    };

    let mut timeout_millis = timeout.as_millis();
    if timeout_millis > 65535 {
        return Err(Error::new_invalid_argument_error(
            "cannot encode durability timeout greater than 65535 milliseconds",
            "durability_level_timeout".to_string(),
        ));
    }

    if timeout_millis == 0 {
        timeout_millis = 1;
    }

    Ok(vec![
        level.into(),
        (timeout_millis >> 8) as u8,
        timeout_millis as u8,
    ])
}

pub(crate) fn decode_server_duration_ext_frame(data: &[u8]) -> error::Result<Duration> {
    if data.len() != 2 {
        return Err(Error::new_protocol_error(
            "invalid server duration ext frame length",
        ));
    }

    let dura_enc = ((data[0] as u32) << 8) | (data[1] as u32);
    let dura_micros = ((dura_enc as f32).powf(1.74) / 2.0).round();

    Ok(Duration::from_micros(dura_micros as u64))
}

pub(crate) fn decode_durability_level_ext_frame(
    data: &[u8],
) -> error::Result<DurabilityLevelSettings> {
    if data.len() == 1 {
        return Ok(DurabilityLevelSettings::new(DurabilityLevel::from(data[0])));
    } else if data.len() == 3 {
        let durability = DurabilityLevel::from(data[0]);
        let timeout_millis = ((data[1] as u32) << 8) | (data[2] as u32);

        return Ok(DurabilityLevelSettings::new_with_timeout(
            durability,
            Duration::from_millis(timeout_millis as u64),
        ));
    }

    Err(Error::new_message_error(
        "invalid durability ext frame length",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memd::durability_level::DurabilityLevel;
    use std::time::Duration;

    fn check_durability(l: DurabilityLevel, d: impl Into<Option<Duration>>, expected: &[u8]) {
        let d = d.into();
        let data = encode_durability_ext_frame(l, d).expect("encode failed");
        assert_eq!(data, expected);

        let settings = decode_durability_level_ext_frame(&data).expect("decode failed");
        assert_eq!(settings.durability_level, l);

        let decoded_timeout = settings.timeout.unwrap_or(Duration::from_millis(0));
        if let Some(d) = d {
            let diff = (decoded_timeout.as_millis() as i64 - d.as_millis() as i64).abs();
            assert!(diff <= 1, "expected under 1ms difference, got {diff}");
        } else {
            assert_eq!(0, decoded_timeout.as_millis() as i64);
        }
    }

    #[test]
    fn durability_frame_majority_no_duration() {
        check_durability(DurabilityLevel::MAJORITY, None, &[0x01]);
    }

    #[test]
    fn durability_frame_persist_active_no_duration() {
        check_durability(DurabilityLevel::MAJORITY_AND_PERSIST_ACTIVE, None, &[0x02]);
    }

    #[test]
    fn durability_frame_majority_duration_0() {
        check_durability(
            DurabilityLevel::MAJORITY,
            Duration::from_millis(0),
            &[0x01, 0x00, 0x01],
        );
    }

    #[test]
    fn durability_frame_majority_duration_max() {
        check_durability(
            DurabilityLevel::MAJORITY,
            Duration::from_millis(65535),
            &[0x01, 0xff, 0xff],
        );
    }

    #[test]
    fn append_preserve_expiry() {
        let mut buf = Vec::new();
        append_ext_frame(ExtReqFrameCode::PreserveTtl, &[], &mut buf).unwrap();

        assert_eq!(&buf, &[0x50]);
    }

    #[test]
    fn append_durability_level_no_timeout() {
        let mut buf = Vec::new();
        append_ext_frame(ExtReqFrameCode::Durability, &[0x01], &mut buf).unwrap();

        assert_eq!(&buf, &[0x11, 0x01]);
    }

    #[test]
    fn append_durability_level_timeout() {
        let mut buf = Vec::new();
        append_ext_frame(ExtReqFrameCode::Durability, &[0x01, 0x00, 0x01], &mut buf).unwrap();

        assert_eq!(&buf, &[0x13, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn uleb128_round_trips() {
        let mut buf = [0u8; 5];
        for (value, encoded) in [
            (0u32, vec![0x00u8]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (200, vec![0xc8, 0x01]),
            (0x1234, vec![0xb4, 0x24]),
            (u32::MAX, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
        ] {
            let len = make_uleb128_32(value, &mut buf);
            assert_eq!(&buf[..len], encoded.as_slice(), "encoding {value}");

            let (decoded, read) = read_uleb128_32(&buf[..len]).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(read, len);
        }
    }

    #[test]
    fn uleb128_rejects_truncated_input() {
        assert!(read_uleb128_32(&[0x80]).is_err());
        assert!(read_uleb128_32(&[]).is_err());
    }

    #[test]
    fn decodes_server_duration_frame() {
        let (code, body, consumed) = decode_ext_frame(&[0x02, 0x00, 0x01]).unwrap();
        assert_eq!(code, ExtResFrameCode::ServerDuration);
        assert_eq!(body, &[0x00, 0x01]);
        assert_eq!(consumed, 3);
    }
}
