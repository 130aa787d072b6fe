use byteorder::{BigEndian, ByteOrder};
use std::time::Duration;

use crate::memd::client::ResponseContext;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::durability_level::DurabilityLevel;
use crate::memd::error::Result;
use crate::memd::error::{Error, ServerError, ServerErrorKind};
use crate::memd::ext_frame_code::ExtReqFrameCode;
use crate::memd::extframe;
use crate::memd::magic::Magic;
use crate::memd::opcode::OpCode;
use crate::memd::ops_core::OpsCore;
use crate::memd::packet::{RequestPacket, ResponsePacket};
use crate::memd::pendingop::StandardPendingOp;
use crate::memd::request::{
    AddRequest, AppendRequest, DecrementRequest, DeleteRequest, GetAndLockRequest,
    GetAndTouchRequest, GetMetaRequest, GetReplicaRequest, GetRequest, IncrementRequest,
    LookupInRequest, MutateInRequest, PrependRequest, ReplaceRequest, SetRequest, TouchRequest,
    UnlockRequest,
};
use crate::memd::response::{
    AddResponse, AppendResponse, DecrementResponse, DeleteResponse, GetAndLockResponse,
    GetAndTouchResponse, GetMetaResponse, GetReplicaResponse, GetResponse, IncrementResponse,
    LookupInResponse, MutateInResponse, PrependResponse, ReplaceResponse, SetResponse,
    TouchResponse, UnlockResponse,
};
use crate::memd::status::Status;
use crate::memd::subdoc::SubdocRequestInfo;

// The leb128 collection prefix adds at most five bytes to a key.
const KEY_BUF_LEN: usize = 255 + 5;

#[derive(Debug)]
pub struct OpsCrud {
    pub collections_enabled: bool,
    pub durability_enabled: bool,
    pub preserve_expiry_enabled: bool,
    pub ext_frames_enabled: bool,
}

impl OpsCrud {
    pub async fn get<D>(
        &self,
        dispatcher: &D,
        request: GetRequest<'_>,
    ) -> Result<StandardPendingOp<GetResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let packet = RequestPacket::new(Magic::Req, OpCode::Get, 0)
            .vbucket_id(request.vbucket_id)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn get_replica<D>(
        &self,
        dispatcher: &D,
        request: GetReplicaRequest<'_>,
    ) -> Result<StandardPendingOp<GetReplicaResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let packet = RequestPacket::new(Magic::Req, OpCode::GetReplica, 0)
            .vbucket_id(request.vbucket_id)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn get_meta<D>(
        &self,
        dispatcher: &D,
        request: GetMetaRequest<'_>,
    ) -> Result<StandardPendingOp<GetMetaResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        // Request the v2 response format so datatype is included in extras.
        let extras = [2];

        let packet = RequestPacket::new(Magic::Req, OpCode::GetMeta, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extras)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn set<D>(
        &self,
        dispatcher: &D,
        request: SetRequest<'_>,
    ) -> Result<StandardPendingOp<SetResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            request.preserve_expiry,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 8];
        BigEndian::write_u32(&mut extra_buf[0..4], request.flags);
        BigEndian::write_u32(&mut extra_buf[4..8], request.expiry.unwrap_or_default());

        let mut packet = RequestPacket::new(magic, OpCode::Set, request.datatype)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key)
            .value(request.value);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn add<D>(
        &self,
        dispatcher: &D,
        request: AddRequest<'_>,
    ) -> Result<StandardPendingOp<AddResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 8];
        BigEndian::write_u32(&mut extra_buf[0..4], request.flags);
        BigEndian::write_u32(&mut extra_buf[4..8], request.expiry.unwrap_or_default());

        let mut packet = RequestPacket::new(magic, OpCode::Add, request.datatype)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key)
            .value(request.value);
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn replace<D>(
        &self,
        dispatcher: &D,
        request: ReplaceRequest<'_>,
    ) -> Result<StandardPendingOp<ReplaceResponse>>
    where
        D: Dispatcher,
    {
        if request.expiry.is_some() && request.preserve_expiry.is_some() {
            return Err(Error::new_invalid_argument_error(
                "cannot specify expiry and preserve expiry together",
                None,
            ));
        }

        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            request.preserve_expiry,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 8];
        BigEndian::write_u32(&mut extra_buf[0..4], request.flags);
        BigEndian::write_u32(&mut extra_buf[4..8], request.expiry.unwrap_or_default());

        let mut packet = RequestPacket::new(magic, OpCode::Replace, request.datatype)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key)
            .value(request.value);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn delete<D>(
        &self,
        dispatcher: &D,
        request: DeleteRequest<'_>,
    ) -> Result<StandardPendingOp<DeleteResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut packet = RequestPacket::new(magic, OpCode::Delete, 0)
            .vbucket_id(request.vbucket_id)
            .key(key);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn touch<D>(
        &self,
        dispatcher: &D,
        request: TouchRequest<'_>,
    ) -> Result<StandardPendingOp<TouchResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 4];
        BigEndian::write_u32(&mut extra_buf, request.expiry);

        let packet = RequestPacket::new(Magic::Req, OpCode::Touch, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn get_and_touch<D>(
        &self,
        dispatcher: &D,
        request: GetAndTouchRequest<'_>,
    ) -> Result<StandardPendingOp<GetAndTouchResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 4];
        BigEndian::write_u32(&mut extra_buf, request.expiry);

        let packet = RequestPacket::new(Magic::Req, OpCode::GAT, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn get_and_lock<D>(
        &self,
        dispatcher: &D,
        request: GetAndLockRequest<'_>,
    ) -> Result<StandardPendingOp<GetAndLockResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 4];
        BigEndian::write_u32(&mut extra_buf, request.lock_time);

        let packet = RequestPacket::new(Magic::Req, OpCode::GetLocked, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn unlock<D>(
        &self,
        dispatcher: &D,
        request: UnlockRequest<'_>,
    ) -> Result<StandardPendingOp<UnlockResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let packet = RequestPacket::new(Magic::Req, OpCode::UnlockKey, 0)
            .vbucket_id(request.vbucket_id)
            .cas(request.cas)
            .key(key);

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn append<D>(
        &self,
        dispatcher: &D,
        request: AppendRequest<'_>,
    ) -> Result<StandardPendingOp<AppendResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut packet = RequestPacket::new(magic, OpCode::Append, request.datatype)
            .vbucket_id(request.vbucket_id)
            .key(key)
            .value(request.value);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn prepend<D>(
        &self,
        dispatcher: &D,
        request: PrependRequest<'_>,
    ) -> Result<StandardPendingOp<PrependResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut packet = RequestPacket::new(magic, OpCode::Prepend, request.datatype)
            .vbucket_id(request.vbucket_id)
            .key(key)
            .value(request.value);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    fn encode_counter_values(
        delta: Option<u64>,
        initial: Option<u64>,
        expiry: Option<u32>,
        buf: &mut [u8; 20],
    ) {
        BigEndian::write_u64(&mut buf[0..8], delta.unwrap_or_default());
        if let Some(initial) = initial {
            BigEndian::write_u64(&mut buf[8..16], initial);
            BigEndian::write_u32(&mut buf[16..20], expiry.unwrap_or_default());
        } else {
            // No initial value: an all-ones expiry tells the server not to
            // create missing documents.
            BigEndian::write_u64(&mut buf[8..16], 0);
            BigEndian::write_u32(&mut buf[16..20], 0xFFFFFFFF);
        }
    }

    pub async fn increment<D>(
        &self,
        dispatcher: &D,
        request: IncrementRequest<'_>,
    ) -> Result<StandardPendingOp<IncrementResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 20];
        Self::encode_counter_values(
            request.delta,
            request.initial,
            request.expiry,
            &mut extra_buf,
        );

        let mut packet = RequestPacket::new(magic, OpCode::Increment, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key);
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn decrement<D>(
        &self,
        dispatcher: &D,
        request: DecrementRequest<'_>,
    ) -> Result<StandardPendingOp<DecrementResponse>>
    where
        D: Dispatcher,
    {
        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            None,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut extra_buf = [0; 20];
        Self::encode_counter_values(
            request.delta,
            request.initial,
            request.expiry,
            &mut extra_buf,
        );

        let mut packet = RequestPacket::new(magic, OpCode::Decrement, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key);
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let pending_op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn lookup_in<D>(
        &self,
        dispatcher: &D,
        request: LookupInRequest<'_>,
    ) -> Result<StandardPendingOp<LookupInResponse>>
    where
        D: Dispatcher,
    {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut value_buf: Vec<u8> = Vec::new();
        for op in request.ops {
            value_buf.push(Into::<OpCode>::into(op.op).into());
            value_buf.push(op.flags.bits());
            value_buf.extend_from_slice(&(op.path.len() as u16).to_be_bytes());
            value_buf.extend_from_slice(op.path);
        }

        let mut extra_buf = Vec::with_capacity(1);
        if !request.flags.is_empty() {
            extra_buf.push(request.flags.bits());
        }

        let packet = RequestPacket::new(Magic::Req, OpCode::SubDocMultiLookup, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extra_buf)
            .key(key)
            .value(&value_buf);

        let response_context = ResponseContext {
            subdoc_info: Some(SubdocRequestInfo {
                flags: request.flags,
                op_count: request.ops.len() as u8,
            }),
            ..Default::default()
        };

        let pending_op = dispatcher.dispatch(packet, Some(response_context)).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub async fn mutate_in<D>(
        &self,
        dispatcher: &D,
        request: MutateInRequest<'_>,
    ) -> Result<StandardPendingOp<MutateInResponse>>
    where
        D: Dispatcher,
    {
        if request.expiry.is_some() && request.preserve_expiry.is_some() {
            return Err(Error::new_invalid_argument_error(
                "cannot specify expiry and preserve expiry together",
                None,
            ));
        }

        let mut ext_frame_buf: Vec<u8> = Vec::new();
        let magic = self.encode_req_ext_frames(
            request.durability_level,
            request.durability_level_timeout,
            request.preserve_expiry,
            &mut ext_frame_buf,
        )?;

        let buf = &mut [0; KEY_BUF_LEN];
        let key = self.encode_collection_and_key(request.collection_id, request.key, buf)?;

        let mut value_buf: Vec<u8> = Vec::new();
        for op in request.ops {
            value_buf.push(Into::<OpCode>::into(op.op).into());
            value_buf.push(op.flags.bits());
            value_buf.extend_from_slice(&(op.path.len() as u16).to_be_bytes());
            value_buf.extend_from_slice(&(op.value.len() as u32).to_be_bytes());
            value_buf.extend_from_slice(op.path);
            value_buf.extend_from_slice(op.value);
        }

        let mut extra_buf = [0; 5];
        BigEndian::write_u32(&mut extra_buf[0..4], request.expiry.unwrap_or_default());
        let extra_buf = if request.flags.is_empty() {
            &extra_buf[..4]
        } else {
            extra_buf[4] = request.flags.bits();
            &extra_buf[..]
        };

        let mut packet = RequestPacket::new(magic, OpCode::SubDocMultiMutation, 0)
            .vbucket_id(request.vbucket_id)
            .extras(extra_buf)
            .key(key)
            .value(&value_buf);
        if let Some(cas) = request.cas {
            packet = packet.cas(cas);
        }
        if !ext_frame_buf.is_empty() {
            packet = packet.framing_extras(&ext_frame_buf);
        }

        let response_context = ResponseContext {
            cas: request.cas,
            subdoc_info: Some(SubdocRequestInfo {
                flags: request.flags,
                op_count: request.ops.len() as u8,
            }),
            ..Default::default()
        };

        let pending_op = dispatcher.dispatch(packet, Some(response_context)).await?;

        Ok(StandardPendingOp::new(pending_op))
    }

    pub(crate) fn encode_collection_and_key<'a>(
        &self,
        collection_id: u32,
        key: &'a [u8],
        buf: &'a mut [u8],
    ) -> Result<&'a [u8]> {
        if !self.collections_enabled {
            if collection_id != 0 {
                return Err(Error::new_invalid_argument_error(
                    "collections not enabled",
                    "collection_id".to_string(),
                ));
            }

            return Ok(key);
        }

        let encoded_size = extframe::make_uleb128_32(collection_id, buf);
        if buf.len() < encoded_size + key.len() {
            return Err(Error::new_invalid_argument_error(
                "key too long",
                "key".to_string(),
            ));
        }
        buf[encoded_size..encoded_size + key.len()].copy_from_slice(key);
        Ok(&buf[0..key.len() + encoded_size])
    }

    fn encode_req_ext_frames(
        &self,
        durability_level: Option<DurabilityLevel>,
        durability_timeout: Option<Duration>,
        preserve_expiry: Option<bool>,
        buf: &mut Vec<u8>,
    ) -> Result<Magic> {
        if let Some(dura) = durability_level {
            if !self.durability_enabled {
                return Err(Error::new_invalid_argument_error(
                    "cannot use synchronous durability when it is not enabled",
                    "durability_level".to_string(),
                ));
            }

            let dura_buf = extframe::encode_durability_ext_frame(dura, durability_timeout)?;

            extframe::append_ext_frame(ExtReqFrameCode::Durability, &dura_buf, buf)?;
        } else if durability_timeout.is_some() {
            return Err(Error::new_invalid_argument_error(
                "cannot encode durability timeout without durability level",
                "durability_level_timeout".to_string(),
            ));
        }

        if preserve_expiry.is_some() {
            if !self.preserve_expiry_enabled {
                return Err(Error::new_invalid_argument_error(
                    "cannot use preserve expiry when it is not enabled",
                    "preserve_expiry".to_string(),
                ));
            }

            extframe::append_ext_frame(ExtReqFrameCode::PreserveTtl, &[], buf)?;
        }

        let magic = if !buf.is_empty() {
            if !self.ext_frames_enabled {
                return Err(Error::new_invalid_argument_error(
                    "cannot use framing extras when they are not enabled",
                    "ext_frames_enabled".to_string(),
                ));
            }

            Magic::ReqExt
        } else {
            Magic::Req
        };

        Ok(magic)
    }

    pub(crate) fn decode_common_mutation_status(resp: &ResponsePacket) -> Result<()> {
        let kind = match resp.status {
            Status::DurabilityInvalidLevel => ServerErrorKind::DurabilityInvalid,
            Status::DurabilityImpossible => ServerErrorKind::DurabilityImpossible,
            Status::SyncWriteAmbiguous => ServerErrorKind::SyncWriteAmbiguous,
            Status::SyncWriteInProgress => ServerErrorKind::SyncWriteInProgress,
            Status::SyncWriteRecommitInProgress => ServerErrorKind::SyncWriteRecommitInProgress,
            _ => {
                return Self::decode_common_status(resp);
            }
        };

        let mut err = ServerError::new(kind, resp.op_code, resp.status, resp.opaque);
        if let Some(value) = &resp.value {
            err = err.with_context(value.clone());
        }

        Err(err.into())
    }

    pub(crate) fn decode_common_status(resp: &ResponsePacket) -> Result<()> {
        let kind = match resp.status {
            Status::UnknownCollection => ServerErrorKind::UnknownCollectionID,
            Status::AccessError => ServerErrorKind::Access,
            Status::NoBucket => ServerErrorKind::NoBucket,
            _ => {
                return Ok(());
            }
        };

        let mut err = ServerError::new(kind, resp.op_code, resp.status, resp.opaque);
        if let Some(value) = &resp.value {
            err = err.with_context(value.clone());
        }

        Err(err.into())
    }

    pub(crate) fn decode_common_mutation_error(resp: &ResponsePacket) -> Error {
        if let Err(e) = Self::decode_common_mutation_status(resp) {
            return e;
        }

        OpsCore::decode_error(resp)
    }

    pub(crate) fn decode_common_error(resp: &ResponsePacket) -> Error {
        if let Err(e) = Self::decode_common_status(resp) {
            return e;
        }

        OpsCore::decode_error(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crud(collections: bool) -> OpsCrud {
        OpsCrud {
            collections_enabled: collections,
            durability_enabled: true,
            preserve_expiry_enabled: true,
            ext_frames_enabled: true,
        }
    }

    #[test]
    fn key_encoding_prefixes_collection_id() {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = crud(true)
            .encode_collection_and_key(200, b"doc-1", buf)
            .unwrap();

        assert_eq!(key, &[0xc8, 0x01, b'd', b'o', b'c', b'-', b'1']);
    }

    #[test]
    fn key_encoding_without_collections() {
        let buf = &mut [0; KEY_BUF_LEN];
        let key = crud(false)
            .encode_collection_and_key(0, b"doc-1", buf)
            .unwrap();
        assert_eq!(key, b"doc-1");

        let buf = &mut [0; KEY_BUF_LEN];
        assert!(crud(false)
            .encode_collection_and_key(9, b"doc-1", buf)
            .is_err());
    }

    #[test]
    fn durability_requires_feature() {
        let ops = OpsCrud {
            collections_enabled: true,
            durability_enabled: false,
            preserve_expiry_enabled: false,
            ext_frames_enabled: false,
        };

        let mut buf = Vec::new();
        assert!(ops
            .encode_req_ext_frames(
                Some(crate::memd::durability_level::DurabilityLevel::MAJORITY),
                None,
                None,
                &mut buf,
            )
            .is_err());
    }

    #[test]
    fn ext_frames_switch_magic() {
        let ops = crud(true);

        let mut buf = Vec::new();
        let magic = ops
            .encode_req_ext_frames(None, None, None, &mut buf)
            .unwrap();
        assert_eq!(magic, Magic::Req);

        let mut buf = Vec::new();
        let magic = ops
            .encode_req_ext_frames(
                Some(crate::memd::durability_level::DurabilityLevel::MAJORITY),
                None,
                None,
                &mut buf,
            )
            .unwrap();
        assert_eq!(magic, Magic::ReqExt);
        assert_eq!(buf, vec![0x11, 0x01]);
    }
}
