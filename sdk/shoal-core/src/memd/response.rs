use std::io::Cursor;
use std::time::Duration;

use byteorder::{BigEndian, ReadBytesExt};

use crate::memd::auth_mechanism::AuthMechanism;
use crate::memd::client_response::ClientResponse;
use crate::memd::error::{
    Error, ServerError, ServerErrorKind, SubdocError, SubdocErrorKind,
};
use crate::memd::extframe::decode_res_ext_frames;
use crate::memd::hello_feature::HelloFeature;
use crate::memd::ops_core::OpsCore;
use crate::memd::ops_crud::OpsCrud;
use crate::memd::packet::ResponsePacket;
use crate::memd::status::Status;
use crate::memd::subdoc::SubDocResult;

pub trait TryFromClientResponse: Sized {
    fn try_from(resp: ClientResponse) -> Result<Self, Error>;
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HelloResponse {
    pub enabled_features: Vec<HelloFeature>,
}

impl TryFromClientResponse for HelloResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        let mut features: Vec<HelloFeature> = Vec::new();
        if let Some(value) = &packet.value {
            if value.len() % 2 != 0 {
                return Err(Error::new_protocol_error("invalid hello features length"));
            }

            let mut cursor = Cursor::new(value);
            while let Ok(code) = cursor.read_u16::<BigEndian>() {
                features.push(HelloFeature::from(code));
            }
        }

        Ok(HelloResponse {
            enabled_features: features,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GetErrorMapResponse {
    pub error_map: Vec<u8>,
}

impl TryFromClientResponse for GetErrorMapResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(GetErrorMapResponse {
            error_map: packet.value.clone().unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SelectBucketResponse {}

impl TryFromClientResponse for SelectBucketResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;
        if status != Status::Success {
            if status == Status::AccessError || status == Status::KeyNotFound {
                return Err(ServerError::new(
                    ServerErrorKind::UnknownBucketName,
                    packet.op_code,
                    status,
                    packet.opaque,
                )
                .into());
            }
            return Err(OpsCore::decode_error(packet));
        }

        Ok(SelectBucketResponse {})
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLAuthResponse {
    pub needs_more_steps: bool,
    pub payload: Vec<u8>,
}

impl TryFromClientResponse for SASLAuthResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;
        if status == Status::AuthContinue {
            return Ok(SASLAuthResponse {
                needs_more_steps: true,
                payload: packet.value.clone().unwrap_or_default(),
            });
        }

        if status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(SASLAuthResponse {
            needs_more_steps: false,
            payload: packet.value.clone().unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLStepResponse {
    pub needs_more_steps: bool,
    pub payload: Vec<u8>,
}

impl TryFromClientResponse for SASLStepResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(SASLStepResponse {
            needs_more_steps: false,
            payload: packet.value.clone().unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLListMechsResponse {
    pub available_mechs: Vec<AuthMechanism>,
}

impl TryFromClientResponse for SASLListMechsResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;
        if status != Status::Success {
            if status == Status::KeyNotFound {
                // KeyNotFound here means the node knows the bucket but has not
                // received its configuration yet; treated as transient.
                return Err(ServerError::new(
                    ServerErrorKind::ConfigNotSet,
                    packet.op_code,
                    status,
                    packet.opaque,
                )
                .into());
            }
            return Err(OpsCore::decode_error(packet));
        }

        let value = packet.value.clone().unwrap_or_default();
        let mechs_list_string = String::from_utf8(value).map_err(|e| {
            Error::new_protocol_error("failed to parse authentication mechanism list").with(e)
        })?;

        let mut mechs_list = Vec::new();
        for item in mechs_list_string.split(' ') {
            if let Ok(mech) = AuthMechanism::try_from(item) {
                mechs_list.push(mech);
            }
        }

        Ok(SASLListMechsResponse {
            available_mechs: mechs_list,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GetClusterConfigResponse {
    pub config: Vec<u8>,
}

impl TryFromClientResponse for GetClusterConfigResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(GetClusterConfigResponse {
            config: packet.value.clone().unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BootstrapResult {
    pub hello: Option<HelloResponse>,
    pub error_map: Option<GetErrorMapResponse>,
    pub cluster_config: Option<GetClusterConfigResponse>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MutationToken {
    pub vbuuid: u64,
    pub seqno: u64,
}

impl TryFrom<&Vec<u8>> for MutationToken {
    type Error = Error;

    fn try_from(value: &Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() != 16 {
            return Err(Error::new_protocol_error("bad extras length"));
        }

        let (vbuuid_bytes, seqno_bytes) = value.split_at(size_of::<u64>());
        let vbuuid = u64::from_be_bytes(vbuuid_bytes.try_into().unwrap());
        let seqno = u64::from_be_bytes(seqno_bytes.try_into().unwrap());

        Ok(MutationToken { vbuuid, seqno })
    }
}

fn parse_flags(extras: &Option<Vec<u8>>) -> Result<u32, Error> {
    if let Some(extras) = extras {
        if extras.len() != 4 {
            return Err(Error::new_protocol_error("bad extras length reading flags"));
        }

        Ok(u32::from_be_bytes(extras.as_slice().try_into().unwrap()))
    } else {
        Err(Error::new_protocol_error("no extras in response"))
    }
}

fn parse_server_duration(packet: &ResponsePacket) -> Result<Option<Duration>, Error> {
    if let Some(f) = &packet.framing_extras {
        decode_res_ext_frames(f)
    } else {
        Ok(None)
    }
}

fn parse_mutation_token(packet: &ResponsePacket) -> Result<Option<MutationToken>, Error> {
    if let Some(extras) = &packet.extras {
        Ok(Some(MutationToken::try_from(extras)?))
    } else {
        Ok(None)
    }
}

macro_rules! mutation_response {
    ($name:ident, { $($extra_status:pat => $extra_kind:expr),* $(,)? }) => {
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name {
            pub cas: u64,
            pub mutation_token: Option<MutationToken>,
            pub server_duration: Option<Duration>,
        }

        impl TryFromClientResponse for $name {
            fn try_from(resp: ClientResponse) -> Result<Self, Error> {
                let packet = resp.packet();
                let status = packet.status;

                let kind = match status {
                    Status::Success => None,
                    $($extra_status => Some($extra_kind),)*
                    _ => {
                        return Err(OpsCrud::decode_common_mutation_error(packet));
                    }
                };

                if let Some(kind) = kind {
                    return Err(
                        ServerError::new(kind, packet.op_code, status, packet.opaque).into()
                    );
                }

                Ok($name {
                    cas: packet.cas.unwrap_or_default(),
                    mutation_token: parse_mutation_token(packet)?,
                    server_duration: parse_server_duration(packet)?,
                })
            }
        }
    };
}

mutation_response!(SetResponse, {
    Status::TooBig => ServerErrorKind::TooBig,
    Status::Locked => ServerErrorKind::Locked,
    Status::KeyExists => ServerErrorKind::CasMismatch,
});

mutation_response!(AddResponse, {
    Status::TooBig => ServerErrorKind::TooBig,
    Status::KeyExists => ServerErrorKind::KeyExists,
});

mutation_response!(ReplaceResponse, {
    Status::TooBig => ServerErrorKind::TooBig,
    Status::Locked => ServerErrorKind::Locked,
    Status::KeyExists => ServerErrorKind::CasMismatch,
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
});

mutation_response!(DeleteResponse, {
    Status::Locked => ServerErrorKind::Locked,
    Status::KeyExists => ServerErrorKind::CasMismatch,
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
});

mutation_response!(AppendResponse, {
    Status::TooBig => ServerErrorKind::TooBig,
    Status::Locked => ServerErrorKind::Locked,
    Status::KeyExists => ServerErrorKind::CasMismatch,
    Status::NotStored => ServerErrorKind::NotStored,
});

mutation_response!(PrependResponse, {
    Status::TooBig => ServerErrorKind::TooBig,
    Status::Locked => ServerErrorKind::Locked,
    Status::KeyExists => ServerErrorKind::CasMismatch,
    Status::NotStored => ServerErrorKind::NotStored,
});

macro_rules! document_response {
    ($name:ident, { $($extra_status:pat => $extra_kind:expr),* $(,)? }) => {
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name {
            pub cas: u64,
            pub flags: u32,
            pub value: Vec<u8>,
            pub datatype: u8,
            pub server_duration: Option<Duration>,
        }

        impl TryFromClientResponse for $name {
            fn try_from(resp: ClientResponse) -> Result<Self, Error> {
                let packet = resp.packet();
                let status = packet.status;

                let kind = match status {
                    Status::Success => None,
                    $($extra_status => Some($extra_kind),)*
                    _ => {
                        return Err(OpsCrud::decode_common_error(packet));
                    }
                };

                if let Some(kind) = kind {
                    return Err(
                        ServerError::new(kind, packet.op_code, status, packet.opaque).into()
                    );
                }

                Ok($name {
                    cas: packet.cas.unwrap_or_default(),
                    flags: parse_flags(&packet.extras)?,
                    value: packet.value.clone().unwrap_or_default(),
                    datatype: packet.datatype,
                    server_duration: parse_server_duration(packet)?,
                })
            }
        }
    };
}

document_response!(GetResponse, {
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
});

document_response!(GetReplicaResponse, {
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
});

document_response!(GetAndTouchResponse, {
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
    Status::Locked => ServerErrorKind::Locked,
});

document_response!(GetAndLockResponse, {
    Status::KeyNotFound => ServerErrorKind::KeyNotFound,
    Status::Locked => ServerErrorKind::Locked,
});

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GetMetaResponse {
    pub cas: u64,
    pub flags: u32,
    pub datatype: u8,
    pub expiry: u32,
    pub seq_no: u64,
    pub deleted: bool,
    pub server_duration: Option<Duration>,
}

impl TryFromClientResponse for GetMetaResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        if status == Status::KeyNotFound {
            return Err(ServerError::new(
                ServerErrorKind::KeyNotFound,
                packet.op_code,
                status,
                packet.opaque,
            )
            .into());
        } else if status != Status::Success {
            return Err(OpsCrud::decode_common_error(packet));
        }

        let extras = packet
            .extras
            .as_ref()
            .ok_or_else(|| Error::new_protocol_error("no extras in response"))?;
        if extras.len() != 21 {
            return Err(Error::new_protocol_error("bad extras length"));
        }

        let mut extras = Cursor::new(extras);
        let deleted = extras.read_u32::<BigEndian>()?;
        let flags = extras.read_u32::<BigEndian>()?;
        let expiry = extras.read_u32::<BigEndian>()?;
        let seq_no = extras.read_u64::<BigEndian>()?;
        let datatype = extras.read_u8()?;

        Ok(GetMetaResponse {
            cas: packet.cas.unwrap_or_default(),
            flags,
            datatype,
            expiry,
            seq_no,
            deleted: deleted != 0,
            server_duration: parse_server_duration(packet)?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UnlockResponse {
    pub server_duration: Option<Duration>,
}

impl TryFromClientResponse for UnlockResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        let kind = match status {
            Status::Success => None,
            Status::KeyNotFound => Some(ServerErrorKind::KeyNotFound),
            Status::KeyExists => Some(ServerErrorKind::CasMismatch),
            Status::Locked => Some(ServerErrorKind::Locked),
            _ => {
                return Err(OpsCrud::decode_common_error(packet));
            }
        };

        if let Some(kind) = kind {
            return Err(ServerError::new(kind, packet.op_code, status, packet.opaque).into());
        }

        Ok(UnlockResponse {
            server_duration: parse_server_duration(packet)?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TouchResponse {
    pub cas: u64,
    pub server_duration: Option<Duration>,
}

impl TryFromClientResponse for TouchResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        let kind = match status {
            Status::Success => None,
            Status::KeyNotFound => Some(ServerErrorKind::KeyNotFound),
            Status::Locked => Some(ServerErrorKind::Locked),
            _ => {
                return Err(OpsCrud::decode_common_error(packet));
            }
        };

        if let Some(kind) = kind {
            return Err(ServerError::new(kind, packet.op_code, status, packet.opaque).into());
        }

        Ok(TouchResponse {
            cas: packet.cas.unwrap_or_default(),
            server_duration: parse_server_duration(packet)?,
        })
    }
}

macro_rules! counter_response {
    ($name:ident) => {
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name {
            pub cas: u64,
            pub value: u64,
            pub mutation_token: Option<MutationToken>,
            pub server_duration: Option<Duration>,
        }

        impl TryFromClientResponse for $name {
            fn try_from(resp: ClientResponse) -> Result<Self, Error> {
                let packet = resp.packet();
                let status = packet.status;

                let kind = match status {
                    Status::Success => None,
                    Status::KeyNotFound => Some(ServerErrorKind::KeyNotFound),
                    Status::Locked => Some(ServerErrorKind::Locked),
                    Status::DeltaBadVal => Some(ServerErrorKind::DeltaBadVal),
                    _ => {
                        return Err(OpsCrud::decode_common_mutation_error(packet));
                    }
                };

                if let Some(kind) = kind {
                    return Err(
                        ServerError::new(kind, packet.op_code, status, packet.opaque).into()
                    );
                }

                let value = packet.value.clone().unwrap_or_default();
                if value.len() != 8 {
                    return Err(Error::new_protocol_error("bad counter value length"));
                }
                let value = u64::from_be_bytes(value.as_slice().try_into().unwrap());

                Ok($name {
                    cas: packet.cas.unwrap_or_default(),
                    value,
                    mutation_token: parse_mutation_token(packet)?,
                    server_duration: parse_server_duration(packet)?,
                })
            }
        }
    };
}

counter_response!(IncrementResponse);
counter_response!(DecrementResponse);

fn decode_subdoc_error_kind(status: Status) -> Option<SubdocErrorKind> {
    let kind = match status {
        Status::SubDocPathNotFound => SubdocErrorKind::PathNotFound,
        Status::SubDocPathMismatch => SubdocErrorKind::PathMismatch,
        Status::SubDocPathInvalid => SubdocErrorKind::PathInvalid,
        Status::SubDocPathTooBig => SubdocErrorKind::PathTooBig,
        Status::SubDocDocTooDeep => SubdocErrorKind::DocTooDeep,
        Status::SubDocCantInsert => SubdocErrorKind::CantInsert,
        Status::SubDocNotJSON => SubdocErrorKind::NotJSON,
        Status::SubDocBadRange => SubdocErrorKind::BadRange,
        Status::SubDocBadDelta => SubdocErrorKind::BadDelta,
        Status::SubDocPathExists => SubdocErrorKind::PathExists,
        Status::SubDocValueTooDeep => SubdocErrorKind::ValueTooDeep,
        Status::SubDocInvalidCombo => SubdocErrorKind::InvalidCombo,
        Status::SubDocXattrInvalidFlagCombo => SubdocErrorKind::XattrInvalidFlagCombo,
        Status::SubDocXattrInvalidKeyCombo => SubdocErrorKind::XattrInvalidKeyCombo,
        Status::SubDocXattrUnknownMacro => SubdocErrorKind::XattrUnknownMacro,
        _ => return None,
    };

    Some(kind)
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LookupInResponse {
    pub cas: u64,
    pub ops: Vec<SubDocResult>,
    pub doc_is_deleted: bool,
    pub server_duration: Option<Duration>,
}

impl TryFromClientResponse for LookupInResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        let doc_is_deleted = status == Status::SubDocSuccessDeleted;
        if status != Status::Success
            && status != Status::SubDocSuccessDeleted
            && status != Status::SubDocMultiPathFailure
            && status != Status::SubDocMultiPathFailureDeleted
        {
            if status == Status::KeyNotFound {
                return Err(ServerError::new(
                    ServerErrorKind::KeyNotFound,
                    packet.op_code,
                    status,
                    packet.opaque,
                )
                .into());
            }
            if let Some(kind) = decode_subdoc_error_kind(status) {
                return Err(ServerError::new(
                    ServerErrorKind::Subdoc {
                        error: SubdocError::new(kind, None),
                    },
                    packet.op_code,
                    status,
                    packet.opaque,
                )
                .into());
            }
            return Err(OpsCrud::decode_common_error(packet));
        }

        let op_count = resp
            .response_context()
            .and_then(|c| c.subdoc_info)
            .map(|i| i.op_count)
            .unwrap_or_default() as usize;

        let value = resp.packet().value.clone().unwrap_or_default();
        let mut ops = Vec::with_capacity(op_count);
        let mut cursor = Cursor::new(value.as_slice());

        while (cursor.position() as usize) < value.len() {
            let op_status = Status::from(cursor.read_u16::<BigEndian>()?);
            let value_len = cursor.read_u32::<BigEndian>()? as usize;

            let pos = cursor.position() as usize;
            if value.len() < pos + value_len {
                return Err(Error::new_protocol_error("bad subdoc result length"));
            }

            let op_value = value[pos..pos + value_len].to_vec();
            cursor.set_position((pos + value_len) as u64);

            ops.push(SubDocResult {
                err: if op_status == Status::Success {
                    None
                } else {
                    Some(op_status)
                },
                value: if op_status == Status::Success {
                    Some(op_value)
                } else {
                    None
                },
            });
        }

        Ok(LookupInResponse {
            cas: resp.packet().cas.unwrap_or_default(),
            ops,
            doc_is_deleted,
            server_duration: parse_server_duration(resp.packet())?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MutateInResponse {
    pub cas: u64,
    pub ops: Vec<SubDocResult>,
    pub doc_is_deleted: bool,
    pub mutation_token: Option<MutationToken>,
    pub server_duration: Option<Duration>,
}

impl TryFromClientResponse for MutateInResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        if status == Status::SubDocMultiPathFailure
            || status == Status::SubDocMultiPathFailureDeleted
        {
            // The failing op index and status ride in the response value.
            let value = packet.value.clone().unwrap_or_default();
            if value.len() < 3 {
                return Err(Error::new_protocol_error("bad multi path failure length"));
            }

            let op_index = value[0];
            let op_status = Status::from(u16::from_be_bytes([value[1], value[2]]));
            let kind = decode_subdoc_error_kind(op_status)
                .unwrap_or(SubdocErrorKind::UnknownStatus { status: op_status });

            return Err(ServerError::new(
                ServerErrorKind::Subdoc {
                    error: SubdocError::new(kind, op_index),
                },
                packet.op_code,
                status,
                packet.opaque,
            )
            .into());
        }

        let doc_is_deleted = status == Status::SubDocSuccessDeleted;
        if status != Status::Success && status != Status::SubDocSuccessDeleted {
            let kind = match status {
                Status::KeyNotFound => Some(ServerErrorKind::KeyNotFound),
                Status::KeyExists => Some(ServerErrorKind::CasMismatch),
                Status::Locked => Some(ServerErrorKind::Locked),
                Status::TooBig => Some(ServerErrorKind::TooBig),
                _ => None,
            };
            if let Some(kind) = kind {
                return Err(ServerError::new(kind, packet.op_code, status, packet.opaque).into());
            }
            if let Some(kind) = decode_subdoc_error_kind(status) {
                return Err(ServerError::new(
                    ServerErrorKind::Subdoc {
                        error: SubdocError::new(kind, None),
                    },
                    packet.op_code,
                    status,
                    packet.opaque,
                )
                .into());
            }
            return Err(OpsCrud::decode_common_mutation_error(packet));
        }

        let op_count = resp
            .response_context()
            .and_then(|c| c.subdoc_info)
            .map(|i| i.op_count)
            .unwrap_or_default() as usize;

        let value = packet.value.clone().unwrap_or_default();
        let mut ops: Vec<SubDocResult> = (0..op_count)
            .map(|_| SubDocResult {
                err: None,
                value: None,
            })
            .collect();

        // Mutation responses only carry entries for ops which produced a value.
        let mut cursor = Cursor::new(value.as_slice());
        while (cursor.position() as usize) < value.len() {
            let op_index = cursor.read_u8()? as usize;
            let op_status = Status::from(cursor.read_u16::<BigEndian>()?);
            let value_len = cursor.read_u32::<BigEndian>()? as usize;

            let pos = cursor.position() as usize;
            if value.len() < pos + value_len {
                return Err(Error::new_protocol_error("bad subdoc result length"));
            }

            let op_value = value[pos..pos + value_len].to_vec();
            cursor.set_position((pos + value_len) as u64);

            if op_index >= ops.len() {
                return Err(Error::new_protocol_error("subdoc result index out of range"));
            }

            ops[op_index] = SubDocResult {
                err: if op_status == Status::Success {
                    None
                } else {
                    Some(op_status)
                },
                value: Some(op_value),
            };
        }

        Ok(MutateInResponse {
            cas: packet.cas.unwrap_or_default(),
            ops,
            doc_is_deleted,
            mutation_token: parse_mutation_token(packet)?,
            server_duration: parse_server_duration(packet)?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObserveSeqNoResponse {
    pub vbucket_id: u16,
    pub vbucket_uuid: u64,
    pub last_persisted_seq_no: u64,
    pub current_seq_no: u64,
    pub failed_over: bool,
}

impl TryFromClientResponse for ObserveSeqNoResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCrud::decode_common_error(packet));
        }

        let value = packet.value.clone().unwrap_or_default();
        let mut cursor = Cursor::new(value.as_slice());

        let format = cursor.read_u8()?;
        let vbucket_id = cursor.read_u16::<BigEndian>()?;
        let vbucket_uuid = cursor.read_u64::<BigEndian>()?;
        let last_persisted_seq_no = cursor.read_u64::<BigEndian>()?;
        let current_seq_no = cursor.read_u64::<BigEndian>()?;

        Ok(ObserveSeqNoResponse {
            vbucket_id,
            vbucket_uuid,
            last_persisted_seq_no,
            current_seq_no,
            failed_over: format == 1,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GetCollectionIdResponse {
    pub manifest_rev: u64,
    pub collection_id: u32,
}

impl TryFromClientResponse for GetCollectionIdResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        if status == Status::UnknownScope {
            return Err(ServerError::new(
                ServerErrorKind::UnknownScopeName,
                packet.op_code,
                status,
                packet.opaque,
            )
            .into());
        } else if status == Status::UnknownCollection {
            return Err(ServerError::new(
                ServerErrorKind::UnknownCollectionName,
                packet.op_code,
                status,
                packet.opaque,
            )
            .into());
        } else if status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        let extras = packet
            .extras
            .as_ref()
            .ok_or_else(|| Error::new_protocol_error("no extras in response"))?;
        if extras.len() != 12 {
            return Err(Error::new_protocol_error("bad extras length"));
        }

        let mut extras = Cursor::new(extras);
        let manifest_rev = extras.read_u64::<BigEndian>()?;
        let collection_id = extras.read_u32::<BigEndian>()?;

        Ok(GetCollectionIdResponse {
            manifest_rev,
            collection_id,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GetCollectionsManifestResponse {
    pub manifest: Vec<u8>,
}

impl TryFromClientResponse for GetCollectionsManifestResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(GetCollectionsManifestResponse {
            manifest: packet.value.clone().unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NoopResponse {}

impl TryFromClientResponse for NoopResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        if packet.status != Status::Success {
            return Err(OpsCore::decode_error(packet));
        }

        Ok(NoopResponse {})
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RangeScanCreateResponse {
    pub scan_uuid: [u8; 16],
}

impl TryFromClientResponse for RangeScanCreateResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        let kind = match status {
            Status::Success => None,
            // An empty range produces KeyNotFound at create time.
            Status::KeyNotFound => Some(ServerErrorKind::KeyNotFound),
            Status::RangeScanVbUuidNotEqual => Some(ServerErrorKind::RangeScanVbUuidNotEqual),
            _ => {
                return Err(OpsCrud::decode_common_error(packet));
            }
        };

        if let Some(kind) = kind {
            return Err(ServerError::new(kind, packet.op_code, status, packet.opaque).into());
        }

        let value = packet.value.clone().unwrap_or_default();
        let scan_uuid: [u8; 16] = value
            .as_slice()
            .try_into()
            .map_err(|_e| Error::new_protocol_error("bad scan uuid length"))?;

        Ok(RangeScanCreateResponse { scan_uuid })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RangeScanCancelResponse {}

impl TryFromClientResponse for RangeScanCancelResponse {
    fn try_from(resp: ClientResponse) -> Result<Self, Error> {
        let packet = resp.packet();
        let status = packet.status;

        if status == Status::KeyNotFound {
            return Err(ServerError::new(
                ServerErrorKind::KeyNotFound,
                packet.op_code,
                status,
                packet.opaque,
            )
            .into());
        } else if status != Status::Success {
            return Err(OpsCrud::decode_common_error(packet));
        }

        Ok(RangeScanCancelResponse {})
    }
}
