use byteorder::{BigEndian, ByteOrder};

use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::error::{Error, ServerError, ServerErrorKind};
use crate::memd::magic::Magic;
use crate::memd::op_auth_saslauto::OpSASLAutoEncoder;
use crate::memd::op_auth_saslbyname::OpSASLAuthByNameEncoder;
use crate::memd::op_auth_saslplain::OpSASLPlainEncoder;
use crate::memd::op_auth_saslscram::OpSASLScramEncoder;
use crate::memd::op_bootstrap::OpBootstrapEncoder;
use crate::memd::opcode::OpCode;
use crate::memd::packet::{RequestPacket, ResponsePacket};
use crate::memd::pendingop::{ClientPendingOp, StandardPendingOp};
use crate::memd::request::{
    GetClusterConfigRequest, GetErrorMapRequest, HelloRequest, SASLAuthRequest,
    SASLListMechsRequest, SASLStepRequest, SelectBucketRequest,
};
use crate::memd::response::{
    GetClusterConfigResponse, GetErrorMapResponse, HelloResponse, SASLAuthResponse,
    SASLStepResponse, SelectBucketResponse,
};
use crate::memd::status::Status;

pub struct OpsCore {}

impl OpsCore {
    pub(crate) fn decode_error_context(
        resp: &ResponsePacket,
        kind: ServerErrorKind,
    ) -> ServerError {
        let mut base_cause = ServerError::new(kind, resp.op_code, resp.status, resp.opaque);

        if let Some(value) = &resp.value {
            if resp.status == Status::NotMyVbucket {
                base_cause = base_cause.with_config(value.to_vec());
            } else {
                base_cause = base_cause.with_context(value.to_vec());
            }
        }

        base_cause
    }

    pub(crate) fn decode_error(resp: &ResponsePacket) -> Error {
        let status = resp.status;
        let base_error_kind = match status {
            Status::NotMyVbucket => ServerErrorKind::NotMyVbucket,
            Status::TmpFail => ServerErrorKind::TmpFail,
            Status::Busy => ServerErrorKind::Busy,
            Status::NoBucket => ServerErrorKind::NoBucket,
            Status::ConfigOnly => ServerErrorKind::ConfigOnly,
            Status::AccessError => ServerErrorKind::Access,
            Status::AuthError => ServerErrorKind::Auth {
                msg: "authentication failed".to_string(),
            },
            Status::CommandUnknown => ServerErrorKind::UnknownCommand,
            Status::NotSupported => ServerErrorKind::NotSupported,
            Status::InternalError => ServerErrorKind::InternalError,
            Status::InvalidArgs => {
                return Error::new_invalid_argument_error(
                    "the server rejected the request because one or more arguments were invalid",
                    None,
                )
                .with(Self::decode_error_context(
                    resp,
                    ServerErrorKind::InvalidArgs,
                ));
            }
            _ => ServerErrorKind::UnknownStatus { status },
        };

        Self::decode_error_context(resp, base_error_kind).into()
    }
}

impl OpBootstrapEncoder for OpsCore {
    async fn hello<D>(
        &self,
        dispatcher: &D,
        request: HelloRequest,
    ) -> Result<StandardPendingOp<HelloResponse>>
    where
        D: Dispatcher,
    {
        let mut features: Vec<u8> = Vec::with_capacity(request.requested_features.len() * 2);
        for feature in request.requested_features {
            let feature: u16 = feature.into();
            features.extend_from_slice(&feature.to_be_bytes());
        }

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::Hello, 0)
                    .key(&request.client_name)
                    .value(&features),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    async fn get_error_map<D>(
        &self,
        dispatcher: &D,
        request: GetErrorMapRequest,
    ) -> Result<StandardPendingOp<GetErrorMapResponse>>
    where
        D: Dispatcher,
    {
        let version = request.version.to_be_bytes();

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::GetErrorMap, 0).value(&version),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    async fn select_bucket<D>(
        &self,
        dispatcher: &D,
        request: SelectBucketRequest,
    ) -> Result<StandardPendingOp<SelectBucketResponse>>
    where
        D: Dispatcher,
    {
        let key = request.bucket_name.into_bytes();

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::SelectBucket, 0).key(&key),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    async fn get_cluster_config<D>(
        &self,
        dispatcher: &D,
        request: GetClusterConfigRequest,
    ) -> Result<StandardPendingOp<GetClusterConfigResponse>>
    where
        D: Dispatcher,
    {
        let mut extra_buf = [0; 16];
        let extras = if let Some(known_version) = request.known_version {
            BigEndian::write_u64(&mut extra_buf[0..8], known_version.rev_epoch as u64);
            BigEndian::write_u64(&mut extra_buf[8..16], known_version.rev_id as u64);

            Some(&extra_buf[..])
        } else {
            None
        };

        let mut packet = RequestPacket::new(Magic::Req, OpCode::GetClusterConfig, 0);
        if let Some(extras) = extras {
            packet = packet.extras(extras);
        }

        let op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(op))
    }
}

impl OpSASLPlainEncoder for OpsCore {
    async fn sasl_auth<D>(
        &self,
        dispatcher: &D,
        request: SASLAuthRequest,
    ) -> Result<StandardPendingOp<SASLAuthResponse>>
    where
        D: Dispatcher,
    {
        let key: Vec<u8> = request.auth_mechanism.into();

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::SASLAuth, 0)
                    .key(&key)
                    .value(&request.payload),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }
}

impl OpSASLAuthByNameEncoder for OpsCore {}

impl OpSASLAutoEncoder for OpsCore {
    async fn sasl_list_mechs<D>(
        &self,
        dispatcher: &D,
        _request: SASLListMechsRequest,
    ) -> Result<ClientPendingOp>
    where
        D: Dispatcher,
    {
        dispatcher
            .dispatch(RequestPacket::new(Magic::Req, OpCode::SASLListMechs, 0), None)
            .await
    }
}

impl OpSASLScramEncoder for OpsCore {
    async fn sasl_step<D>(
        &self,
        dispatcher: &D,
        request: SASLStepRequest,
    ) -> Result<StandardPendingOp<SASLStepResponse>>
    where
        D: Dispatcher,
    {
        let key: Vec<u8> = request.auth_mechanism.into();

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::SASLStep, 0)
                    .key(&key)
                    .value(&request.payload),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }
}
