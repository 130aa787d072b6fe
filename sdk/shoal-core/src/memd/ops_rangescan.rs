use byteorder::{BigEndian, ByteOrder};

use crate::memd::client::ResponseContext;
use crate::memd::datatype::DataTypeFlag;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::error::{ServerError, ServerErrorKind};
use crate::memd::magic::Magic;
use crate::memd::opcode::OpCode;
use crate::memd::ops_crud::OpsCrud;
use crate::memd::packet::RequestPacket;
use crate::memd::pendingop::{ClientPendingOp, StandardPendingOp};
use crate::memd::rangescan::{parse_items, RangeScanItem};
use crate::memd::request::{
    RangeScanCancelRequest, RangeScanContinueRequest, RangeScanCreateRequest,
};
use crate::memd::response::{RangeScanCancelResponse, RangeScanCreateResponse};
use crate::memd::status::Status;

pub struct OpsRangeScan {}

impl OpsRangeScan {
    pub async fn range_scan_create<D>(
        &self,
        dispatcher: &D,
        request: RangeScanCreateRequest,
    ) -> Result<StandardPendingOp<RangeScanCreateResponse>>
    where
        D: Dispatcher,
    {
        let body = request.body.to_json()?;

        let packet =
            RequestPacket::new(Magic::Req, OpCode::RangeScanCreate, DataTypeFlag::Json.into())
                .vbucket_id(request.vbucket_id)
                .value(&body);

        let op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(op))
    }

    pub async fn range_scan_continue<D>(
        &self,
        dispatcher: &D,
        request: RangeScanContinueRequest,
        ids_only: bool,
    ) -> Result<RangeScanContinuePendingOp>
    where
        D: Dispatcher,
    {
        let mut extras = [0; 28];
        extras[0..16].copy_from_slice(&request.scan_uuid);
        BigEndian::write_u32(&mut extras[16..20], request.limits.item_limit);
        BigEndian::write_u32(&mut extras[20..24], request.limits.time_limit_ms);
        BigEndian::write_u32(&mut extras[24..28], request.limits.byte_limit);

        let packet = RequestPacket::new(Magic::Req, OpCode::RangeScanContinue, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&extras);

        // One continue produces a stream of responses under a single opaque,
        // so the handler must survive each delivery.
        let response_context = ResponseContext {
            is_persistent: true,
            ..Default::default()
        };

        let op = dispatcher.dispatch(packet, Some(response_context)).await?;

        Ok(RangeScanContinuePendingOp {
            wrapped: op,
            ids_only,
        })
    }

    pub async fn range_scan_cancel<D>(
        &self,
        dispatcher: &D,
        request: RangeScanCancelRequest,
    ) -> Result<StandardPendingOp<RangeScanCancelResponse>>
    where
        D: Dispatcher,
    {
        let packet = RequestPacket::new(Magic::Req, OpCode::RangeScanCancel, 0)
            .vbucket_id(request.vbucket_id)
            .extras(&request.scan_uuid);

        let op = dispatcher.dispatch(packet, None).await?;

        Ok(StandardPendingOp::new(op))
    }
}

/// The state of a continue after a server response: `Progressing` means more
/// responses follow within the same batch, `More` ends the batch with the
/// scan still open, `Complete` ends the scan.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RangeScanAction {
    Progressing,
    More,
    Complete,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RangeScanContinueEvent {
    pub action: RangeScanAction,
    pub items: Vec<RangeScanItem>,
}

pub struct RangeScanContinuePendingOp {
    wrapped: ClientPendingOp,
    ids_only: bool,
}

impl RangeScanContinuePendingOp {
    pub fn opaque(&self) -> u32 {
        self.wrapped.opaque()
    }

    pub async fn recv(&mut self) -> Result<RangeScanContinueEvent> {
        let resp = self.wrapped.recv().await?;
        let packet = resp.packet();

        let action = match packet.status {
            Status::Success => RangeScanAction::Progressing,
            Status::RangeScanMore => RangeScanAction::More,
            Status::RangeScanComplete => RangeScanAction::Complete,
            Status::RangeScanCancelled => {
                self.wrapped.finish();
                return Err(ServerError::new(
                    ServerErrorKind::RangeScanCancelled,
                    packet.op_code,
                    packet.status,
                    packet.opaque,
                )
                .into());
            }
            Status::KeyNotFound => {
                self.wrapped.finish();
                return Err(ServerError::new(
                    ServerErrorKind::KeyNotFound,
                    packet.op_code,
                    packet.status,
                    packet.opaque,
                )
                .into());
            }
            _ => {
                self.wrapped.finish();
                return Err(OpsCrud::decode_common_error(packet));
            }
        };

        if action != RangeScanAction::Progressing {
            self.wrapped.finish();
        }

        let items = match &packet.value {
            Some(value) => parse_items(value, self.ids_only)?,
            None => vec![],
        };

        Ok(RangeScanContinueEvent { action, items })
    }

    pub async fn cancel(&mut self, e: crate::memd::error::CancellationErrorKind) -> bool {
        self.wrapped.cancel(e).await
    }
}
