use byteorder::{BigEndian, ByteOrder};

use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::magic::Magic;
use crate::memd::opcode::OpCode;
use crate::memd::packet::RequestPacket;
use crate::memd::pendingop::StandardPendingOp;
use crate::memd::request::{
    GetCollectionIdRequest, GetCollectionsManifestRequest, NoopRequest, ObserveSeqNoRequest,
};
use crate::memd::response::{
    GetCollectionIdResponse, GetCollectionsManifestResponse, NoopResponse, ObserveSeqNoResponse,
};

pub struct OpsUtil {}

impl OpsUtil {
    pub async fn get_collection_id<D>(
        &self,
        dispatcher: &D,
        request: GetCollectionIdRequest<'_>,
    ) -> Result<StandardPendingOp<GetCollectionIdResponse>>
    where
        D: Dispatcher,
    {
        let path = format!("{}.{}", request.scope_name, request.collection_name);

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::GetCollectionId, 0)
                    .value(path.as_bytes()),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    pub async fn get_collections_manifest<D>(
        &self,
        dispatcher: &D,
        _request: GetCollectionsManifestRequest,
    ) -> Result<StandardPendingOp<GetCollectionsManifestResponse>>
    where
        D: Dispatcher,
    {
        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::GetCollectionsManifest, 0),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    pub async fn observe_seq_no<D>(
        &self,
        dispatcher: &D,
        request: ObserveSeqNoRequest,
    ) -> Result<StandardPendingOp<ObserveSeqNoResponse>>
    where
        D: Dispatcher,
    {
        let mut value = [0; 8];
        BigEndian::write_u64(&mut value, request.vbucket_uuid);

        let op = dispatcher
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::ObserveSeqNo, 0)
                    .vbucket_id(request.vbucket_id)
                    .value(&value),
                None,
            )
            .await?;

        Ok(StandardPendingOp::new(op))
    }

    pub async fn noop<D>(
        &self,
        dispatcher: &D,
        _request: NoopRequest,
    ) -> Result<StandardPendingOp<NoopResponse>>
    where
        D: Dispatcher,
    {
        let op = dispatcher
            .dispatch(RequestPacket::new(Magic::Req, OpCode::Noop, 0), None)
            .await?;

        Ok(StandardPendingOp::new(op))
    }
}
