use std::future::Future;
use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::kvclient::{KvClient, StdKvClient};
use crate::memd;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::CancellationErrorKind;
use crate::memd::hello_feature::HelloFeature;
use crate::memd::op_bootstrap::{BootstrapOptions, OpBootstrap, OpBootstrapEncoder};
use crate::memd::ops_core::OpsCore;
use crate::memd::ops_crud::OpsCrud;
use crate::memd::ops_rangescan::{
    OpsRangeScan, RangeScanContinueEvent, RangeScanContinuePendingOp,
};
use crate::memd::ops_util::OpsUtil;
use crate::memd::request::{
    AddRequest, AppendRequest, DecrementRequest, DeleteRequest, GetAndLockRequest,
    GetAndTouchRequest, GetClusterConfigRequest, GetCollectionIdRequest,
    GetCollectionsManifestRequest, GetMetaRequest, GetReplicaRequest, GetRequest,
    IncrementRequest, LookupInRequest, MutateInRequest, NoopRequest, ObserveSeqNoRequest,
    PrependRequest, RangeScanCancelRequest, RangeScanContinueRequest, RangeScanCreateRequest,
    ReplaceRequest, SelectBucketRequest, SetRequest, TouchRequest, UnlockRequest,
};
use crate::memd::response::{
    AddResponse, AppendResponse, BootstrapResult, DecrementResponse, DeleteResponse,
    GetAndLockResponse, GetAndTouchResponse, GetClusterConfigResponse, GetCollectionIdResponse,
    GetCollectionsManifestResponse, GetMetaResponse, GetReplicaResponse, GetResponse,
    IncrementResponse, LookupInResponse, MutateInResponse, NoopResponse, ObserveSeqNoResponse,
    PrependResponse, RangeScanCancelResponse, RangeScanCreateResponse, ReplaceResponse,
    SelectBucketResponse, SetResponse, TouchResponse, UnlockResponse,
};

pub(crate) trait KvClientOps: Sized + Send + Sync {
    fn bucket_name(&self) -> Option<String>;
    fn set(&self, req: SetRequest) -> impl Future<Output = Result<SetResponse>> + Send;
    fn get(&self, req: GetRequest) -> impl Future<Output = Result<GetResponse>> + Send;
    fn get_replica(
        &self,
        req: GetReplicaRequest,
    ) -> impl Future<Output = Result<GetReplicaResponse>> + Send;
    fn get_meta(
        &self,
        req: GetMetaRequest,
    ) -> impl Future<Output = Result<GetMetaResponse>> + Send;
    fn delete(&self, req: DeleteRequest) -> impl Future<Output = Result<DeleteResponse>> + Send;
    fn get_and_lock(
        &self,
        req: GetAndLockRequest,
    ) -> impl Future<Output = Result<GetAndLockResponse>> + Send;
    fn get_and_touch(
        &self,
        req: GetAndTouchRequest,
    ) -> impl Future<Output = Result<GetAndTouchResponse>> + Send;
    fn unlock(&self, req: UnlockRequest) -> impl Future<Output = Result<UnlockResponse>> + Send;
    fn touch(&self, req: TouchRequest) -> impl Future<Output = Result<TouchResponse>> + Send;
    fn add(&self, req: AddRequest) -> impl Future<Output = Result<AddResponse>> + Send;
    fn replace(
        &self,
        req: ReplaceRequest,
    ) -> impl Future<Output = Result<ReplaceResponse>> + Send;
    fn append(&self, req: AppendRequest) -> impl Future<Output = Result<AppendResponse>> + Send;
    fn prepend(
        &self,
        req: PrependRequest,
    ) -> impl Future<Output = Result<PrependResponse>> + Send;
    fn increment(
        &self,
        req: IncrementRequest,
    ) -> impl Future<Output = Result<IncrementResponse>> + Send;
    fn decrement(
        &self,
        req: DecrementRequest,
    ) -> impl Future<Output = Result<DecrementResponse>> + Send;
    fn lookup_in(
        &self,
        req: LookupInRequest,
    ) -> impl Future<Output = Result<LookupInResponse>> + Send;
    fn mutate_in(
        &self,
        req: MutateInRequest,
    ) -> impl Future<Output = Result<MutateInResponse>> + Send;
    fn observe_seq_no(
        &self,
        req: ObserveSeqNoRequest,
    ) -> impl Future<Output = Result<ObserveSeqNoResponse>> + Send;
    fn get_cluster_config(
        &self,
        req: GetClusterConfigRequest,
    ) -> impl Future<Output = Result<GetClusterConfigResponse>> + Send;
    fn get_collection_id(
        &self,
        req: GetCollectionIdRequest,
    ) -> impl Future<Output = Result<GetCollectionIdResponse>> + Send;
    fn get_collections_manifest(
        &self,
        req: GetCollectionsManifestRequest,
    ) -> impl Future<Output = Result<GetCollectionsManifestResponse>> + Send;
    fn range_scan_create(
        &self,
        req: RangeScanCreateRequest,
    ) -> impl Future<Output = Result<RangeScanCreateResponse>> + Send;
    fn range_scan_continue(
        &self,
        req: RangeScanContinueRequest,
        ids_only: bool,
    ) -> impl Future<Output = Result<KvRangeScanContinueOp>> + Send;
    fn range_scan_cancel(
        &self,
        req: RangeScanCancelRequest,
    ) -> impl Future<Output = Result<RangeScanCancelResponse>> + Send;
    fn noop(&self, req: NoopRequest) -> impl Future<Output = Result<NoopResponse>> + Send;
}

macro_rules! crud_op {
    ($name:ident, $req:ty, $resp:ty) => {
        async fn $name(&self, req: $req) -> Result<$resp> {
            let mut op = self
                .handle_dispatch_side_result(self.ops_crud().$name(self.client(), req).await)
                .await?;

            self.handle_response_side_result(op.recv().await)
        }
    };
}

macro_rules! util_op {
    ($name:ident, $ops:ident, $req:ty, $resp:ty) => {
        async fn $name(&self, req: $req) -> Result<$resp> {
            let mut op = self
                .handle_dispatch_side_result($ops {}.$name(self.client(), req).await)
                .await?;

            self.handle_response_side_result(op.recv().await)
        }
    };
}

impl<D> KvClientOps for StdKvClient<D>
where
    D: Dispatcher,
{
    fn bucket_name(&self) -> Option<String> {
        self.selected_bucket.lock().unwrap().clone()
    }

    crud_op!(set, SetRequest<'_>, SetResponse);
    crud_op!(get, GetRequest<'_>, GetResponse);
    crud_op!(get_replica, GetReplicaRequest<'_>, GetReplicaResponse);
    crud_op!(get_meta, GetMetaRequest<'_>, GetMetaResponse);
    crud_op!(delete, DeleteRequest<'_>, DeleteResponse);
    crud_op!(get_and_lock, GetAndLockRequest<'_>, GetAndLockResponse);
    crud_op!(get_and_touch, GetAndTouchRequest<'_>, GetAndTouchResponse);
    crud_op!(unlock, UnlockRequest<'_>, UnlockResponse);
    crud_op!(touch, TouchRequest<'_>, TouchResponse);
    crud_op!(add, AddRequest<'_>, AddResponse);
    crud_op!(replace, ReplaceRequest<'_>, ReplaceResponse);
    crud_op!(append, AppendRequest<'_>, AppendResponse);
    crud_op!(prepend, PrependRequest<'_>, PrependResponse);
    crud_op!(increment, IncrementRequest<'_>, IncrementResponse);
    crud_op!(decrement, DecrementRequest<'_>, DecrementResponse);
    crud_op!(lookup_in, LookupInRequest<'_>, LookupInResponse);
    crud_op!(mutate_in, MutateInRequest<'_>, MutateInResponse);
    util_op!(
        observe_seq_no,
        OpsUtil,
        ObserveSeqNoRequest,
        ObserveSeqNoResponse
    );
    util_op!(
        get_cluster_config,
        OpsCore,
        GetClusterConfigRequest,
        GetClusterConfigResponse
    );
    util_op!(
        get_collection_id,
        OpsUtil,
        GetCollectionIdRequest<'_>,
        GetCollectionIdResponse
    );
    util_op!(
        get_collections_manifest,
        OpsUtil,
        GetCollectionsManifestRequest,
        GetCollectionsManifestResponse
    );
    util_op!(
        range_scan_create,
        OpsRangeScan,
        RangeScanCreateRequest,
        RangeScanCreateResponse
    );
    util_op!(
        range_scan_cancel,
        OpsRangeScan,
        RangeScanCancelRequest,
        RangeScanCancelResponse
    );
    util_op!(noop, OpsUtil, NoopRequest, NoopResponse);

    async fn range_scan_continue(
        &self,
        req: RangeScanContinueRequest,
        ids_only: bool,
    ) -> Result<KvRangeScanContinueOp> {
        let op = self
            .handle_dispatch_side_result(
                OpsRangeScan {}
                    .range_scan_continue(self.client(), req, ids_only)
                    .await,
            )
            .await?;

        Ok(KvRangeScanContinueOp {
            inner: op,
            remote_addr: self.remote_addr(),
            local_addr: self.local_addr(),
        })
    }
}

/// A streaming continue handle; each `recv` yields one server response worth
/// of items together with the resulting scan state.
pub(crate) struct KvRangeScanContinueOp {
    inner: RangeScanContinuePendingOp,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl KvRangeScanContinueOp {
    pub async fn recv(&mut self) -> Result<RangeScanContinueEvent> {
        self.inner.recv().await.map_err(|e| {
            Error::new_memd_error(e, Some(self.remote_addr), Some(self.local_addr))
        })
    }

    pub async fn cancel(&mut self) -> bool {
        self.inner
            .cancel(CancellationErrorKind::RequestCancelled)
            .await
    }
}

impl<D> StdKvClient<D>
where
    D: Dispatcher,
{
    async fn handle_dispatch_side_result<T>(&self, result: memd::error::Result<T>) -> Result<T> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                if let memd::error::ErrorKind::Dispatch { .. } = e.kind() {
                    // A failed write means the socket is done; close so the
                    // pool can replace us.
                    self.close().await.unwrap_or_default();
                }

                Err(Error::new_memd_error(
                    e,
                    Some(self.remote_addr()),
                    Some(self.local_addr()),
                ))
            }
        }
    }

    fn handle_response_side_result<T>(&self, result: memd::error::Result<T>) -> Result<T> {
        result.map_err(|e| {
            Error::new_memd_error(e, Some(self.remote_addr()), Some(self.local_addr()))
        })
    }

    pub async fn bootstrap(&self, opts: BootstrapOptions) -> Result<BootstrapResult> {
        OpBootstrap::bootstrap(OpsCore {}, self.client(), opts)
            .await
            .map_err(|e| {
                Error::new_memd_error(e, Some(self.remote_addr()), Some(self.local_addr()))
            })
    }

    pub async fn select_bucket_req(
        &self,
        req: SelectBucketRequest,
    ) -> Result<SelectBucketResponse> {
        let mut op = self
            .handle_dispatch_side_result(OpsCore {}.select_bucket(self.client(), req).await)
            .await?;

        self.handle_response_side_result(op.recv().await)
    }

    fn ops_crud(&self) -> OpsCrud {
        OpsCrud {
            collections_enabled: self.has_feature(HelloFeature::Collections),
            durability_enabled: self.has_feature(HelloFeature::SyncReplication),
            preserve_expiry_enabled: self.has_feature(HelloFeature::PreserveExpiry),
            ext_frames_enabled: self.has_feature(HelloFeature::AltRequests),
        }
    }
}
