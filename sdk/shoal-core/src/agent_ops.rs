use crate::agent::Agent;
use crate::analyticscomponent::AnalyticsOptions;
use crate::crudoptions::{
    AppendOptions, DecrementOptions, GetAndLockOptions, GetAndTouchOptions, GetMetaOptions,
    GetOptions, GetReplicaOptions, IncrementOptions, InsertOptions, LookupInOptions,
    MutateInOptions, PrependOptions, RemoveOptions, ReplaceOptions, TouchOptions, UnlockOptions,
    UpsertOptions,
};
use crate::crudresults::{
    AppendResult, DecrementResult, GetAndLockResult, GetAndTouchResult, GetMetaResult, GetResult,
    GetReplicaResult, IncrementResult, InsertResult, LookupInResult, MutateInResult,
    PrependResult, RemoveResult, ReplaceResult, TouchResult, UnlockResult, UpsertResult,
};
use crate::error::Result;
use crate::memd::rangescan::RangeScanItem;
use crate::mgmtx::mgmt::ManifestUidResponse;
use crate::mgmtx::options::{
    CreateBucketOptions, CreateCollectionOptions, CreateScopeOptions, DeleteBucketOptions,
    DeleteCollectionOptions, DeleteScopeOptions, GetCollectionManifestOptions,
};
use crate::clustermap::CollectionManifestJson;
use crate::querycomponent::QueryOptions;
use crate::rangescancomponent::{
    RangeScanCancelOptions, RangeScanContinueOptions, RangeScanContinueResult,
    RangeScanCreateOptions, RangeScanCreateResult,
};
use crate::searchcomponent::SearchOptions;
use crate::servicecomponent::ServiceRows;
use crate::viewcomponent::ViewQueryOptions;

impl Agent {
    pub async fn get(&self, opts: GetOptions<'_>) -> Result<GetResult> {
        self.inner.crud.get(opts).await
    }

    pub async fn get_replica(&self, opts: GetReplicaOptions<'_>) -> Result<GetReplicaResult> {
        self.inner.crud.get_replica(opts).await
    }

    pub async fn get_any_replica(&self, opts: GetReplicaOptions<'_>) -> Result<GetReplicaResult> {
        self.inner.crud.get_any_replica(opts).await
    }

    pub async fn get_all_replicas(
        &self,
        opts: GetReplicaOptions<'_>,
    ) -> Result<Vec<GetReplicaResult>> {
        self.inner.crud.get_all_replicas(opts).await
    }

    pub async fn get_meta(&self, opts: GetMetaOptions<'_>) -> Result<GetMetaResult> {
        self.inner.crud.get_meta(opts).await
    }

    pub async fn upsert(&self, opts: UpsertOptions<'_>) -> Result<UpsertResult> {
        self.inner.crud.upsert(opts).await
    }

    pub async fn insert(&self, opts: InsertOptions<'_>) -> Result<InsertResult> {
        self.inner.crud.insert(opts).await
    }

    pub async fn replace(&self, opts: ReplaceOptions<'_>) -> Result<ReplaceResult> {
        self.inner.crud.replace(opts).await
    }

    pub async fn remove(&self, opts: RemoveOptions<'_>) -> Result<RemoveResult> {
        self.inner.crud.remove(opts).await
    }

    pub async fn touch(&self, opts: TouchOptions<'_>) -> Result<TouchResult> {
        self.inner.crud.touch(opts).await
    }

    pub async fn get_and_touch(&self, opts: GetAndTouchOptions<'_>) -> Result<GetAndTouchResult> {
        self.inner.crud.get_and_touch(opts).await
    }

    pub async fn get_and_lock(&self, opts: GetAndLockOptions<'_>) -> Result<GetAndLockResult> {
        self.inner.crud.get_and_lock(opts).await
    }

    pub async fn unlock(&self, opts: UnlockOptions<'_>) -> Result<UnlockResult> {
        self.inner.crud.unlock(opts).await
    }

    pub async fn append(&self, opts: AppendOptions<'_>) -> Result<AppendResult> {
        self.inner.crud.append(opts).await
    }

    pub async fn prepend(&self, opts: PrependOptions<'_>) -> Result<PrependResult> {
        self.inner.crud.prepend(opts).await
    }

    pub async fn increment(&self, opts: IncrementOptions<'_>) -> Result<IncrementResult> {
        self.inner.crud.increment(opts).await
    }

    pub async fn decrement(&self, opts: DecrementOptions<'_>) -> Result<DecrementResult> {
        self.inner.crud.decrement(opts).await
    }

    pub async fn lookup_in(&self, opts: LookupInOptions<'_>) -> Result<LookupInResult> {
        self.inner.crud.lookup_in(opts).await
    }

    pub async fn mutate_in(&self, opts: MutateInOptions<'_>) -> Result<MutateInResult> {
        self.inner.crud.mutate_in(opts).await
    }

    pub async fn range_scan_create(
        &self,
        opts: RangeScanCreateOptions<'_>,
    ) -> Result<RangeScanCreateResult> {
        self.inner.range_scans.create(opts).await
    }

    pub async fn range_scan_continue(
        &self,
        opts: RangeScanContinueOptions,
        item_callback: &(dyn Fn(RangeScanItem) + Send + Sync),
    ) -> Result<RangeScanContinueResult> {
        self.inner.range_scans.continue_scan(opts, item_callback).await
    }

    pub async fn range_scan_cancel(&self, opts: RangeScanCancelOptions) -> Result<()> {
        self.inner.range_scans.cancel(opts).await
    }

    pub async fn query(&self, opts: QueryOptions) -> Result<ServiceRows> {
        self.inner.query.query(opts).await
    }

    pub async fn analytics_query(&self, opts: AnalyticsOptions) -> Result<ServiceRows> {
        self.inner.analytics.query(opts).await
    }

    pub async fn search_query(&self, opts: SearchOptions) -> Result<ServiceRows> {
        self.inner.search.query(opts).await
    }

    pub async fn view_query(&self, opts: ViewQueryOptions) -> Result<ServiceRows> {
        self.inner.views.query(opts).await
    }

    pub async fn create_bucket(&self, opts: &CreateBucketOptions<'_>) -> Result<()> {
        self.inner.mgmt.create_bucket(opts).await
    }

    pub async fn delete_bucket(&self, opts: &DeleteBucketOptions<'_>) -> Result<()> {
        self.inner.mgmt.delete_bucket(opts).await
    }

    pub async fn create_scope(
        &self,
        opts: &CreateScopeOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        self.inner.mgmt.create_scope(opts).await
    }

    pub async fn delete_scope(
        &self,
        opts: &DeleteScopeOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        self.inner.mgmt.delete_scope(opts).await
    }

    pub async fn create_collection(
        &self,
        opts: &CreateCollectionOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        self.inner.mgmt.create_collection(opts).await
    }

    pub async fn delete_collection(
        &self,
        opts: &DeleteCollectionOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        self.inner.mgmt.delete_collection(opts).await
    }

    pub async fn get_collection_manifest(
        &self,
        opts: &GetCollectionManifestOptions<'_>,
    ) -> Result<CollectionManifestJson> {
        self.inner.mgmt.get_collection_manifest(opts).await
    }
}
