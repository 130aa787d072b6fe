use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

use crate::collectionresolver::{orchestrate_memd_collection_id, CollectionResolver};
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
use crate::error::{ErrorKind, Result};
use crate::kvclient_ops::KvClientOps;
use crate::kvclientmanager::{
    orchestrate_memd_client, KvClientManager, KvClientManagerClientType,
};
use crate::memd::request::{
    AddRequest, AppendRequest, DecrementRequest, DeleteRequest, GetAndLockRequest,
    GetAndTouchRequest, GetMetaRequest, GetReplicaRequest, GetRequest, IncrementRequest,
    LookupInRequest, MutateInRequest, PrependRequest, ReplaceRequest, SetRequest, TouchRequest,
    UnlockRequest,
};
use crate::memd::response::MutationToken as MemdMutationToken;
use crate::mutationtoken::MutationToken;
use crate::nmvbhandler::NotMyVbucketConfigHandler;
use crate::retry::{
    orchestrate_retries, RetryManager, RetryRequest, RetryStrategy, DEFAULT_RETRY_STRATEGY,
};
use crate::vbucketrouter::{orchestrate_memd_routing, VbucketRouter};

pub(crate) struct CrudComponent<M, V, Nmvb, Cr>
where
    M: KvClientManager,
    V: VbucketRouter,
    Nmvb: NotMyVbucketConfigHandler,
    Cr: CollectionResolver,
{
    conn_manager: Arc<M>,
    router: Arc<V>,
    nmvb_handler: Arc<Nmvb>,
    collections: Arc<Cr>,
    retry_manager: Arc<RetryManager>,
    bucket_name: String,
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn orchestrate_simple_crud<M, V, Nmvb, Cr, Fut, Resp>(
    retry_manager: Arc<RetryManager>,
    strategy: Arc<dyn RetryStrategy>,
    operation_name: &'static str,
    is_idempotent: bool,
    resolver: Arc<Cr>,
    nmvb_handler: Arc<Nmvb>,
    router: Arc<V>,
    manager: Arc<M>,
    scope_name: &str,
    collection_name: &str,
    key: &[u8],
    vb_server_idx: u32,
    operation: impl Fn(String, u16, u32, Arc<KvClientManagerClientType<M>>) -> Fut + Send + Sync,
) -> Result<Resp>
where
    M: KvClientManager,
    V: VbucketRouter,
    Nmvb: NotMyVbucketConfigHandler,
    Cr: CollectionResolver,
    Fut: Future<Output = Result<Resp>> + Send,
    Resp: Send,
{
    let operation = &operation;

    orchestrate_retries(
        retry_manager,
        strategy,
        RetryRequest::new(operation_name, is_idempotent),
        || {
            let resolver = resolver.clone();
            let router = router.clone();
            let manager = manager.clone();
            let nmvb_handler = nmvb_handler.clone();

            async move {
                orchestrate_memd_collection_id(
                    resolver,
                    scope_name,
                    collection_name,
                    |collection_id| {
                        let router = router.clone();
                        let manager = manager.clone();
                        let nmvb_handler = nmvb_handler.clone();

                        async move {
                            orchestrate_memd_routing(
                                router,
                                nmvb_handler,
                                collection_id,
                                key,
                                vb_server_idx,
                                |endpoint, vb_id| {
                                    let manager = manager.clone();

                                    async move {
                                        orchestrate_memd_client(
                                            manager,
                                            endpoint.clone(),
                                            |client| {
                                                operation(
                                                    endpoint.clone(),
                                                    vb_id,
                                                    collection_id,
                                                    client,
                                                )
                                            },
                                        )
                                        .await
                                    }
                                },
                            )
                            .await
                        }
                    },
                )
                .await
            }
        },
    )
    .await
}

impl<M, V, Nmvb, Cr> CrudComponent<M, V, Nmvb, Cr>
where
    M: KvClientManager,
    V: VbucketRouter,
    Nmvb: NotMyVbucketConfigHandler,
    Cr: CollectionResolver,
{
    pub(crate) fn new(
        nmvb_handler: Arc<Nmvb>,
        router: Arc<V>,
        conn_manager: Arc<M>,
        collections: Arc<Cr>,
        retry_manager: Arc<RetryManager>,
        bucket_name: Option<String>,
    ) -> Self {
        CrudComponent {
            conn_manager,
            router,
            nmvb_handler,
            collections,
            retry_manager,
            bucket_name: bucket_name.unwrap_or_default(),
        }
    }

    fn make_mutation_token(
        &self,
        vb_id: u16,
        token: Option<MemdMutationToken>,
    ) -> Option<MutationToken> {
        token.map(|t| MutationToken {
            partition_id: vb_id,
            partition_uuid: t.vbuuid,
            sequence_number: t.seqno,
            bucket_name: self.bucket_name.clone(),
        })
    }

    fn strategy(&self, opt: &Option<Arc<dyn RetryStrategy>>) -> Arc<dyn RetryStrategy> {
        opt.clone().unwrap_or_else(|| DEFAULT_RETRY_STRATEGY.clone())
    }

    #[allow(clippy::too_many_arguments)]
    async fn dispatch<Fut, Resp>(
        &self,
        operation_name: &'static str,
        is_idempotent: bool,
        strategy: Arc<dyn RetryStrategy>,
        scope_name: &str,
        collection_name: &str,
        key: &[u8],
        vb_server_idx: u32,
        operation: impl Fn(String, u16, u32, Arc<KvClientManagerClientType<M>>) -> Fut + Send + Sync,
    ) -> Result<Resp>
    where
        Fut: Future<Output = Result<Resp>> + Send,
        Resp: Send,
    {
        orchestrate_simple_crud(
            self.retry_manager.clone(),
            strategy,
            operation_name,
            is_idempotent,
            self.collections.clone(),
            self.nmvb_handler.clone(),
            self.router.clone(),
            self.conn_manager.clone(),
            scope_name,
            collection_name,
            key,
            vb_server_idx,
            operation,
        )
        .await
    }

    pub(crate) async fn get(&self, opts: GetOptions<'_>) -> Result<GetResult> {
        self.dispatch(
            "get",
            true,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .get(GetRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                    })
                    .await?;

                Ok(GetResult {
                    value: resp.value,
                    flags: resp.flags,
                    datatype: resp.datatype,
                    cas: resp.cas,
                })
            },
        )
        .await
    }

    pub(crate) async fn get_replica(
        &self,
        opts: GetReplicaOptions<'_>,
    ) -> Result<GetReplicaResult> {
        let from_active = opts.replica_index == 0;

        self.dispatch(
            "get_replica",
            true,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            opts.replica_index,
            |_endpoint, vb_id, collection_id, client| async move {
                if from_active {
                    let resp = client
                        .get(GetRequest {
                            collection_id,
                            key: opts.key,
                            vbucket_id: vb_id,
                        })
                        .await?;

                    return Ok(GetReplicaResult {
                        value: resp.value,
                        flags: resp.flags,
                        datatype: resp.datatype,
                        cas: resp.cas,
                        is_active: true,
                    });
                }

                let resp = client
                    .get_replica(GetReplicaRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                    })
                    .await?;

                Ok(GetReplicaResult {
                    value: resp.value,
                    flags: resp.flags,
                    datatype: resp.datatype,
                    cas: resp.cas,
                    is_active: false,
                })
            },
        )
        .await
    }

    /// Reads every available copy of a document: the active plus one result
    /// per configured replica. Copies that fail to respond are skipped; no
    /// copy at all yields DocumentIrretrievable.
    pub(crate) async fn get_all_replicas(
        &self,
        opts: GetReplicaOptions<'_>,
    ) -> Result<Vec<GetReplicaResult>> {
        let num_replicas = self.router.num_replicas()?;

        let mut reads = vec![];
        for replica_index in 0..=(num_replicas as u32) {
            let mut replica_opts = opts.clone();
            replica_opts.replica_index = replica_index;
            reads.push(self.get_replica(replica_opts));
        }

        let outcomes = join_all(reads).await;

        let mut results = vec![];
        for outcome in outcomes {
            if let Ok(result) = outcome {
                results.push(result);
            }
        }

        if results.is_empty() {
            return Err(ErrorKind::DocumentIrretrievable.into());
        }

        Ok(results)
    }

    /// Reads whichever copy answers first with success, preferring the
    /// active. All copies failing yields DocumentIrretrievable.
    pub(crate) async fn get_any_replica(
        &self,
        opts: GetReplicaOptions<'_>,
    ) -> Result<GetReplicaResult> {
        let results = self.get_all_replicas(opts).await?;

        let mut results = results;
        if let Some(idx) = results.iter().position(|r| r.is_active) {
            return Ok(results.swap_remove(idx));
        }

        results
            .into_iter()
            .next()
            .ok_or_else(|| ErrorKind::DocumentIrretrievable.into())
    }

    pub(crate) async fn get_meta(&self, opts: GetMetaOptions<'_>) -> Result<GetMetaResult> {
        self.dispatch(
            "get_meta",
            true,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .get_meta(GetMetaRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                    })
                    .await?;

                Ok(GetMetaResult {
                    flags: resp.flags,
                    cas: resp.cas,
                    expiry: resp.expiry,
                    seq_no: resp.seq_no,
                    datatype: resp.datatype,
                    deleted: resp.deleted,
                })
            },
        )
        .await
    }

    pub(crate) async fn upsert(&self, opts: UpsertOptions<'_>) -> Result<UpsertResult> {
        self.dispatch(
            "upsert",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .set(SetRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        flags: opts.flags,
                        value: opts.value,
                        datatype: opts.datatype,
                        expiry: opts.expiry,
                        preserve_expiry: opts.preserve_expiry,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(UpsertResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn insert(&self, opts: InsertOptions<'_>) -> Result<InsertResult> {
        self.dispatch(
            "insert",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .add(AddRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        flags: opts.flags,
                        value: opts.value,
                        datatype: opts.datatype,
                        expiry: opts.expiry,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(InsertResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn replace(&self, opts: ReplaceOptions<'_>) -> Result<ReplaceResult> {
        self.dispatch(
            "replace",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .replace(ReplaceRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        flags: opts.flags,
                        value: opts.value,
                        datatype: opts.datatype,
                        expiry: opts.expiry,
                        preserve_expiry: opts.preserve_expiry,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(ReplaceResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn remove(&self, opts: RemoveOptions<'_>) -> Result<RemoveResult> {
        self.dispatch(
            "remove",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .delete(DeleteRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(RemoveResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn touch(&self, opts: TouchOptions<'_>) -> Result<TouchResult> {
        self.dispatch(
            "touch",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .touch(TouchRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        expiry: opts.expiry,
                    })
                    .await?;

                Ok(TouchResult { cas: resp.cas })
            },
        )
        .await
    }

    pub(crate) async fn get_and_touch(
        &self,
        opts: GetAndTouchOptions<'_>,
    ) -> Result<GetAndTouchResult> {
        self.dispatch(
            "get_and_touch",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .get_and_touch(GetAndTouchRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        expiry: opts.expiry,
                    })
                    .await?;

                Ok(GetAndTouchResult {
                    value: resp.value,
                    flags: resp.flags,
                    datatype: resp.datatype,
                    cas: resp.cas,
                })
            },
        )
        .await
    }

    pub(crate) async fn get_and_lock(
        &self,
        opts: GetAndLockOptions<'_>,
    ) -> Result<GetAndLockResult> {
        self.dispatch(
            "get_and_lock",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .get_and_lock(GetAndLockRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        lock_time: opts.lock_time,
                    })
                    .await?;

                Ok(GetAndLockResult {
                    value: resp.value,
                    flags: resp.flags,
                    datatype: resp.datatype,
                    cas: resp.cas,
                })
            },
        )
        .await
    }

    pub(crate) async fn unlock(&self, opts: UnlockOptions<'_>) -> Result<UnlockResult> {
        self.dispatch(
            "unlock",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                client
                    .unlock(UnlockRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        cas: opts.cas,
                    })
                    .await?;

                Ok(UnlockResult {})
            },
        )
        .await
    }

    pub(crate) async fn append(&self, opts: AppendOptions<'_>) -> Result<AppendResult> {
        self.dispatch(
            "append",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .append(AppendRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        value: opts.value,
                        datatype: 0,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(AppendResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn prepend(&self, opts: PrependOptions<'_>) -> Result<PrependResult> {
        self.dispatch(
            "prepend",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .prepend(PrependRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        value: opts.value,
                        datatype: 0,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(PrependResult {
                    cas: resp.cas,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn increment(&self, opts: IncrementOptions<'_>) -> Result<IncrementResult> {
        self.dispatch(
            "increment",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .increment(IncrementRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        delta: opts.delta,
                        initial: opts.initial,
                        expiry: opts.expiry,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(IncrementResult {
                    cas: resp.cas,
                    value: resp.value,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn decrement(&self, opts: DecrementOptions<'_>) -> Result<DecrementResult> {
        self.dispatch(
            "decrement",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .decrement(DecrementRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        delta: opts.delta,
                        initial: opts.initial,
                        expiry: opts.expiry,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(DecrementResult {
                    cas: resp.cas,
                    value: resp.value,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }

    pub(crate) async fn lookup_in(&self, opts: LookupInOptions<'_>) -> Result<LookupInResult> {
        self.dispatch(
            "lookup_in",
            true,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .lookup_in(LookupInRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        flags: opts.flags,
                        ops: opts.ops,
                    })
                    .await?;

                Ok(LookupInResult {
                    cas: resp.cas,
                    ops: resp.ops,
                    doc_is_deleted: resp.doc_is_deleted,
                })
            },
        )
        .await
    }

    pub(crate) async fn mutate_in(&self, opts: MutateInOptions<'_>) -> Result<MutateInResult> {
        self.dispatch(
            "mutate_in",
            false,
            self.strategy(&opts.retry_strategy),
            opts.scope_name,
            opts.collection_name,
            opts.key,
            0,
            |_endpoint, vb_id, collection_id, client| async move {
                let resp = client
                    .mutate_in(MutateInRequest {
                        collection_id,
                        key: opts.key,
                        vbucket_id: vb_id,
                        flags: opts.flags,
                        ops: opts.ops,
                        expiry: opts.expiry,
                        preserve_expiry: opts.preserve_expiry,
                        cas: opts.cas,
                        durability_level: opts.durability_level,
                        durability_level_timeout: None,
                    })
                    .await?;

                Ok(MutateInResult {
                    cas: resp.cas,
                    ops: resp.ops,
                    mutation_token: self.make_mutation_token(vb_id, resp.mutation_token),
                })
            },
        )
        .await
    }
}
