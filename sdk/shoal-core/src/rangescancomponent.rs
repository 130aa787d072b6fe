use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::collectionresolver::{orchestrate_memd_collection_id, CollectionResolver};
use crate::error::{Error, Result};
use crate::kvclient_ops::KvClientOps;
use crate::kvclientmanager::{
    orchestrate_memd_client, KvClientManager, KvClientManagerClientType,
};
use crate::memd::error::ServerErrorKind;
use crate::memd::rangescan::{
    RangeScanContinueLimits, RangeScanItem, ScanType, SnapshotRequirements,
};
use crate::memd::ops_rangescan::RangeScanAction;
use crate::memd::request::{
    RangeScanCancelRequest, RangeScanContinueRequest, RangeScanCreateRequest,
};
use crate::memd::rangescan::RangeScanCreateBody;
use crate::nmvbhandler::NotMyVbucketConfigHandler;
use crate::retry::{
    orchestrate_retries, RetryManager, RetryRequest, RetryStrategy, DEFAULT_RETRY_STRATEGY,
};
use crate::vbucketrouter::VbucketRouter;

pub struct RangeScanCreateOptions<'a> {
    pub vbucket_id: u16,
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub scan_type: ScanType,
    pub ids_only: bool,
    pub snapshot_requirements: Option<SnapshotRequirements>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RangeScanCreateResult {
    pub scan_uuid: [u8; 16],
    pub ids_only: bool,
}

pub struct RangeScanContinueOptions {
    pub vbucket_id: u16,
    pub scan_uuid: [u8; 16],
    pub ids_only: bool,
    pub batch_item_limit: u32,
    pub batch_byte_limit: u32,
    pub batch_time_limit_ms: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RangeScanContinueResult {
    pub more: bool,
    pub complete: bool,
}

pub struct RangeScanCancelOptions {
    pub vbucket_id: u16,
    pub scan_uuid: [u8; 16],
}

/// Drives the per-vbucket scan lifecycle: create, zero or more continues
/// streaming items back, and an idempotent cancel.
pub(crate) struct RangeScanComponent<M, V, Nmvb, Cr>
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

    // Live scan sessions, bounded so a runaway caller cannot pin an
    // unbounded amount of server-side scan state.
    sessions: Mutex<HashSet<[u8; 16]>>,
}

const MAX_SCAN_SESSIONS: usize = 256;

impl<M, V, Nmvb, Cr> RangeScanComponent<M, V, Nmvb, Cr>
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
    ) -> Self {
        RangeScanComponent {
            conn_manager,
            router,
            nmvb_handler,
            collections,
            retry_manager,
            sessions: Mutex::new(HashSet::new()),
        }
    }

    fn register_session(&self, scan_uuid: [u8; 16]) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(scan_uuid);
    }

    fn deregister_session(&self, scan_uuid: &[u8; 16]) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(scan_uuid);
    }

    pub(crate) async fn create(
        &self,
        opts: RangeScanCreateOptions<'_>,
    ) -> Result<RangeScanCreateResult> {
        {
            let sessions = self.sessions.lock().unwrap();
            if sessions.len() >= MAX_SCAN_SESSIONS {
                return Err(Error::new_message_error("too many active range scans"));
            }
        }

        let strategy = opts
            .retry_strategy
            .clone()
            .unwrap_or_else(|| DEFAULT_RETRY_STRATEGY.clone());

        let ids_only = opts.ids_only;
        let opts = &opts;

        orchestrate_retries(
            self.retry_manager.clone(),
            strategy,
            RetryRequest::new("range_scan_create", true),
            || {
                let collections = self.collections.clone();
                let router = self.router.clone();
                let manager = self.conn_manager.clone();

                async move {
                    orchestrate_memd_collection_id(
                        collections,
                        opts.scope_name,
                        opts.collection_name,
                        |collection_id| {
                            let router = router.clone();
                            let manager = manager.clone();

                            async move {
                                let endpoint = router.dispatch_to_vbucket(opts.vbucket_id)?;

                                orchestrate_memd_client(manager, endpoint, |client| {
                                    let body = RangeScanCreateBody {
                                        collection_id,
                                        ids_only,
                                        scan_type: Some(opts.scan_type.clone()),
                                        snapshot_requirements: opts
                                            .snapshot_requirements
                                            .clone(),
                                    };

                                    async move {
                                        let resp = client
                                            .range_scan_create(RangeScanCreateRequest {
                                                vbucket_id: opts.vbucket_id,
                                                body,
                                            })
                                            .await?;

                                        Ok(RangeScanCreateResult {
                                            scan_uuid: resp.scan_uuid,
                                            ids_only,
                                        })
                                    }
                                })
                                .await
                            }
                        },
                    )
                    .await
                }
            },
        )
        .await
        .map(|result| {
            self.register_session(result.scan_uuid);
            result
        })
    }

    /// Issues one continue against the scan, invoking `item_callback` for
    /// every streamed item. Returns whether the server ended the batch with
    /// more data pending or completed the scan.
    pub(crate) async fn continue_scan(
        &self,
        opts: RangeScanContinueOptions,
        item_callback: &(dyn Fn(RangeScanItem) + Send + Sync),
    ) -> Result<RangeScanContinueResult> {
        let endpoint = self.router.dispatch_to_vbucket(opts.vbucket_id)?;
        let client = self.conn_manager.get_client(endpoint).await?;

        let mut op = client
            .range_scan_continue(
                RangeScanContinueRequest {
                    vbucket_id: opts.vbucket_id,
                    scan_uuid: opts.scan_uuid,
                    limits: RangeScanContinueLimits {
                        item_limit: opts.batch_item_limit,
                        byte_limit: opts.batch_byte_limit,
                        time_limit_ms: opts.batch_time_limit_ms,
                    },
                },
                opts.ids_only,
            )
            .await?;

        loop {
            let event = match op.recv().await {
                Ok(event) => event,
                Err(e) => {
                    if is_scan_unknown_error(&e) {
                        self.deregister_session(&opts.scan_uuid);
                    }
                    return Err(e);
                }
            };

            for item in event.items {
                item_callback(item);
            }

            match event.action {
                RangeScanAction::Progressing => continue,
                RangeScanAction::More => {
                    return Ok(RangeScanContinueResult {
                        more: true,
                        complete: false,
                    });
                }
                RangeScanAction::Complete => {
                    self.deregister_session(&opts.scan_uuid);
                    return Ok(RangeScanContinueResult {
                        more: false,
                        complete: true,
                    });
                }
            }
        }
    }

    /// Cancels a scan. Cancelling a scan that already completed naturally
    /// (or was already cancelled) is a no-op.
    pub(crate) async fn cancel(&self, opts: RangeScanCancelOptions) -> Result<()> {
        let endpoint = self.router.dispatch_to_vbucket(opts.vbucket_id)?;

        let result = orchestrate_memd_client(
            self.conn_manager.clone(),
            endpoint,
            |client: Arc<KvClientManagerClientType<M>>| {
                let scan_uuid = opts.scan_uuid;
                async move {
                    client
                        .range_scan_cancel(RangeScanCancelRequest {
                            vbucket_id: opts.vbucket_id,
                            scan_uuid,
                        })
                        .await
                }
            },
        )
        .await;

        self.deregister_session(&opts.scan_uuid);

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if is_scan_unknown_error(&e) {
                    debug!("Range scan cancel on unknown scan, treating as complete");
                    return Ok(());
                }

                Err(e)
            }
        }
    }
}

pub(crate) fn is_scan_unknown_error(err: &Error) -> bool {
    err.is_memd_error()
        .map(|e| e.is_server_error_kind(ServerErrorKind::KeyNotFound))
        .unwrap_or(false)
}
