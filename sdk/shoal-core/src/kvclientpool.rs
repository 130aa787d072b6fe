use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use log::{debug, info, warn};
use tokio::select;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::sleep;
use uuid::Uuid;

use crate::address::Address;
use crate::authenticator::Authenticator;
use crate::error::{Error, ErrorKind, Result};
use crate::kvclient::{
    KvClient, KvClientBootstrapOptions, KvClientOptions, UnsolicitedPacketSender,
};
use crate::kvclient_ops::KvClientOps;
use crate::memd::dispatcher::OrphanResponseHandler;
use crate::tls_config::TlsConfig;

// Reconnect delays after a failed attempt; the final entry repeats.
const CONNECT_BACKOFF_MS: [u64; 5] = [0, 100, 500, 1000, 5000];

#[derive(Clone)]
pub(crate) struct KvClientConfig {
    pub address: Address,
    pub tls_config: Option<TlsConfig>,
    pub authenticator: Arc<Authenticator>,
    pub selected_bucket: Option<String>,
}

impl PartialEq for KvClientConfig {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.tls_config.is_some() == other.tls_config.is_some()
            && self.selected_bucket == other.selected_bucket
    }
}

#[derive(Clone)]
pub(crate) struct KvClientPoolConfig {
    pub num_connections: usize,
    pub client_config: KvClientConfig,
}

#[derive(Clone)]
pub(crate) struct KvClientPoolOptions {
    pub bootstrap_options: KvClientBootstrapOptions,
    pub endpoint_id: String,
    pub unsolicited_packet_tx: Option<UnsolicitedPacketSender>,
    pub orphan_handler: Option<OrphanResponseHandler>,
    pub disable_decompression: bool,
}

pub(crate) trait KvClientPool: Send + Sync {
    type Client: KvClient + KvClientOps + Send + Sync;

    fn new(
        config: KvClientPoolConfig,
        opts: KvClientPoolOptions,
    ) -> impl Future<Output = Self> + Send;
    fn get_client(&self) -> impl Future<Output = Result<Arc<Self::Client>>> + Send;
    fn shutdown_client(&self, client: Arc<Self::Client>) -> impl Future<Output = ()> + Send;
    fn reconfigure(&self, config: KvClientPoolConfig) -> impl Future<Output = Result<()>> + Send;
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

struct KvClientPoolEntry<K> {
    client: Arc<K>,
}

struct KvClientPoolInner<K> {
    id: String,

    config: Mutex<KvClientPoolConfig>,
    opts: KvClientPoolOptions,

    clients: Mutex<Vec<KvClientPoolEntry<K>>>,
    fast_map: ArcSwap<Vec<Arc<K>>>,
    client_idx: AtomicUsize,

    closed: AtomicBool,
    check_notify: Notify,
    new_client_notify: Notify,
}

pub(crate) struct StdKvClientPool<K> {
    inner: Arc<KvClientPoolInner<K>>,
}

impl<K> KvClientPool for StdKvClientPool<K>
where
    K: KvClient + KvClientOps + Send + Sync + 'static,
{
    type Client = K;

    async fn new(config: KvClientPoolConfig, opts: KvClientPoolOptions) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!(
            "Creating kv client pool {} for {} - {:?}",
            &id, &config.client_config.address, &config.client_config.selected_bucket
        );

        let (on_client_close_tx, on_client_close_rx) = mpsc::channel(8);

        let inner = Arc::new(KvClientPoolInner {
            id,
            config: Mutex::new(config),
            opts,
            clients: Mutex::new(vec![]),
            fast_map: ArcSwap::from_pointee(vec![]),
            client_idx: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            check_notify: Notify::new(),
            new_client_notify: Notify::new(),
        });

        let tender_inner = inner.clone();
        tokio::spawn(async move {
            KvClientPoolInner::run_tender(tender_inner, on_client_close_tx, on_client_close_rx)
                .await;
        });

        inner.check_notify.notify_one();

        StdKvClientPool { inner }
    }

    async fn get_client(&self) -> Result<Arc<K>> {
        let fast_map = self.inner.fast_map.load();
        if !fast_map.is_empty() {
            let client_idx = self.inner.client_idx.fetch_add(1, Ordering::Relaxed);
            return Ok(fast_map[client_idx % fast_map.len()].clone());
        }

        self.get_client_slow().await
    }

    async fn shutdown_client(&self, client: Arc<K>) {
        {
            let mut clients = self.inner.clients.lock().await;
            clients.retain(|entry| entry.client.id() != client.id());
        }

        self.inner.rebuild_fast_map().await;
        client.close().await.unwrap_or_default();
        self.inner.check_notify.notify_one();
    }

    async fn reconfigure(&self, config: KvClientPoolConfig) -> Result<()> {
        let needs_rebuild = {
            let mut guard = self.inner.config.lock().await;

            let same_endpoint = guard.client_config.address == config.client_config.address
                && guard.client_config.tls_config.is_some()
                    == config.client_config.tls_config.is_some();
            let old_bucket = guard.client_config.selected_bucket.clone();
            *guard = config.clone();

            if !same_endpoint {
                true
            } else if old_bucket != config.client_config.selected_bucket {
                // A newly selected bucket can be applied to live connections;
                // anything else needs fresh ones.
                old_bucket.is_some()
            } else {
                false
            }
        };

        if needs_rebuild {
            self.inner.drop_all_clients().await;
        } else if let Some(bucket) = config.client_config.selected_bucket {
            let clients = {
                let guard = self.inner.clients.lock().await;
                guard.iter().map(|e| e.client.clone()).collect::<Vec<_>>()
            };

            for client in clients {
                if client.bucket_name().as_deref() != Some(bucket.as_str()) {
                    if let Err(e) = client.select_bucket(bucket.clone()).await {
                        warn!(
                            "Pool {} failed to select bucket on {}: {e}",
                            self.inner.id,
                            client.id()
                        );
                        self.shutdown_client(client).await;
                    }
                }
            }
        }

        self.inner.check_notify.notify_one();

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing kv client pool {}", self.inner.id);

        self.inner.drop_all_clients().await;
        self.inner.check_notify.notify_one();
        self.inner.new_client_notify.notify_waiters();

        Ok(())
    }
}

impl<K> StdKvClientPool<K>
where
    K: KvClient + KvClientOps + Send + Sync + 'static,
{
    async fn get_client_slow(&self) -> Result<Arc<K>> {
        loop {
            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(ErrorKind::Shutdown.into());
            }

            // Register for the wakeup before re-checking the fast map, so a
            // client added in between cannot slip past unnoticed.
            let notified = self.inner.new_client_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let fast_map = self.inner.fast_map.load();
            if !fast_map.is_empty() {
                let client_idx = self.inner.client_idx.fetch_add(1, Ordering::Relaxed);
                return Ok(fast_map[client_idx % fast_map.len()].clone());
            }

            self.inner.check_notify.notify_one();
            notified.await;
        }
    }
}

impl<K> KvClientPoolInner<K>
where
    K: KvClient + KvClientOps + Send + Sync + 'static,
{
    async fn run_tender(
        inner: Arc<KvClientPoolInner<K>>,
        on_client_close_tx: mpsc::Sender<String>,
        mut on_client_close_rx: mpsc::Receiver<String>,
    ) {
        loop {
            if inner.closed.load(Ordering::SeqCst) {
                debug!("Pool {} tender exiting", inner.id);
                return;
            }

            inner.check_connections(&on_client_close_tx).await;

            select! {
                _ = inner.check_notify.notified() => {},
                closed_id = on_client_close_rx.recv() => {
                    if let Some(closed_id) = closed_id {
                        debug!("Pool {} dropping closed client {}", inner.id, closed_id);
                        let mut clients = inner.clients.lock().await;
                        clients.retain(|entry| entry.client.id() != closed_id);
                        drop(clients);
                        inner.rebuild_fast_map().await;
                    }
                },
            }
        }
    }

    async fn check_connections(self: &Arc<Self>, on_client_close_tx: &mpsc::Sender<String>) {
        let mut attempt = 0usize;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }

            let (wanted, client_config) = {
                let guard = self.config.lock().await;
                (guard.num_connections, guard.client_config.clone())
            };

            let have = {
                let guard = self.clients.lock().await;
                guard.len()
            };

            if have >= wanted {
                return;
            }

            let client_id = Uuid::new_v4().to_string();
            let opts = KvClientOptions {
                address: client_config.address.clone(),
                tls_config: client_config.tls_config.clone(),
                authenticator: client_config.authenticator.clone(),
                selected_bucket: client_config.selected_bucket.clone(),
                bootstrap_options: self.opts.bootstrap_options.clone(),
                endpoint_id: self.opts.endpoint_id.clone(),
                unsolicited_packet_tx: self.opts.unsolicited_packet_tx.clone(),
                orphan_handler: self.opts.orphan_handler.clone(),
                on_close_tx: Some(on_client_close_tx.clone()),
                disable_decompression: self.opts.disable_decompression,
                id: client_id,
            };

            match K::new(opts).await {
                Ok(client) => {
                    attempt = 0;

                    {
                        let mut guard = self.clients.lock().await;
                        guard.push(KvClientPoolEntry {
                            client: Arc::new(client),
                        });
                    }

                    self.rebuild_fast_map().await;
                    self.new_client_notify.notify_waiters();
                }
                Err(e) => {
                    let delay_ms =
                        CONNECT_BACKOFF_MS[attempt.min(CONNECT_BACKOFF_MS.len() - 1)];
                    attempt += 1;

                    warn!(
                        "Pool {} failed to connect to {} (attempt {}): {e}; retrying in {}ms",
                        self.id, client_config.address, attempt, delay_ms
                    );

                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn drop_all_clients(&self) {
        let old_clients = {
            let mut guard = self.clients.lock().await;
            std::mem::take(&mut *guard)
        };

        self.fast_map.store(Arc::new(vec![]));

        for entry in old_clients {
            entry.client.close().await.unwrap_or_default();
        }
    }

    async fn rebuild_fast_map(&self) {
        let guard = self.clients.lock().await;
        let clients = guard.iter().map(|e| e.client.clone()).collect::<Vec<_>>();
        drop(guard);

        self.fast_map.store(Arc::new(clients));
    }
}

impl<K> Drop for StdKvClientPool<K> {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.check_notify.notify_one();
    }
}
