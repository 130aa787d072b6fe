use std::cmp::Ordering;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::select;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::clustermap::ClusterMapJson;
use crate::configparser::ConfigParser;
use crate::error::Result;
use crate::kvclient::KvClient;
use crate::kvclient_ops::KvClientOps;
use crate::kvclientmanager::KvClientManager;
use crate::memd::request::{ClusterConfigKnownVersion, GetClusterConfigRequest};
use crate::parsedconfig::{ParsedConfig, ParsedConfigBucket};

pub(crate) trait ConfigManager: Sized + Send + Sync {
    fn watch(&self) -> watch::Receiver<ParsedConfig>;
    fn reconfigure(&self, config: ConfigManagerConfig) -> Result<()>;
    fn out_of_band_version(
        &self,
        rev_id: i64,
        rev_epoch: i64,
        endpoint_id: String,
    ) -> impl Future<Output = Option<ParsedConfig>> + Send;
    fn out_of_band_config(&self, config: ParsedConfig) -> Option<ParsedConfig>;
    fn close(&self);
}

#[derive(Debug, Clone)]
pub(crate) struct ConfigVersion {
    pub rev_epoch: i64,
    pub rev_id: i64,
}

pub(crate) struct ConfigManagerConfig {
    pub endpoints: Vec<String>,
}

pub(crate) struct ConfigManagerOptions<M: KvClientManager> {
    pub polling_period: Duration,
    pub fetch_timeout: Duration,
    pub kv_client_manager: Arc<M>,
    pub first_config: ParsedConfig,
}

/// Tracks the current cluster config. Newer snapshots arrive from the poller,
/// from unsolicited clustermap notifications and from not-my-vbucket response
/// bodies; whichever writes a given version first wins.
pub(crate) struct StdConfigManager<M: KvClientManager> {
    inner: Arc<StdConfigManagerInner<M>>,
}

struct StdConfigManagerInner<M: KvClientManager> {
    kv_client_manager: Arc<M>,
    fetch_timeout: Duration,

    endpoints: Mutex<Vec<String>>,

    latest_config: Mutex<ParsedConfig>,
    on_new_config_tx: watch::Sender<ParsedConfig>,

    shutdown: CancellationToken,
}

impl<M: KvClientManager + 'static> StdConfigManagerInner<M> {
    fn handle_config(
        latest_config: &Mutex<ParsedConfig>,
        parsed_config: ParsedConfig,
        on_new_config_tx: &watch::Sender<ParsedConfig>,
    ) -> Option<ParsedConfig> {
        let mut guard = latest_config.lock().unwrap();
        if Self::can_update_config(&parsed_config, &guard) {
            *guard = parsed_config.clone();
            drop(guard);

            on_new_config_tx.send_replace(parsed_config.clone());

            return Some(parsed_config);
        }

        None
    }

    fn bucket_type_changed(a: &Option<ParsedConfigBucket>, b: &Option<ParsedConfigBucket>) -> bool {
        match (a, b) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(a_bucket), Some(b_bucket)) => a_bucket.bucket_type != b_bucket.bucket_type,
        }
    }

    fn can_update_config(new_config: &ParsedConfig, old_config: &ParsedConfig) -> bool {
        if Self::bucket_type_changed(&new_config.bucket, &old_config.bucket) {
            debug!(
                "Switching config due to changed bucket type, old: {:?} new: {:?}",
                old_config.bucket, new_config.bucket
            );
            return true;
        }

        match new_config.partial_cmp(old_config) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => {
                // Equal versions from concurrent sources: first writer wins.
                debug!(
                    "Skipping config with matching revision rev_epoch={}, rev_id={}",
                    new_config.rev_epoch, new_config.rev_id
                );
                false
            }
            _ => {
                debug!(
                    "Skipping config with older revision old: rev_epoch={}, rev_id={} new: rev_epoch={}, rev_id={}",
                    old_config.rev_epoch, old_config.rev_id,
                    new_config.rev_epoch, new_config.rev_id
                );
                false
            }
        }
    }

    fn known_version(&self) -> ConfigVersion {
        let guard = self.latest_config.lock().unwrap();
        ConfigVersion {
            rev_epoch: guard.rev_epoch,
            rev_id: guard.rev_id,
        }
    }

    async fn fetch_one(&self, endpoint: &str) -> Option<ParsedConfig> {
        let client = match self
            .kv_client_manager
            .get_client(endpoint.to_string())
            .await
        {
            Ok(c) => c,
            Err(e) => {
                debug!("Config fetch could not get client for {endpoint}: {e}");
                return None;
            }
        };

        let known_version = self.known_version();
        let fetch = client.get_cluster_config(GetClusterConfigRequest {
            known_version: Some(ClusterConfigKnownVersion {
                rev_epoch: known_version.rev_epoch,
                rev_id: known_version.rev_id,
            }),
        });

        let resp = match timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                debug!("Config fetch from {endpoint} failed: {e}");
                return None;
            }
            Err(_e) => {
                debug!("Config fetch from {endpoint} timed out");
                return None;
            }
        };

        // A node that already knows our version replies with an empty body.
        if resp.config.is_empty() {
            return None;
        }

        let config_json: ClusterMapJson = match serde_json::from_slice(&resp.config) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to deserialize polled config from {endpoint}: {e}");
                return None;
            }
        };

        let hostname = client.remote_hostname().to_string();
        match ConfigParser::parse_cluster_map(config_json, &hostname) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Failed to parse polled config from {endpoint}: {e}");
                None
            }
        }
    }

    async fn run_poller(self: Arc<Self>, polling_period: Duration) {
        let mut endpoint_idx = 0usize;

        loop {
            select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Config poller shut down");
                    return;
                }
                _ = sleep(polling_period) => {}
            }

            let endpoint = {
                let endpoints = self.endpoints.lock().unwrap();
                if endpoints.is_empty() {
                    continue;
                }
                endpoint_idx = (endpoint_idx + 1) % endpoints.len();
                endpoints[endpoint_idx].clone()
            };

            if let Some(config) = self.fetch_one(&endpoint).await {
                Self::handle_config(&self.latest_config, config, &self.on_new_config_tx);
            }
        }
    }
}

impl<M: KvClientManager + 'static> StdConfigManager<M> {
    pub fn new(config: ConfigManagerConfig, opts: ConfigManagerOptions<M>) -> StdConfigManager<M> {
        let (on_new_config_tx, _on_new_config_rx) =
            watch::channel::<ParsedConfig>(opts.first_config.clone());

        let inner = Arc::new(StdConfigManagerInner {
            kv_client_manager: opts.kv_client_manager,
            fetch_timeout: opts.fetch_timeout,
            endpoints: Mutex::new(config.endpoints),
            latest_config: Mutex::new(opts.first_config),
            on_new_config_tx,
            shutdown: CancellationToken::new(),
        });

        let poller_inner = inner.clone();
        tokio::spawn(async move {
            poller_inner.run_poller(opts.polling_period).await;
        });

        StdConfigManager { inner }
    }
}

impl<M: KvClientManager + 'static> ConfigManager for StdConfigManager<M> {
    fn watch(&self) -> watch::Receiver<ParsedConfig> {
        self.inner.on_new_config_tx.subscribe()
    }

    fn reconfigure(&self, config: ConfigManagerConfig) -> Result<()> {
        let mut endpoints = self.inner.endpoints.lock().unwrap();
        *endpoints = config.endpoints;
        Ok(())
    }

    async fn out_of_band_version(
        &self,
        rev_id: i64,
        rev_epoch: i64,
        endpoint_id: String,
    ) -> Option<ParsedConfig> {
        {
            let latest = self.inner.latest_config.lock().unwrap();
            if rev_epoch < latest.rev_epoch
                || (rev_epoch == latest.rev_epoch && rev_id <= latest.rev_id)
            {
                debug!(
                    "Skipping out-of-band fetch, already have rev_epoch={}, rev_id={}",
                    latest.rev_epoch, latest.rev_id
                );
                return None;
            }
        }

        let config = self.inner.fetch_one(&endpoint_id).await?;

        StdConfigManagerInner::<M>::handle_config(
            &self.inner.latest_config,
            config,
            &self.inner.on_new_config_tx,
        )
    }

    fn out_of_band_config(&self, config: ParsedConfig) -> Option<ParsedConfig> {
        StdConfigManagerInner::<M>::handle_config(
            &self.inner.latest_config,
            config,
            &self.inner.on_new_config_tx,
        )
    }

    fn close(&self) {
        self.inner.shutdown.cancel();
    }
}

impl<M: KvClientManager> Drop for StdConfigManager<M> {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rev_epoch: i64, rev_id: i64) -> ParsedConfig {
        ParsedConfig {
            rev_epoch,
            rev_id,
            ..Default::default()
        }
    }

    fn apply(
        latest: &Mutex<ParsedConfig>,
        tx: &watch::Sender<ParsedConfig>,
        candidate: ParsedConfig,
    ) -> bool {
        StdConfigManagerInner::<DummyManager>::handle_config(latest, candidate, tx).is_some()
    }

    // handle_config is generic plumbing, any manager type parameter will do.
    struct DummyManager;

    impl KvClientManager for DummyManager {
        type Pool = DummyPool;

        async fn new(
            _config: crate::kvclientmanager::KvClientManagerConfig,
            _opts: crate::kvclientmanager::KvClientManagerOptions,
        ) -> Result<Self> {
            unimplemented!()
        }
        async fn reconfigure(
            &self,
            _config: crate::kvclientmanager::KvClientManagerConfig,
        ) -> Result<()> {
            unimplemented!()
        }
        async fn endpoints(&self) -> Vec<String> {
            unimplemented!()
        }
        async fn get_client(
            &self,
            _endpoint: String,
        ) -> Result<Arc<crate::kvclient::StdKvClient<crate::memd::client::Client>>> {
            unimplemented!()
        }
        async fn get_random_client(
            &self,
        ) -> Result<Arc<crate::kvclient::StdKvClient<crate::memd::client::Client>>> {
            unimplemented!()
        }
        async fn shutdown_client(
            &self,
            _endpoint: String,
            _client: Arc<crate::kvclient::StdKvClient<crate::memd::client::Client>>,
        ) -> Result<()> {
            unimplemented!()
        }
        async fn close(&self) -> Result<()> {
            unimplemented!()
        }
    }

    struct DummyPool;

    impl crate::kvclientpool::KvClientPool for DummyPool {
        type Client = crate::kvclient::StdKvClient<crate::memd::client::Client>;

        async fn new(
            _config: crate::kvclientpool::KvClientPoolConfig,
            _opts: crate::kvclientpool::KvClientPoolOptions,
        ) -> Self {
            unimplemented!()
        }
        async fn get_client(&self) -> Result<Arc<Self::Client>> {
            unimplemented!()
        }
        async fn shutdown_client(&self, _client: Arc<Self::Client>) {
            unimplemented!()
        }
        async fn reconfigure(&self, _config: crate::kvclientpool::KvClientPoolConfig) -> Result<()> {
            unimplemented!()
        }
        async fn close(&self) -> Result<()> {
            unimplemented!()
        }
    }

    #[test]
    fn versions_apply_monotonically() {
        let latest = Mutex::new(config(1, 1));
        let (tx, _rx) = watch::channel(config(1, 1));

        assert!(apply(&latest, &tx, config(1, 2)));
        assert!(apply(&latest, &tx, config(2, 1)));

        // Older and equal versions are dropped.
        assert!(!apply(&latest, &tx, config(1, 9)));
        assert!(!apply(&latest, &tx, config(2, 1)));

        let guard = latest.lock().unwrap();
        assert_eq!(guard.rev_epoch, 2);
        assert_eq!(guard.rev_id, 1);
    }

    #[test]
    fn current_version_is_max_seen() {
        let latest = Mutex::new(ParsedConfig::default());
        let (tx, _rx) = watch::channel(ParsedConfig::default());

        let sequence: [(i64, i64); 6] = [(1, 5), (1, 3), (2, 1), (1, 9), (2, 2), (2, 2)];
        let mut max = (0, -1);
        for (epoch, rev) in sequence {
            apply(&latest, &tx, config(epoch, rev));
            if (epoch, rev) > max {
                max = (epoch, rev);
            }

            let guard = latest.lock().unwrap();
            assert_eq!((guard.rev_epoch, guard.rev_id), max);
        }
    }
}
