use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

use crate::error::ErrorKind;
use crate::error::Result;
use crate::kvclient::KvClient;
use crate::kvclient_ops::KvClientOps;
use crate::kvclientpool::{KvClientPool, KvClientPoolConfig, KvClientPoolOptions};
use crate::randgen;

pub(crate) type KvClientManagerClientType<M> =
    <<M as KvClientManager>::Pool as KvClientPool>::Client;

pub(crate) trait KvClientManager: Sized + Send + Sync {
    type Pool: KvClientPool + Send + Sync;

    fn new(
        config: KvClientManagerConfig,
        opts: KvClientManagerOptions,
    ) -> impl Future<Output = Result<Self>> + Send;
    fn reconfigure(&self, config: KvClientManagerConfig)
        -> impl Future<Output = Result<()>> + Send;
    fn endpoints(&self) -> impl Future<Output = Vec<String>> + Send;
    fn get_client(
        &self,
        endpoint: String,
    ) -> impl Future<Output = Result<Arc<KvClientManagerClientType<Self>>>> + Send;
    fn get_random_client(
        &self,
    ) -> impl Future<Output = Result<Arc<KvClientManagerClientType<Self>>>> + Send;
    fn shutdown_client(
        &self,
        endpoint: String,
        client: Arc<KvClientManagerClientType<Self>>,
    ) -> impl Future<Output = Result<()>> + Send;
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

pub(crate) struct KvClientManagerConfig {
    pub num_pool_connections: usize,
    pub clients: HashMap<String, crate::kvclientpool::KvClientConfig>,
}

#[derive(Clone)]
pub(crate) struct KvClientManagerOptions {
    pub pool_options: KvClientPoolOptions,
}

struct KvClientManagerPool<P>
where
    P: KvClientPool,
{
    config: KvClientPoolConfig,
    pool: Arc<P>,
}

#[derive(Default)]
struct KvClientManagerState<P>
where
    P: KvClientPool,
{
    pub client_pools: HashMap<String, KvClientManagerPool<P>>,
}

pub(crate) struct StdKvClientManager<P>
where
    P: KvClientPool,
{
    state: Mutex<KvClientManagerState<P>>,
    opts: KvClientManagerOptions,
}

impl<P> StdKvClientManager<P>
where
    P: KvClientPool,
{
    async fn get_pool(&self, endpoint: &str) -> Result<Arc<P>> {
        let state = self.state.lock().await;

        let pool = match state.client_pools.get(endpoint) {
            Some(p) => p,
            None => {
                return Err(ErrorKind::EndpointNotKnown {
                    endpoint: endpoint.to_string(),
                }
                .into());
            }
        };

        Ok(pool.pool.clone())
    }

    async fn get_random_pool(&self) -> Result<Arc<P>> {
        let state = self.state.lock().await;

        if state.client_pools.is_empty() {
            return Err(ErrorKind::NoEndpointsAvailable.into());
        }

        let picked = randgen::random_usize_below(state.client_pools.len());
        if let Some((_, pool)) = state.client_pools.iter().nth(picked) {
            return Ok(pool.pool.clone());
        }

        Err(ErrorKind::NoEndpointsAvailable.into())
    }

    async fn create_pool(
        &self,
        endpoint_id: String,
        pool_config: KvClientPoolConfig,
    ) -> KvClientManagerPool<P> {
        let mut pool_options = self.opts.pool_options.clone();
        pool_options.endpoint_id = endpoint_id;

        let pool = P::new(pool_config.clone(), pool_options).await;

        KvClientManagerPool {
            config: pool_config,
            pool: Arc::new(pool),
        }
    }
}

impl<P> KvClientManager for StdKvClientManager<P>
where
    P: KvClientPool,
{
    type Pool = P;

    async fn new(config: KvClientManagerConfig, opts: KvClientManagerOptions) -> Result<Self> {
        let manager = Self {
            state: Mutex::new(KvClientManagerState {
                client_pools: Default::default(),
            }),
            opts,
        };

        manager.reconfigure(config).await?;
        Ok(manager)
    }

    async fn reconfigure(&self, config: KvClientManagerConfig) -> Result<()> {
        let mut guard = self.state.lock().await;

        let mut old_pools = std::mem::take(&mut guard.client_pools);

        let mut new_state = KvClientManagerState::<P> {
            client_pools: Default::default(),
        };

        for (endpoint, endpoint_config) in config.clients {
            let pool_config = KvClientPoolConfig {
                num_connections: config.num_pool_connections,
                client_config: endpoint_config,
            };

            let old_pool = old_pools.remove(&endpoint);
            let new_pool = if let Some(pool) = old_pool {
                if pool.pool.reconfigure(pool_config.clone()).await.is_ok() {
                    KvClientManagerPool {
                        config: pool_config,
                        pool: pool.pool,
                    }
                } else {
                    self.create_pool(endpoint.clone(), pool_config).await
                }
            } else {
                self.create_pool(endpoint.clone(), pool_config).await
            };

            new_state.client_pools.insert(endpoint, new_pool);
        }

        for (endpoint, pool) in old_pools {
            debug!("Closing pool for removed endpoint {endpoint}");
            pool.pool.close().await.unwrap_or_default();
        }

        *guard = new_state;

        Ok(())
    }

    async fn endpoints(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.client_pools.keys().cloned().collect()
    }

    async fn get_client(&self, endpoint: String) -> Result<Arc<KvClientManagerClientType<Self>>> {
        let pool = self.get_pool(&endpoint).await?;

        pool.get_client().await
    }

    async fn get_random_client(&self) -> Result<Arc<KvClientManagerClientType<Self>>> {
        let pool = self.get_random_pool().await?;

        pool.get_client().await
    }

    async fn shutdown_client(
        &self,
        endpoint: String,
        client: Arc<KvClientManagerClientType<Self>>,
    ) -> Result<()> {
        let pool = self.get_pool(&endpoint).await?;

        pool.shutdown_client(client).await;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.state.lock().await;

        let old_pools = std::mem::take(&mut guard.client_pools);

        for (_, pool) in old_pools {
            pool.pool.close().await.unwrap_or_default();
        }

        Ok(())
    }
}

pub(crate) async fn orchestrate_memd_client<Resp, M, Fut>(
    manager: Arc<M>,
    endpoint: String,
    operation: impl Fn(Arc<KvClientManagerClientType<M>>) -> Fut,
) -> Result<Resp>
where
    M: KvClientManager,
    Fut: Future<Output = Result<Resp>> + Send,
{
    loop {
        let client = manager.get_client(endpoint.clone()).await?;

        let res = operation(client.clone()).await;
        return match res {
            Ok(r) => Ok(r),
            Err(e) => {
                if let Some(memd_err) = e.is_memd_error() {
                    if memd_err.is_dispatch_error() {
                        // A failed write never reached the server; swap the
                        // client out and try another.
                        debug!("Dispatch failed on {endpoint}, replacing client");
                        manager
                            .shutdown_client(endpoint.clone(), client)
                            .await
                            .unwrap_or_default();
                        continue;
                    }
                }

                Err(e)
            }
        };
    }
}

pub(crate) async fn orchestrate_random_memd_client<Resp, M, Fut>(
    manager: Arc<M>,
    operation: impl Fn(Arc<KvClientManagerClientType<M>>) -> Fut,
) -> Result<Resp>
where
    M: KvClientManager,
    Fut: Future<Output = Result<Resp>> + Send,
{
    loop {
        let client = manager.get_random_client().await?;

        let res = operation(client.clone()).await;
        return match res {
            Ok(r) => Ok(r),
            Err(e) => {
                if let Some(memd_err) = e.is_memd_error() {
                    if memd_err.is_dispatch_error() {
                        continue;
                    }
                }

                Err(e)
            }
        };
    }
}
