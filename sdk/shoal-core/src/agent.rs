use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::address::Address;
use crate::agentoptions::AgentOptions;
use crate::auth_mechanism::AuthMechanism;
use crate::authenticator::Authenticator;
use crate::clustermap::ClusterMapJson;
use crate::collection_resolver_cached::{
    CollectionResolverCached, CollectionResolverCachedOptions,
};
use crate::collection_resolver_memd::{CollectionResolverMemd, CollectionResolverMemdOptions};
use crate::componentconfigs::AgentComponentConfigs;
use crate::configmanager::{
    ConfigManager, ConfigManagerConfig, ConfigManagerOptions, StdConfigManager,
};
use crate::configparser::ConfigParser;
use crate::crudcomponent::CrudComponent;
use crate::errmap::ErrMapComponent;
use crate::error::{Error, ErrorKind, Result};
use crate::features::BucketFeature;
use crate::httpx::client::{Client as HttpClient, ClientConfig, ReqwestClient};
use crate::httpx::request::{Auth, BasicAuth};
use crate::kvclient::{
    KvClient, KvClientBootstrapOptions, KvClientOptions, StdKvClient, UnsolicitedPacket,
};
use crate::kvclient_ops::KvClientOps;
use crate::kvclientmanager::{
    KvClientManager, KvClientManagerConfig, KvClientManagerOptions, StdKvClientManager,
};
use crate::kvclientpool::{KvClientPoolOptions, StdKvClientPool};
use crate::memd::client::Client;
use crate::memd::opcode::OpCode;
use crate::memd::request::GetClusterConfigRequest;
use crate::mgmtcomponent::{MgmtComponent, MgmtComponentOptions};
use crate::mgmtx;
use crate::mgmtx::options::{GetTerseBucketConfigOptions, GetTerseClusterConfigOptions};
use crate::analyticscomponent::{AnalyticsComponent, AnalyticsComponentOptions};
use crate::networktypeheuristic::NetworkTypeHeuristic;
use crate::nmvbhandler::{ConfigUpdater, StdNotMyVbucketConfigHandler};
use crate::parsedconfig::{ParsedConfig, ParsedConfigBucketFeature};
use crate::querycomponent::{QueryComponent, QueryComponentOptions};
use crate::rangescancomponent::RangeScanComponent;
use crate::retry::RetryManager;
use crate::searchcomponent::{SearchComponent, SearchComponentOptions};
use crate::tls_config::TlsConfig;
use crate::util::{get_host_port_from_uri, get_hostname_from_host_port};
use crate::vbucketrouter::VbucketRouter;
use crate::viewcomponent::{ViewComponent, ViewComponentOptions};

#[derive(Clone)]
struct AgentState {
    bucket: Option<String>,
    tls_config: Option<TlsConfig>,
    authenticator: Arc<Authenticator>,
    auth_mechanisms: Vec<AuthMechanism>,
    num_pool_connections: usize,
    latest_config: ParsedConfig,
    network_type: String,

    disable_error_map: bool,
    disable_mutation_tokens: bool,
    disable_server_durations: bool,
    disable_decompression: bool,
    kv_connect_timeout: Duration,
    tcp_keep_alive_time: Duration,
}

pub(crate) type AgentClientManager = StdKvClientManager<StdKvClientPool<StdKvClient<Client>>>;
pub(crate) type AgentCollectionResolver =
    CollectionResolverCached<CollectionResolverMemd<AgentClientManager>>;
pub(crate) type AgentCrudComponent = CrudComponent<
    AgentClientManager,
    crate::vbucketrouter::StdVbucketRouter,
    StdNotMyVbucketConfigHandler<AgentInner>,
    AgentCollectionResolver,
>;
pub(crate) type AgentRangeScanComponent = RangeScanComponent<
    AgentClientManager,
    crate::vbucketrouter::StdVbucketRouter,
    StdNotMyVbucketConfigHandler<AgentInner>,
    AgentCollectionResolver,
>;

pub(crate) struct AgentInner {
    state: Mutex<AgentState>,

    cfg_manager: StdConfigManager<AgentClientManager>,
    conn_mgr: Arc<AgentClientManager>,
    vb_router: Arc<crate::vbucketrouter::StdVbucketRouter>,
    collections: Arc<AgentCollectionResolver>,
    retry_manager: Arc<RetryManager>,
    err_map_component: Arc<ErrMapComponent>,
    http_client: Arc<ReqwestClient>,

    pub(crate) crud: AgentCrudComponent,
    pub(crate) range_scans: AgentRangeScanComponent,

    pub(crate) query: QueryComponent<ReqwestClient>,
    pub(crate) analytics: AnalyticsComponent<ReqwestClient>,
    pub(crate) search: SearchComponent<ReqwestClient>,
    pub(crate) views: ViewComponent<ReqwestClient>,
    pub(crate) mgmt: MgmtComponent<ReqwestClient>,
}

/// One bucket's connection runtime: the pooled kv connections, the topology
/// tracker and the operation components built on top of them.
pub struct Agent {
    pub(crate) inner: Arc<AgentInner>,
    client_name: String,
}

impl AgentInner {
    fn gen_agent_component_configs_locked(state: &AgentState) -> AgentComponentConfigs {
        AgentComponentConfigs::gen_from_config(
            &state.latest_config,
            &state.network_type,
            state.tls_config.clone(),
            state.bucket.clone(),
            state.authenticator.clone(),
        )
    }

    // Server request opcode 0x01 is the brief clustermap change notification:
    // extras carry the new (epoch, revision), the body optionally carries the
    // config itself.
    pub async fn unsolicited_packet_handler(&self, up: UnsolicitedPacket) {
        let packet = up.packet;
        if packet.op_code != OpCode::Set {
            debug!("Ignoring unsolicited packet with opcode {}", packet.op_code);
            return;
        }

        let extras = match &packet.extras {
            Some(extras) if extras.len() >= 16 => extras,
            _ => {
                warn!("Received clustermap notification with bad extras");
                return;
            }
        };

        let server_rev_epoch = BigEndian::read_i64(&extras[0..8]);
        let server_rev_id = BigEndian::read_i64(&extras[8..16]);

        if let Some(value) = &packet.value {
            if !value.is_empty() {
                let config_json: ClusterMapJson = match serde_json::from_slice(value) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("Failed to parse clustermap notification body: {e}");
                        return;
                    }
                };

                self.apply_cluster_map_config(config_json, &up.endpoint_id).await;
                return;
            }
        }

        if let Some(config) = self
            .cfg_manager
            .out_of_band_version(server_rev_id, server_rev_epoch, up.endpoint_id)
            .await
        {
            self.apply_config(config).await;
        }
    }

    pub async fn apply_config(&self, config: ParsedConfig) {
        let mut state = self.state.lock().await;

        info!(
            "Agent applying updated config: rev_id={rev_id}, rev_epoch={rev_epoch}",
            rev_id = config.rev_id,
            rev_epoch = config.rev_epoch
        );
        state.latest_config = config;

        self.update_state_locked(&mut state).await;
    }

    async fn update_state_locked(&self, state: &mut AgentState) {
        let agent_component_configs = Self::gen_agent_component_configs_locked(state);

        if let Err(e) = self
            .conn_mgr
            .reconfigure(KvClientManagerConfig {
                num_pool_connections: state.num_pool_connections,
                clients: agent_component_configs.kv_client_configs,
            })
            .await
        {
            error!("Failed to reconfigure connection manager; {e}");
        }

        self.vb_router
            .update_vbucket_info(agent_component_configs.vbucket_routing_info);

        if let Err(e) = self
            .cfg_manager
            .reconfigure(agent_component_configs.config_manager_config)
        {
            error!("Failed to reconfigure config manager; {e}");
        }

        self.query.reconfigure(agent_component_configs.query_config);
        self.analytics
            .reconfigure(agent_component_configs.analytics_config);
        self.search
            .reconfigure(agent_component_configs.search_config);
        self.views.reconfigure(agent_component_configs.view_config);
        self.mgmt.reconfigure(agent_component_configs.mgmt_config);
    }

    pub async fn bucket_features(&self) -> Result<Vec<BucketFeature>> {
        let guard = self.state.lock().await;

        if let Some(bucket) = &guard.latest_config.bucket {
            let mut features = vec![];

            for feature in &bucket.features {
                match feature {
                    ParsedConfigBucketFeature::RangeScan => features.push(BucketFeature::RangeScan),
                    ParsedConfigBucketFeature::Collections => {
                        features.push(BucketFeature::Collections)
                    }
                    ParsedConfigBucketFeature::DurableWrites => {
                        features.push(BucketFeature::DurableWrites)
                    }
                    ParsedConfigBucketFeature::ReplicaRead => {
                        features.push(BucketFeature::ReplicaRead)
                    }
                    ParsedConfigBucketFeature::NonDedupedHistory => {
                        features.push(BucketFeature::NonDedupedHistory)
                    }
                    _ => {}
                }
            }

            return Ok(features);
        }

        Err(ErrorKind::NoBucket.into())
    }

    pub async fn close(&self) {
        self.cfg_manager.close();
        self.conn_mgr.close().await.unwrap_or_default();
    }
}

impl ConfigUpdater for AgentInner {
    async fn apply_cluster_map_config(&self, config: ClusterMapJson, source_hostname: &str) {
        let source_hostname = match get_hostname_from_host_port(source_hostname) {
            Ok(h) => h,
            Err(_e) => source_hostname.to_string(),
        };

        let parsed_config = match ConfigParser::parse_cluster_map(config, &source_hostname) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to parse pushed config: {e}");
                return;
            }
        };

        if let Some(config) = self.cfg_manager.out_of_band_config(parsed_config) {
            self.apply_config(config).await;
        }
    }
}

impl Agent {
    pub async fn new(opts: AgentOptions) -> Result<Self> {
        let build_version = env!("CARGO_PKG_VERSION");
        let client_name = format!("shoal-rs-core {build_version}");
        info!("Creating new agent {client_name}");

        if !opts.auth_mechanisms.is_empty() {
            if opts.tls_config.is_none() && opts.auth_mechanisms.contains(&AuthMechanism::Plain) {
                warn!("PLAIN sends credentials in plaintext, this will cause credential leakage on the network");
            }
        }

        let mut state = AgentState {
            bucket: opts.bucket_name.clone(),
            authenticator: opts.authenticator.clone(),
            num_pool_connections: opts.kv_config.num_connections,
            latest_config: ParsedConfig::default(),
            network_type: "".to_string(),
            tls_config: opts.tls_config.clone(),
            auth_mechanisms: opts.auth_mechanisms.clone(),
            disable_error_map: !opts.kv_config.enable_error_map,
            disable_mutation_tokens: !opts.kv_config.enable_mutation_tokens,
            disable_server_durations: !opts.kv_config.enable_server_durations,
            disable_decompression: opts.disable_decompression,
            kv_connect_timeout: opts.kv_config.connect_timeout,
            tcp_keep_alive_time: opts
                .tcp_keep_alive_time
                .unwrap_or_else(|| Duration::from_secs(60)),
        };

        let http_client = Arc::new(ReqwestClient::new(ClientConfig {
            tls_config: state.tls_config.clone(),
            idle_connection_timeout: opts.http_config.idle_connection_timeout,
            max_idle_connections_per_host: opts.http_config.max_idle_connections_per_host,
            tcp_keep_alive_time: state.tcp_keep_alive_time,
        })?);

        let err_map_component = Arc::new(ErrMapComponent::new());

        let first_config = Self::get_first_config(
            client_name.clone(),
            &opts.seed_config.kv_addrs,
            &opts.seed_config.http_addrs,
            &state,
            http_client.clone(),
            err_map_component.clone(),
        )
        .await?;

        state.latest_config = first_config.clone();

        let network_type = match &opts.network {
            Some(network) if !network.is_empty() && network != "auto" => network.clone(),
            _ => NetworkTypeHeuristic::identify(&state.latest_config),
        };
        info!("Agent selected network type {network_type}");
        state.network_type = network_type;

        let agent_component_configs = AgentInner::gen_agent_component_configs_locked(&state);

        let (unsolicited_packet_tx, mut unsolicited_packet_rx) = mpsc::unbounded_channel();

        let err_map_component_conn_mgr = err_map_component.clone();
        let conn_mgr = Arc::new(
            StdKvClientManager::new(
                KvClientManagerConfig {
                    num_pool_connections: state.num_pool_connections,
                    clients: agent_component_configs.kv_client_configs,
                },
                KvClientManagerOptions {
                    pool_options: KvClientPoolOptions {
                        bootstrap_options: KvClientBootstrapOptions {
                            client_name: client_name.clone(),
                            disable_error_map: state.disable_error_map,
                            disable_mutation_tokens: state.disable_mutation_tokens,
                            disable_server_durations: state.disable_server_durations,
                            on_err_map_fetched: Some(Arc::new(move |err_map| {
                                err_map_component_conn_mgr.on_err_map(err_map);
                            })),
                            tcp_keep_alive_time: state.tcp_keep_alive_time,
                            auth_mechanisms: state.auth_mechanisms.clone(),
                            connect_timeout: state.kv_connect_timeout,
                        },
                        endpoint_id: "".to_string(),
                        unsolicited_packet_tx: Some(unsolicited_packet_tx),
                        orphan_handler: Some(Arc::new(|packet| {
                            debug!(
                                "Orphaned response. Opcode={}. Opaque={}. Status={}",
                                packet.op_code, packet.opaque, packet.status,
                            );
                        })),
                        disable_decompression: state.disable_decompression,
                    },
                },
            )
            .await?,
        );

        let cfg_manager = StdConfigManager::new(
            agent_component_configs.config_manager_config,
            ConfigManagerOptions {
                polling_period: opts.config_poller_config.poll_interval,
                fetch_timeout: opts.config_poller_config.fetch_timeout,
                kv_client_manager: conn_mgr.clone(),
                first_config: first_config.clone(),
            },
        );

        let vb_router = Arc::new(crate::vbucketrouter::StdVbucketRouter::new(
            agent_component_configs.vbucket_routing_info,
            crate::vbucketrouter::VbucketRouterOptions::default(),
        ));

        let nmvb_handler = Arc::new(StdNotMyVbucketConfigHandler::new());

        let collections = Arc::new(CollectionResolverCached::new(
            CollectionResolverCachedOptions {
                resolver: CollectionResolverMemd::new(CollectionResolverMemdOptions {
                    conn_mgr: conn_mgr.clone(),
                }),
            },
        ));

        let retry_manager = Arc::new(RetryManager::new(err_map_component.clone()));

        let crud = CrudComponent::new(
            nmvb_handler.clone(),
            vb_router.clone(),
            conn_mgr.clone(),
            collections.clone(),
            retry_manager.clone(),
            opts.bucket_name.clone(),
        );

        let range_scans = RangeScanComponent::new(
            nmvb_handler.clone(),
            vb_router.clone(),
            conn_mgr.clone(),
            collections.clone(),
            retry_manager.clone(),
        );

        let query = QueryComponent::new(
            retry_manager.clone(),
            http_client.clone(),
            agent_component_configs.query_config,
            QueryComponentOptions {
                user_agent: client_name.clone(),
            },
        );

        let analytics = AnalyticsComponent::new(
            retry_manager.clone(),
            http_client.clone(),
            agent_component_configs.analytics_config,
            AnalyticsComponentOptions {
                user_agent: client_name.clone(),
            },
        );

        let search = SearchComponent::new(
            retry_manager.clone(),
            http_client.clone(),
            agent_component_configs.search_config,
            SearchComponentOptions {
                user_agent: client_name.clone(),
            },
        );

        let views = ViewComponent::new(
            retry_manager.clone(),
            http_client.clone(),
            agent_component_configs.view_config,
            ViewComponentOptions {
                user_agent: client_name.clone(),
            },
        );

        let mgmt = MgmtComponent::new(
            retry_manager.clone(),
            http_client.clone(),
            agent_component_configs.mgmt_config,
            MgmtComponentOptions {
                user_agent: client_name.clone(),
            },
        );

        let inner = Arc::new(AgentInner {
            state: Mutex::new(state),
            cfg_manager,
            conn_mgr,
            vb_router,
            collections,
            retry_manager,
            err_map_component,
            http_client,
            crud,
            range_scans,
            query,
            analytics,
            search,
            views,
            mgmt,
        });

        let inner_weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(packet) = unsolicited_packet_rx.recv().await {
                if let Some(inner) = inner_weak.upgrade() {
                    inner.unsolicited_packet_handler(packet).await;
                } else {
                    break;
                }
            }
            debug!("Unsolicited packet handler exited");
        });

        nmvb_handler.set_watcher(Arc::downgrade(&inner)).await;

        Self::start_config_watcher(Arc::downgrade(&inner), &inner.cfg_manager);

        let agent = Agent {
            inner,
            client_name: client_name.clone(),
        };

        info!("Agent {client_name} created");

        Ok(agent)
    }

    fn start_config_watcher(
        inner: Weak<AgentInner>,
        config_manager: &impl ConfigManager,
    ) -> JoinHandle<()> {
        let mut watch_rx = config_manager.watch();

        tokio::spawn(async move {
            loop {
                match watch_rx.changed().await {
                    Ok(_) => {
                        let pc = { watch_rx.borrow_and_update().clone() };
                        if let Some(i) = inner.upgrade() {
                            i.apply_config(pc).await;
                        } else {
                            debug!("Config watcher inner dropped, exiting");
                            return;
                        }
                    }
                    Err(_e) => {
                        debug!("Config watcher channel closed");
                        return;
                    }
                }
            }
        })
    }

    async fn get_first_config(
        client_name: String,
        kv_addrs: &[Address],
        http_addrs: &[Address],
        state: &AgentState,
        http_client: Arc<ReqwestClient>,
        err_map_component: Arc<ErrMapComponent>,
    ) -> Result<ParsedConfig> {
        loop {
            for addr in kv_addrs {
                let err_map_component_clone = err_map_component.clone();
                let client_result: Result<StdKvClient<Client>> =
                    StdKvClient::new(KvClientOptions {
                        address: addr.clone(),
                        tls_config: state.tls_config.clone(),
                        authenticator: state.authenticator.clone(),
                        selected_bucket: state.bucket.clone(),
                        bootstrap_options: KvClientBootstrapOptions {
                            client_name: client_name.clone(),
                            disable_error_map: state.disable_error_map,
                            disable_mutation_tokens: true,
                            disable_server_durations: true,
                            on_err_map_fetched: Some(Arc::new(move |err_map| {
                                err_map_component_clone.on_err_map(err_map);
                            })),
                            tcp_keep_alive_time: state.tcp_keep_alive_time,
                            auth_mechanisms: state.auth_mechanisms.clone(),
                            connect_timeout: state.kv_connect_timeout,
                        },
                        endpoint_id: "".to_string(),
                        unsolicited_packet_tx: None,
                        orphan_handler: None,
                        on_close_tx: None,
                        disable_decompression: false,
                        id: Uuid::new_v4().to_string(),
                    })
                    .await;

                let client = match client_result {
                    Ok(client) => client,
                    Err(e) => {
                        warn!("Failed to bootstrap against {addr}: {e}");
                        continue;
                    }
                };

                let raw_config = match client
                    .get_cluster_config(GetClusterConfigRequest::default())
                    .await
                {
                    Ok(resp) => resp.config,
                    Err(e) => {
                        warn!("Failed to fetch first config from {addr}: {e}");
                        client.close().await.unwrap_or_default();
                        continue;
                    }
                };

                client.close().await.unwrap_or_default();

                let config: ClusterMapJson = match serde_json::from_slice(&raw_config) {
                    Ok(c) => c,
                    Err(e) => {
                        return Err(Error::new_message_error(&format!(
                            "failed to deserialize config: {e}"
                        )));
                    }
                };

                match ConfigParser::parse_cluster_map(config, &addr.host) {
                    Ok(c) => return Ok(c),
                    Err(e) => {
                        warn!("Failed to parse first config from {addr}: {e}");
                        continue;
                    }
                }
            }

            info!("Failed to fetch config over kv, attempting http");
            for addr in http_addrs {
                match Self::fetch_http_config(
                    http_client.clone(),
                    addr,
                    state.tls_config.is_some(),
                    &client_name,
                    &state.authenticator,
                    state.bucket.clone(),
                )
                .await
                {
                    Ok(c) => return Ok(c),
                    Err(e) => {
                        warn!("Failed to bootstrap config over http from {addr}: {e}");
                    }
                }
            }

            info!("Failed to fetch config from any seed");
            sleep(Duration::from_secs(1)).await;
        }
    }

    async fn fetch_http_config(
        http_client: Arc<ReqwestClient>,
        addr: &Address,
        use_tls: bool,
        user_agent: &str,
        authenticator: &Authenticator,
        bucket_name: Option<String>,
    ) -> Result<ParsedConfig> {
        let scheme = if use_tls { "https" } else { "http" };
        let endpoint = format!("{scheme}://{addr}");
        debug!("Polling config from {endpoint}");

        let host_port = get_host_port_from_uri(&endpoint)?;
        let hostname = get_hostname_from_host_port(&host_port)?;

        let auth = match authenticator {
            Authenticator::PasswordAuthenticator(a) => {
                let user_pass =
                    a.get_credentials(&crate::service_type::ServiceType::MGMT, host_port)?;
                Auth::BasicAuth(BasicAuth::new(user_pass.username, user_pass.password))
            }
            Authenticator::CertificateAuthenticator(_a) => {
                Auth::BasicAuth(BasicAuth::new("", ""))
            }
        };

        let mgmt = mgmtx::mgmt::Management {
            http_client,
            user_agent: user_agent.to_string(),
            endpoint,
            auth,
        };

        let config = if let Some(bucket_name) = bucket_name {
            mgmt.get_terse_bucket_config(&GetTerseBucketConfigOptions {
                bucket_name: &bucket_name,
            })
            .await
            .map_err(Error::from)?
        } else {
            mgmt.get_terse_cluster_config(&GetTerseClusterConfigOptions {})
                .await
                .map_err(Error::from)?
        };

        ConfigParser::parse_cluster_map(config, &hostname)
    }

    pub async fn bucket_features(&self) -> Result<Vec<BucketFeature>> {
        self.inner.bucket_features().await
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        debug!(
            "Dropping agent {}, {} strong references remain",
            self.client_name,
            Arc::strong_count(&self.inner)
        );
    }
}
