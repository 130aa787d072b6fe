use std::sync::Arc;
use std::time::Duration;

use crate::address::Address;
use crate::auth_mechanism::AuthMechanism;
use crate::authenticator::Authenticator;
use crate::tls_config::TlsConfig;

#[derive(Clone)]
pub struct SeedConfig {
    pub kv_addrs: Vec<Address>,
    pub http_addrs: Vec<Address>,
}

#[derive(Clone)]
pub struct KvConfig {
    pub num_connections: usize,
    pub enable_error_map: bool,
    pub enable_mutation_tokens: bool,
    pub enable_server_durations: bool,
    pub connect_timeout: Duration,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            num_connections: 1,
            enable_error_map: true,
            enable_mutation_tokens: true,
            enable_server_durations: true,
            connect_timeout: Duration::from_secs(7),
        }
    }
}

#[derive(Clone)]
pub struct HttpConfig {
    pub idle_connection_timeout: Duration,
    pub max_idle_connections_per_host: Option<usize>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            idle_connection_timeout: Duration::from_secs(4500),
            max_idle_connections_per_host: None,
        }
    }
}

#[derive(Clone)]
pub struct ConfigPollerConfig {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for ConfigPollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2500),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct AgentOptions {
    pub seed_config: SeedConfig,
    pub authenticator: Arc<Authenticator>,
    pub bucket_name: Option<String>,
    pub tls_config: Option<TlsConfig>,
    pub network: Option<String>,
    pub auth_mechanisms: Vec<AuthMechanism>,
    pub tcp_keep_alive_time: Option<Duration>,
    pub disable_decompression: bool,

    pub kv_config: KvConfig,
    pub http_config: HttpConfig,
    pub config_poller_config: ConfigPollerConfig,
}

impl AgentOptions {
    pub fn new(seed_config: SeedConfig, authenticator: Authenticator) -> Self {
        Self {
            seed_config,
            authenticator: Arc::new(authenticator),
            bucket_name: None,
            tls_config: None,
            network: None,
            auth_mechanisms: vec![],
            tcp_keep_alive_time: None,
            disable_decompression: false,
            kv_config: KvConfig::default(),
            http_config: HttpConfig::default(),
            config_poller_config: ConfigPollerConfig::default(),
        }
    }

    pub fn bucket_name(mut self, bucket_name: impl Into<Option<String>>) -> Self {
        self.bucket_name = bucket_name.into();
        self
    }

    pub fn tls_config(mut self, tls_config: impl Into<Option<TlsConfig>>) -> Self {
        self.tls_config = tls_config.into();
        self
    }

    pub fn network(mut self, network: impl Into<Option<String>>) -> Self {
        self.network = network.into();
        self
    }
}
