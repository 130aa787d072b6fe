use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::bucket::Bucket;
use crate::error::{Error, ErrorKind, Result};
use crate::options::QueryOptions;
use crate::query_result::QueryResult;
use shoal_core::agent::Agent;
use shoal_core::agentoptions::{AgentOptions, SeedConfig};
use shoal_core::authenticator::{Authenticator, PasswordAuthenticator};
use shoal_core::tls_config::TlsConfig;

pub(crate) const DEFAULT_KV_TIMEOUT: Duration = Duration::from_millis(2500);
pub(crate) const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(75);

#[derive(Clone)]
pub struct ClusterOptions {
    pub username: String,
    pub password: String,
    pub tls_config: Option<TlsConfig>,
    pub kv_timeout: Duration,
    pub query_timeout: Duration,
}

impl ClusterOptions {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            tls_config: None,
            kv_timeout: DEFAULT_KV_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn tls_config(mut self, tls_config: impl Into<Option<TlsConfig>>) -> Self {
        self.tls_config = tls_config.into();
        self
    }
}

pub(crate) struct ClusterInner {
    pub(crate) seeds: SeedConfig,
    pub(crate) authenticator: Arc<Authenticator>,
    pub(crate) tls_config: Option<TlsConfig>,
    pub(crate) kv_timeout: Duration,
    pub(crate) query_timeout: Duration,

    // The cluster-level agent serves bucket-agnostic traffic (queries and
    // management). Bucket handles own their bucket-scoped agents; the
    // cluster deliberately keeps no references to them.
    pub(crate) cluster_agent: Agent,
}

/// The entry point: connects to a cluster given a connection string and
/// credentials, and hands out bucket handles.
#[derive(Clone)]
pub struct Cluster {
    pub(crate) inner: Arc<ClusterInner>,
}

impl Cluster {
    pub async fn connect(conn_str: impl AsRef<str>, opts: ClusterOptions) -> Result<Cluster> {
        let conn_spec = shoal_connstr::parse(conn_str)
            .map_err(|_e| Error::new(ErrorKind::InvalidArgument))?;
        let resolved = shoal_connstr::resolve(conn_spec, None)
            .await
            .map_err(|_e| Error::new(ErrorKind::InvalidArgument))?;

        let tls_config = if resolved.use_tls {
            match opts.tls_config.clone() {
                Some(tls) => Some(tls),
                None => Some(default_tls_config()),
            }
        } else {
            if opts.tls_config.is_some() {
                debug!("Ignoring tls config for plaintext scheme");
            }
            None
        };

        let seeds = SeedConfig {
            kv_addrs: resolved
                .kv_hosts
                .iter()
                .map(|a| shoal_core::address::Address {
                    host: a.host.clone(),
                    port: a.port,
                })
                .collect(),
            http_addrs: resolved
                .http_hosts
                .iter()
                .map(|a| shoal_core::address::Address {
                    host: a.host.clone(),
                    port: a.port,
                })
                .collect(),
        };

        let authenticator = Arc::new(Authenticator::PasswordAuthenticator(
            PasswordAuthenticator {
                username: opts.username.clone(),
                password: opts.password.clone(),
            },
        ));

        let mut agent_opts = AgentOptions::new(
            seeds.clone(),
            Authenticator::PasswordAuthenticator(PasswordAuthenticator {
                username: opts.username.clone(),
                password: opts.password.clone(),
            }),
        );
        agent_opts.tls_config = tls_config.clone();

        let cluster_agent = Agent::new(agent_opts).await.map_err(Error::from)?;

        Ok(Cluster {
            inner: Arc::new(ClusterInner {
                seeds,
                authenticator,
                tls_config,
                kv_timeout: opts.kv_timeout,
                query_timeout: opts.query_timeout,
                cluster_agent,
            }),
        })
    }

    /// Opens a bucket: creates the bucket-scoped agent and waits for its
    /// first config.
    pub async fn bucket(&self, name: impl Into<String>) -> Result<Bucket> {
        Bucket::open(self.inner.clone(), name.into()).await
    }

    pub async fn query(
        &self,
        statement: impl Into<String>,
        opts: QueryOptions,
    ) -> Result<QueryResult> {
        let timeout = opts.timeout.unwrap_or(self.inner.query_timeout);

        let core_opts = shoal_core::querycomponent::QueryOptions {
            statement: statement.into(),
            client_context_id: opts.client_context_id,
            args: opts.args,
            readonly: opts.readonly,
            scan_consistency: opts.scan_consistency,
            timeout: Some(format!("{}ms", timeout.as_millis())),
            ..Default::default()
        };

        let rows = tokio::time::timeout(timeout, self.inner.cluster_agent.query(core_opts))
            .await
            .map_err(|_e| Error::new_timeout(false))?
            .map_err(Error::from)?;

        Ok(QueryResult::new(rows))
    }
}

#[cfg(feature = "rustls-tls")]
fn default_tls_config() -> TlsConfig {
    let mut root_store = tokio_rustls::rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Arc::new(
        tokio_rustls::rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}
