use std::future::Future;
use std::net::SocketAddr;
use std::ops::Add;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use crate::address::Address;
use crate::auth_mechanism::AuthMechanism;
use crate::authenticator::Authenticator;
use crate::error::{Error, Result};
use crate::memd;
use crate::memd::connection::{ConnectOptions, ConnectionType, TcpConnection};
use crate::memd::dispatcher::{Dispatcher, DispatcherOptions, OrphanResponseHandler};
use crate::memd::hello_feature::HelloFeature;
use crate::memd::op_auth_saslauto::SASLAuthAutoOptions;
use crate::memd::op_auth_saslbyname::Credentials;
use crate::memd::op_bootstrap::BootstrapOptions;
use crate::memd::packet::ResponsePacket;
use crate::memd::request::{
    GetClusterConfigRequest, GetErrorMapRequest, HelloRequest, SelectBucketRequest,
};
use crate::service_type::ServiceType;
use crate::tls_config::TlsConfig;
use crate::util::hostname_from_addr_str;

#[derive(Clone)]
pub(crate) struct KvClientBootstrapOptions {
    pub client_name: String,

    pub disable_error_map: bool,
    pub disable_mutation_tokens: bool,
    pub disable_server_durations: bool,

    pub on_err_map_fetched: Option<OnErrMapFetchedHandler>,
    pub tcp_keep_alive_time: Duration,
    pub auth_mechanisms: Vec<AuthMechanism>,
    pub connect_timeout: Duration,
}

#[derive(Clone)]
pub(crate) struct KvClientOptions {
    pub address: Address,
    pub tls_config: Option<TlsConfig>,
    pub authenticator: Arc<Authenticator>,
    pub selected_bucket: Option<String>,

    pub bootstrap_options: KvClientBootstrapOptions,
    pub endpoint_id: String,

    pub unsolicited_packet_tx: Option<UnsolicitedPacketSender>,
    pub orphan_handler: Option<OrphanResponseHandler>,
    pub on_close_tx: Option<OnKvClientCloseHandler>,
    pub disable_decompression: bool,
    pub id: String,
}

// Carries the id of the client whose connection went away.
pub(crate) type OnKvClientCloseHandler = mpsc::Sender<String>;

pub(crate) type OnErrMapFetchedHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct UnsolicitedPacket {
    pub packet: ResponsePacket,
    pub endpoint_id: String,
}

pub(crate) type UnsolicitedPacketSender = mpsc::UnboundedSender<UnsolicitedPacket>;

pub(crate) trait KvClient: Sized + PartialEq + Send + Sync {
    fn new(opts: KvClientOptions) -> impl Future<Output = Result<Self>> + Send;
    fn select_bucket(&self, bucket_name: String) -> impl Future<Output = Result<()>> + Send;
    fn has_feature(&self, feature: HelloFeature) -> bool;
    fn remote_hostname(&self) -> &str;
    fn remote_addr(&self) -> SocketAddr;
    fn local_addr(&self) -> SocketAddr;
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
    fn id(&self) -> &str;
}

pub(crate) struct StdKvClient<D: Dispatcher> {
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
    remote_hostname: String,
    endpoint_id: String,

    cli: D,
    closed: Arc<AtomicBool>,

    supported_features: Vec<HelloFeature>,

    pub(crate) selected_bucket: std::sync::Mutex<Option<String>>,

    pub(crate) id: String,
}

impl<D> StdKvClient<D>
where
    D: Dispatcher,
{
    pub fn client(&self) -> &D {
        &self.cli
    }

    fn requested_features(opts: &KvClientBootstrapOptions) -> Vec<HelloFeature> {
        let mut requested_features = vec![
            HelloFeature::DataType,
            HelloFeature::Xattr,
            HelloFeature::Xerror,
            HelloFeature::Snappy,
            HelloFeature::Json,
            HelloFeature::SelectBucket,
            HelloFeature::AltRequests,
            HelloFeature::SyncReplication,
            HelloFeature::Collections,
            HelloFeature::PreserveExpiry,
            HelloFeature::Duplex,
            HelloFeature::ClusterMapNotif,
            HelloFeature::UnorderedExec,
        ];

        if !opts.disable_mutation_tokens {
            requested_features.push(HelloFeature::SeqNo);
        }

        if !opts.disable_server_durations {
            requested_features.push(HelloFeature::Durations);
        }

        requested_features
    }
}

impl<D> KvClient for StdKvClient<D>
where
    D: Dispatcher,
{
    async fn new(opts: KvClientOptions) -> Result<StdKvClient<D>> {
        let requested_features = Self::requested_features(&opts.bootstrap_options);

        let bootstrap_hello = if !opts.bootstrap_options.client_name.is_empty() {
            Some(HelloRequest {
                client_name: Vec::from(opts.bootstrap_options.client_name.clone()),
                requested_features,
            })
        } else {
            None
        };

        let bootstrap_get_error_map = if !opts.bootstrap_options.disable_error_map {
            Some(GetErrorMapRequest { version: 2 })
        } else {
            None
        };

        let address = opts.address;

        let bootstrap_auth = match opts.authenticator.as_ref() {
            Authenticator::PasswordAuthenticator(a) => {
                let creds =
                    a.get_credentials(&ServiceType::KEY_VALUE, address.to_string())?;

                let enabled_mechs: Vec<memd::auth_mechanism::AuthMechanism> =
                    if !opts.bootstrap_options.auth_mechanisms.is_empty() {
                        opts.bootstrap_options
                            .auth_mechanisms
                            .iter()
                            .cloned()
                            .map(memd::auth_mechanism::AuthMechanism::from)
                            .collect()
                    } else {
                        a.get_auth_mechanisms(opts.tls_config.is_some())
                            .into_iter()
                            .map(memd::auth_mechanism::AuthMechanism::from)
                            .collect()
                    };

                Some(SASLAuthAutoOptions {
                    credentials: Credentials {
                        username: creds.username,
                        password: creds.password,
                    },
                    enabled_mechs,
                })
            }
            Authenticator::CertificateAuthenticator(_a) => None,
        };

        let bootstrap_select_bucket =
            opts.selected_bucket
                .as_ref()
                .map(|bucket_name| SelectBucketRequest {
                    bucket_name: bucket_name.clone(),
                });

        let should_bootstrap = bootstrap_hello.is_some()
            || bootstrap_auth.is_some()
            || bootstrap_get_error_map.is_some()
            || bootstrap_select_bucket.is_some();

        let closed = Arc::new(AtomicBool::new(false));
        let closed_clone = closed.clone();
        let id = opts.id;
        let read_id = id.clone();

        let client_id = Uuid::new_v4().to_string();

        debug!(
            "Kvclient {} assigning client id {} for {}",
            &id, &client_id, &address
        );

        let (on_read_close_tx, on_read_close_rx) = oneshot::channel::<()>();

        let unsolicited_packet_tx = opts.unsolicited_packet_tx.clone();
        let endpoint_id = opts.endpoint_id.clone();
        let memd_client_opts = DispatcherOptions {
            on_read_close_tx,
            orphan_handler: opts.orphan_handler,
            unsolicited_packet_handler: Arc::new(move |packet| {
                let unsolicited_packet_tx = unsolicited_packet_tx.clone();
                let endpoint_id = endpoint_id.clone();
                Box::pin(async move {
                    if let Some(sender) = unsolicited_packet_tx {
                        if let Err(e) = sender.send(UnsolicitedPacket {
                            packet,
                            endpoint_id,
                        }) {
                            warn!("Failed to forward unsolicited packet: {e}");
                        }
                    }
                })
            }),
            disable_decompression: opts.disable_decompression,
            id: client_id,
        };

        let deadline = Instant::now().add(opts.bootstrap_options.connect_timeout);
        let conn = if let Some(tls) = opts.tls_config {
            #[cfg(feature = "rustls-tls")]
            {
                let conn = memd::connection::TlsConnection::connect(
                    &address,
                    tls,
                    ConnectOptions {
                        deadline,
                        tcp_keep_alive_time: opts.bootstrap_options.tcp_keep_alive_time,
                    },
                )
                .await
                .map_err(|e| Error::new_memd_error(e, None, None))?;
                ConnectionType::Tls(conn)
            }
            #[cfg(not(feature = "rustls-tls"))]
            {
                let _ = tls;
                unreachable!("tls feature disabled");
            }
        } else {
            let conn = TcpConnection::connect(
                &address,
                ConnectOptions {
                    deadline,
                    tcp_keep_alive_time: opts.bootstrap_options.tcp_keep_alive_time,
                },
            )
            .await
            .map_err(|e| Error::new_memd_error(e, None, None))?;
            ConnectionType::Tcp(conn)
        };

        let remote_addr = *conn.peer_addr();
        let local_addr = *conn.local_addr();
        let remote_hostname = hostname_from_addr_str(&address.to_string());

        let cli = D::new(conn, memd_client_opts);

        let on_close = opts.on_close_tx.clone();
        tokio::spawn(async move {
            let _ = on_read_close_rx.await;

            // The read loop is gone; flag ourselves closed and tell whoever
            // owns us so the connection can be re-established.
            if closed_clone.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                != Ok(false)
            {
                return;
            }

            if let Some(on_close) = on_close {
                if let Err(e) = on_close.send(read_id.clone()).await {
                    debug!("Failed to send on_close for kvclient {}: {}", &read_id, e);
                }
            }
        });

        let kv_cli = StdKvClient {
            remote_addr,
            local_addr,
            remote_hostname,
            endpoint_id: opts.endpoint_id,
            cli,
            closed,
            supported_features: vec![],
            selected_bucket: std::sync::Mutex::new(None),
            id: id.clone(),
        };

        let mut kv_cli = kv_cli;
        if should_bootstrap {
            if let Some(b) = &bootstrap_select_bucket {
                let mut guard = kv_cli.selected_bucket.lock().unwrap();
                *guard = Some(b.bucket_name.clone());
            }

            let res = match kv_cli
                .bootstrap(BootstrapOptions {
                    hello: bootstrap_hello,
                    get_error_map: bootstrap_get_error_map,
                    auth: bootstrap_auth,
                    select_bucket: bootstrap_select_bucket,
                    get_cluster_config: None,
                    deadline,
                })
                .await
            {
                Ok(res) => res,
                Err(e) => {
                    kv_cli.close().await.unwrap_or_default();
                    return Err(e);
                }
            };

            if let Some(hello) = res.hello {
                debug!(
                    "Kvclient {} enabled hello features: {:?}",
                    &id, &hello.enabled_features
                );
                kv_cli.supported_features = hello.enabled_features;
            }

            if let Some(handler) = opts.bootstrap_options.on_err_map_fetched {
                if let Some(err_map) = res.error_map {
                    handler(&err_map.error_map);
                }
            }
        }

        Ok(kv_cli)
    }

    async fn select_bucket(&self, bucket_name: String) -> Result<()> {
        debug!("Selecting bucket on kvclient {}", &self.id);

        {
            let mut guard = self.selected_bucket.lock().unwrap();
            if guard.is_some() {
                return Err(Error::new_invalid_arguments_error(
                    "cannot select bucket when a bucket is already selected",
                ));
            }

            *guard = Some(bucket_name.clone());
        }

        match self
            .select_bucket_req(SelectBucketRequest { bucket_name })
            .await
        {
            Ok(_r) => Ok(()),
            Err(e) => {
                let mut guard = self.selected_bucket.lock().unwrap();
                *guard = None;
                Err(e)
            }
        }
    }

    fn has_feature(&self, feature: HelloFeature) -> bool {
        self.supported_features.contains(&feature)
    }

    fn remote_hostname(&self) -> &str {
        &self.remote_hostname
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            != Ok(false)
        {
            return Ok(());
        }

        info!("Kvclient {} closing", self.id);

        self.cli
            .close()
            .await
            .map_err(|e| Error::new_memd_error(e, Some(self.remote_addr), Some(self.local_addr)))?;

        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl<D> PartialEq for StdKvClient<D>
where
    D: Dispatcher,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<D> Drop for StdKvClient<D>
where
    D: Dispatcher,
{
    fn drop(&mut self) {
        // Stops the read close handler from signalling upstream for a client
        // that was dropped rather than lost.
        self.closed.store(true, Ordering::SeqCst);
        debug!("Dropping kvclient {}", self.id);
    }
}
