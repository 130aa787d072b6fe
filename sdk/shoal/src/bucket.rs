use std::sync::Arc;

use crate::cluster::ClusterInner;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::scope::Scope;
use shoal_core::agent::Agent;
use shoal_core::agentoptions::AgentOptions;
use shoal_core::authenticator::Authenticator;

pub(crate) struct BucketInner {
    // Holding the cluster keeps its shared runtime alive for as long as any
    // bucket handle exists.
    pub(crate) cluster: Arc<ClusterInner>,
    pub(crate) name: String,
    pub(crate) agent: Agent,
}

/// A handle onto one bucket, backed by that bucket's own agent.
#[derive(Clone)]
pub struct Bucket {
    pub(crate) inner: Arc<BucketInner>,
}

impl Bucket {
    pub(crate) async fn open(cluster: Arc<ClusterInner>, name: String) -> Result<Bucket> {
        let authenticator = match cluster.authenticator.as_ref() {
            Authenticator::PasswordAuthenticator(a) => {
                Authenticator::PasswordAuthenticator(a.clone())
            }
            Authenticator::CertificateAuthenticator(a) => {
                Authenticator::CertificateAuthenticator(a.clone())
            }
            _ => unreachable!("non-exhaustive enum variant"),
        };

        let mut agent_opts = AgentOptions::new(cluster.seeds.clone(), authenticator);
        agent_opts.bucket_name = Some(name.clone());
        agent_opts.tls_config = cluster.tls_config.clone();

        let agent = Agent::new(agent_opts).await.map_err(Error::from)?;

        Ok(Bucket {
            inner: Arc::new(BucketInner {
                cluster,
                name,
                agent,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn scope(&self, name: impl Into<String>) -> Scope {
        Scope::new(self.inner.clone(), name.into())
    }

    pub fn default_scope(&self) -> Scope {
        self.scope("_default")
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        self.default_scope().collection(name)
    }

    pub fn default_collection(&self) -> Collection {
        self.collection("_default")
    }

    pub async fn close(&self) {
        self.inner.agent.close().await;
    }
}
