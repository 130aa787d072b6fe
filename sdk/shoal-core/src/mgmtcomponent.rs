use std::collections::HashMap;
use std::sync::Arc;

use crate::clustermap::{ClusterMapJson, CollectionManifestJson};
use crate::error::Result;
use crate::httpcomponent::{HttpComponent, HttpComponentState};
use crate::httpx::client::Client;
use crate::httpx::request::{Auth, BasicAuth};
use crate::mgmtx::mgmt::Management;
use crate::mgmtx::options::{
    CreateBucketOptions, CreateCollectionOptions, CreateScopeOptions, DeleteBucketOptions,
    DeleteCollectionOptions, DeleteScopeOptions, GetCollectionManifestOptions,
    GetTerseBucketConfigOptions,
};
use crate::retry::{orchestrate_retries, RetryManager, RetryRequest, DEFAULT_RETRY_STRATEGY};
use crate::service_type::ServiceType;

pub(crate) struct MgmtComponentConfig {
    pub endpoints: HashMap<String, String>,
    pub authenticator: Arc<crate::authenticator::Authenticator>,
}

pub(crate) struct MgmtComponentOptions {
    pub user_agent: String,
}

/// The management REST surface the core depends on: terse config fetches for
/// polling plus bucket/scope/collection lifecycle.
pub(crate) struct MgmtComponent<C: Client> {
    http: HttpComponent<C>,
    retry_manager: Arc<RetryManager>,
}

macro_rules! mgmt_op {
    ($name:ident, $opts:ty, $resp:ty) => {
        pub async fn $name(&self, opts: &$opts) -> Result<$resp> {
            orchestrate_retries(
                self.retry_manager.clone(),
                DEFAULT_RETRY_STRATEGY.clone(),
                RetryRequest::new(stringify!($name), true),
                || {
                    self.http.orchestrate_endpoint(
                        None,
                        move |client, _endpoint_id, endpoint, username, password| async move {
                            let mgmt = Management {
                                http_client: client,
                                user_agent: self.http.user_agent().to_string(),
                                endpoint,
                                auth: Auth::BasicAuth(BasicAuth::new(username, password)),
                            };

                            mgmt.$name(opts).await.map_err(crate::error::Error::from)
                        },
                    )
                },
            )
            .await
        }
    };
}

impl<C: Client> MgmtComponent<C> {
    pub fn new(
        retry_manager: Arc<RetryManager>,
        client: Arc<C>,
        config: MgmtComponentConfig,
        opts: MgmtComponentOptions,
    ) -> Self {
        Self {
            http: HttpComponent::new(
                ServiceType::MGMT,
                opts.user_agent,
                client,
                HttpComponentState::new(config.endpoints, config.authenticator),
            ),
            retry_manager,
        }
    }

    pub fn reconfigure(&self, config: MgmtComponentConfig) {
        self.http
            .reconfigure(HttpComponentState::new(config.endpoints, config.authenticator));
    }

    mgmt_op!(
        get_terse_bucket_config,
        GetTerseBucketConfigOptions<'_>,
        ClusterMapJson
    );
    mgmt_op!(create_bucket, CreateBucketOptions<'_>, ());
    mgmt_op!(delete_bucket, DeleteBucketOptions<'_>, ());
    mgmt_op!(
        create_scope,
        CreateScopeOptions<'_>,
        crate::mgmtx::mgmt::ManifestUidResponse
    );
    mgmt_op!(
        delete_scope,
        DeleteScopeOptions<'_>,
        crate::mgmtx::mgmt::ManifestUidResponse
    );
    mgmt_op!(
        create_collection,
        CreateCollectionOptions<'_>,
        crate::mgmtx::mgmt::ManifestUidResponse
    );
    mgmt_op!(
        delete_collection,
        DeleteCollectionOptions<'_>,
        crate::mgmtx::mgmt::ManifestUidResponse
    );
    mgmt_op!(
        get_collection_manifest,
        GetCollectionManifestOptions<'_>,
        CollectionManifestJson
    );
}
