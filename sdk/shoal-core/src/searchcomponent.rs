use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::httpcomponent::{HttpComponent, HttpComponentState};
use crate::httpx::client::Client;
use crate::retry::{orchestrate_retries, RetryManager, RetryRequest, DEFAULT_RETRY_STRATEGY};
use crate::service_type::ServiceType;
use crate::servicecomponent::{execute_service_request, ServiceRequest, ServiceRows};

#[derive(Debug, Default, Clone)]
pub struct SearchOptions {
    pub index_name: String,
    // The full search request payload; the component is agnostic to its shape.
    pub payload: serde_json::Value,
    pub client_context_id: Option<String>,
    pub endpoint_id: Option<String>,
}

pub(crate) struct SearchComponentConfig {
    pub endpoints: HashMap<String, String>,
    pub authenticator: Arc<crate::authenticator::Authenticator>,
}

pub(crate) struct SearchComponentOptions {
    pub user_agent: String,
}

pub(crate) struct SearchComponent<C: Client> {
    http: HttpComponent<C>,
    retry_manager: Arc<RetryManager>,
}

impl<C: Client> SearchComponent<C> {
    pub fn new(
        retry_manager: Arc<RetryManager>,
        client: Arc<C>,
        config: SearchComponentConfig,
        opts: SearchComponentOptions,
    ) -> Self {
        Self {
            http: HttpComponent::new(
                ServiceType::SEARCH,
                opts.user_agent,
                client,
                HttpComponentState::new(config.endpoints, config.authenticator),
            ),
            retry_manager,
        }
    }

    pub fn reconfigure(&self, config: SearchComponentConfig) {
        self.http
            .reconfigure(HttpComponentState::new(config.endpoints, config.authenticator));
    }

    pub async fn query(&self, mut opts: SearchOptions) -> Result<ServiceRows> {
        if opts.client_context_id.is_none() {
            opts.client_context_id = Some(Uuid::new_v4().to_string());
        }

        let body = Bytes::from(serde_json::to_vec(&opts.payload)?);
        let path = format!("/api/index/{}/query", opts.index_name);
        let endpoint_id = opts.endpoint_id.clone();
        let client_context_id = opts.client_context_id.clone();

        orchestrate_retries(
            self.retry_manager.clone(),
            DEFAULT_RETRY_STRATEGY.clone(),
            RetryRequest::new("search_query", true),
            || {
                execute_service_request(
                    &self.http,
                    ServiceRequest {
                        method: http::Method::POST,
                        path: path.clone(),
                        body: Some(body.clone()),
                        content_type: Some("application/json".to_string()),
                        rows_attrib: "hits",
                        client_context_id: client_context_id.clone(),
                        endpoint_id: endpoint_id.clone(),
                    },
                )
            },
        )
        .await
    }
}
