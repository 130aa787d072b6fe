use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::httpcomponent::{HttpComponent, HttpComponentState};
use crate::httpx::client::Client;
use crate::retry::{orchestrate_retries, RetryManager, RetryRequest, DEFAULT_RETRY_STRATEGY};
use crate::service_type::ServiceType;
use crate::servicecomponent::{execute_service_request, ServiceRequest, ServiceRows};

#[derive(Debug, Default, Clone, Serialize)]
pub struct AnalyticsOptions {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(flatten, skip_serializing_if = "HashMap::is_empty")]
    pub raw: HashMap<String, serde_json::Value>,

    #[serde(skip)]
    pub endpoint_id: Option<String>,
}

pub(crate) struct AnalyticsComponentConfig {
    pub endpoints: HashMap<String, String>,
    pub authenticator: Arc<crate::authenticator::Authenticator>,
}

pub(crate) struct AnalyticsComponentOptions {
    pub user_agent: String,
}

pub(crate) struct AnalyticsComponent<C: Client> {
    http: HttpComponent<C>,
    retry_manager: Arc<RetryManager>,
}

impl<C: Client> AnalyticsComponent<C> {
    pub fn new(
        retry_manager: Arc<RetryManager>,
        client: Arc<C>,
        config: AnalyticsComponentConfig,
        opts: AnalyticsComponentOptions,
    ) -> Self {
        Self {
            http: HttpComponent::new(
                ServiceType::ANALYTICS,
                opts.user_agent,
                client,
                HttpComponentState::new(config.endpoints, config.authenticator),
            ),
            retry_manager,
        }
    }

    pub fn reconfigure(&self, config: AnalyticsComponentConfig) {
        self.http
            .reconfigure(HttpComponentState::new(config.endpoints, config.authenticator));
    }

    pub async fn query(&self, mut opts: AnalyticsOptions) -> Result<ServiceRows> {
        if opts.client_context_id.is_none() {
            opts.client_context_id = Some(Uuid::new_v4().to_string());
        }

        let body = Bytes::from(serde_json::to_vec(&opts)?);
        let endpoint_id = opts.endpoint_id.clone();
        let client_context_id = opts.client_context_id.clone();

        orchestrate_retries(
            self.retry_manager.clone(),
            DEFAULT_RETRY_STRATEGY.clone(),
            RetryRequest::new("analytics_query", opts.readonly.unwrap_or_default()),
            || {
                execute_service_request(
                    &self.http,
                    ServiceRequest {
                        method: http::Method::POST,
                        path: "/analytics/service".to_string(),
                        body: Some(body.clone()),
                        content_type: Some("application/json".to_string()),
                        rows_attrib: "results",
                        client_context_id: client_context_id.clone(),
                        endpoint_id: endpoint_id.clone(),
                    },
                )
            },
        )
        .await
    }
}
