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
pub struct QueryOptions {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_consistency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(flatten, skip_serializing_if = "HashMap::is_empty")]
    pub raw: HashMap<String, serde_json::Value>,

    #[serde(skip)]
    pub endpoint_id: Option<String>,
}

pub(crate) struct QueryComponentConfig {
    pub endpoints: HashMap<String, String>,
    pub authenticator: Arc<crate::authenticator::Authenticator>,
}

pub(crate) struct QueryComponentOptions {
    pub user_agent: String,
}

/// The SQL-style query service: one POST per statement, rows streamed back.
pub(crate) struct QueryComponent<C: Client> {
    http: HttpComponent<C>,
    retry_manager: Arc<RetryManager>,
}

impl<C: Client> QueryComponent<C> {
    pub fn new(
        retry_manager: Arc<RetryManager>,
        client: Arc<C>,
        config: QueryComponentConfig,
        opts: QueryComponentOptions,
    ) -> Self {
        Self {
            http: HttpComponent::new(
                ServiceType::QUERY,
                opts.user_agent,
                client,
                HttpComponentState::new(config.endpoints, config.authenticator),
            ),
            retry_manager,
        }
    }

    pub fn reconfigure(&self, config: QueryComponentConfig) {
        self.http
            .reconfigure(HttpComponentState::new(config.endpoints, config.authenticator));
    }

    pub async fn query(&self, mut opts: QueryOptions) -> Result<ServiceRows> {
        if opts.client_context_id.is_none() {
            opts.client_context_id = Some(Uuid::new_v4().to_string());
        }

        let body = Bytes::from(serde_json::to_vec(&opts)?);
        let endpoint_id = opts.endpoint_id.clone();
        let client_context_id = opts.client_context_id.clone();

        orchestrate_retries(
            self.retry_manager.clone(),
            DEFAULT_RETRY_STRATEGY.clone(),
            RetryRequest::new("query", opts.readonly.unwrap_or_default()),
            || {
                execute_service_request(
                    &self.http,
                    ServiceRequest {
                        method: http::Method::POST,
                        path: "/query/service".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_serialize_to_service_body() {
        let mut opts = QueryOptions {
            statement: "SELECT 1".to_string(),
            client_context_id: Some("ctx-1".to_string()),
            readonly: Some(true),
            ..Default::default()
        };
        opts.raw
            .insert("profile".to_string(), serde_json::json!("timings"));

        let body: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&opts).unwrap()).unwrap();

        assert_eq!(body["statement"], "SELECT 1");
        assert_eq!(body["client_context_id"], "ctx-1");
        assert_eq!(body["readonly"], true);
        assert_eq!(body["profile"], "timings");
        assert!(body.get("args").is_none());
        assert!(body.get("endpoint_id").is_none());
    }
}
