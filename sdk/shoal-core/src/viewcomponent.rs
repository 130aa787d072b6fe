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
pub struct ViewQueryOptions {
    pub bucket_name: String,
    pub design_document_name: String,
    pub view_name: String,
    // Raw view engine query options, urlencoded into the request.
    pub options: HashMap<String, String>,
    pub client_context_id: Option<String>,
    pub endpoint_id: Option<String>,
}

pub(crate) struct ViewComponentConfig {
    pub endpoints: HashMap<String, String>,
    pub authenticator: Arc<crate::authenticator::Authenticator>,
}

pub(crate) struct ViewComponentOptions {
    pub user_agent: String,
}

pub(crate) struct ViewComponent<C: Client> {
    http: HttpComponent<C>,
    retry_manager: Arc<RetryManager>,
}

impl<C: Client> ViewComponent<C> {
    pub fn new(
        retry_manager: Arc<RetryManager>,
        client: Arc<C>,
        config: ViewComponentConfig,
        opts: ViewComponentOptions,
    ) -> Self {
        Self {
            http: HttpComponent::new(
                ServiceType::VIEW,
                opts.user_agent,
                client,
                HttpComponentState::new(config.endpoints, config.authenticator),
            ),
            retry_manager,
        }
    }

    pub fn reconfigure(&self, config: ViewComponentConfig) {
        self.http
            .reconfigure(HttpComponentState::new(config.endpoints, config.authenticator));
    }

    pub async fn query(&self, mut opts: ViewQueryOptions) -> Result<ServiceRows> {
        if opts.client_context_id.is_none() {
            opts.client_context_id = Some(Uuid::new_v4().to_string());
        }

        let mut path = format!(
            "/{}/_design/{}/_view/{}",
            urlencoding::encode(&opts.bucket_name),
            urlencoding::encode(&opts.design_document_name),
            urlencoding::encode(&opts.view_name)
        );

        if !opts.options.is_empty() {
            let encoded = opts
                .options
                .iter()
                .map(|(k, v)| {
                    format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
                })
                .collect::<Vec<_>>()
                .join("&");
            path = format!("{path}?{encoded}");
        }

        let endpoint_id = opts.endpoint_id.clone();
        let client_context_id = opts.client_context_id.clone();

        orchestrate_retries(
            self.retry_manager.clone(),
            DEFAULT_RETRY_STRATEGY.clone(),
            RetryRequest::new("view_query", true),
            || {
                execute_service_request(
                    &self.http,
                    ServiceRequest {
                        method: http::Method::GET,
                        path: path.clone(),
                        body: None,
                        content_type: None,
                        rows_attrib: "rows",
                        client_context_id: client_context_id.clone(),
                        endpoint_id: endpoint_id.clone(),
                    },
                )
            },
        )
        .await
    }
}
