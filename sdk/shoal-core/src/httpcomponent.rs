use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::authenticator::Authenticator;
use crate::error;
use crate::error::ErrorKind;
use crate::httpx::client::Client;
use crate::randgen;
use crate::service_type::ServiceType;
use crate::util::get_host_port_from_uri;

/// The shared plumbing for every HTTP-fronted service: holds the current set
/// of endpoints for one service and picks one per request.
pub(crate) struct HttpComponent<C: Client> {
    service_type: ServiceType,
    user_agent: String,
    client: Arc<C>,

    state: Mutex<HttpComponentState>,
}

pub(crate) struct HttpComponentState {
    endpoints: HashMap<String, String>,
    authenticator: Arc<Authenticator>,
}

impl HttpComponentState {
    pub fn new(endpoints: HashMap<String, String>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            endpoints,
            authenticator,
        }
    }
}

pub(crate) struct HttpEndpointProperties {
    pub endpoint_id: Option<String>,
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl<C: Client> HttpComponent<C> {
    pub fn new(
        service_type: ServiceType,
        user_agent: String,
        client: Arc<C>,
        state: HttpComponentState,
    ) -> Self {
        Self {
            service_type,
            user_agent,
            client,
            state: Mutex::new(state),
        }
    }

    pub fn reconfigure(&self, state: HttpComponentState) {
        let mut state_guard = self.state.lock().unwrap();
        *state_guard = state;
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    fn credentials(
        &self,
        state: &HttpComponentState,
        endpoint: &str,
    ) -> error::Result<(String, String)> {
        let host = get_host_port_from_uri(endpoint)?;
        let user_pass = match state.authenticator.as_ref() {
            Authenticator::PasswordAuthenticator(authenticator) => {
                authenticator.get_credentials(&self.service_type, host)?
            }
            Authenticator::CertificateAuthenticator(a) => {
                a.get_credentials(&self.service_type, host)?
            }
        };

        Ok((user_pass.username, user_pass.password))
    }

    /// Picks a uniformly random endpoint, skipping any that the caller has
    /// just seen fail.
    pub fn select_endpoint(
        &self,
        endpoint_ids_to_ignore: &[String],
    ) -> error::Result<Option<(Arc<C>, HttpEndpointProperties)>> {
        let guard = self.state.lock().unwrap();
        let state = &*guard;

        if state.endpoints.is_empty() {
            return Ok(None);
        }

        let mut remaining: Vec<(&String, &String)> = state
            .endpoints
            .iter()
            .filter(|(ep_id, _)| !endpoint_ids_to_ignore.contains(ep_id))
            .collect();

        // Everything failed recently: fall back to the full set rather than
        // refusing to dispatch.
        if remaining.is_empty() {
            remaining = state.endpoints.iter().collect();
        }

        let (endpoint_id, endpoint) = remaining[randgen::random_usize_below(remaining.len())];

        let (username, password) = self.credentials(state, endpoint)?;

        Ok(Some((
            self.client.clone(),
            HttpEndpointProperties {
                endpoint_id: Some(endpoint_id.clone()),
                endpoint: endpoint.clone(),
                username,
                password,
            },
        )))
    }

    pub fn select_specific_endpoint(
        &self,
        endpoint_id: &str,
    ) -> error::Result<(Arc<C>, HttpEndpointProperties)> {
        let guard = self.state.lock().unwrap();
        let state = &*guard;

        let endpoint = match state.endpoints.get(endpoint_id) {
            Some(ep) => ep,
            None => {
                return Err(ErrorKind::EndpointNotKnown {
                    endpoint: endpoint_id.to_string(),
                }
                .into());
            }
        };

        let (username, password) = self.credentials(state, endpoint)?;

        Ok((
            self.client.clone(),
            HttpEndpointProperties {
                endpoint_id: None,
                endpoint: endpoint.clone(),
                username,
                password,
            },
        ))
    }

    pub async fn orchestrate_endpoint<Resp, Fut>(
        &self,
        endpoint_id: Option<String>,
        operation: impl Fn(Arc<C>, String, String, String, String) -> Fut + Send + Sync,
    ) -> error::Result<Resp>
    where
        Fut: Future<Output = error::Result<Resp>> + Send,
        Resp: Send,
    {
        if let Some(endpoint_id) = endpoint_id {
            let (client, endpoint_properties) = self.select_specific_endpoint(&endpoint_id)?;

            return operation(
                client,
                endpoint_id,
                endpoint_properties.endpoint,
                endpoint_properties.username,
                endpoint_properties.password,
            )
            .await;
        }

        let (client, endpoint_properties) = match self.select_endpoint(&[])? {
            Some(selected) => selected,
            None => {
                debug!("No endpoints available for {}", self.service_type);
                return Err(ErrorKind::ServiceNotAvailable {
                    service: self.service_type.clone(),
                }
                .into());
            }
        };

        operation(
            client,
            endpoint_properties.endpoint_id.unwrap_or_default(),
            endpoint_properties.endpoint,
            endpoint_properties.username,
            endpoint_properties.password,
        )
        .await
    }
}
