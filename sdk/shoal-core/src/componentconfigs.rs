use std::collections::HashMap;
use std::sync::Arc;

use crate::address::Address;
use crate::analyticscomponent::AnalyticsComponentConfig;
use crate::authenticator::Authenticator;
use crate::configmanager::ConfigManagerConfig;
use crate::kvclientpool::KvClientConfig;
use crate::mgmtcomponent::MgmtComponentConfig;
use crate::parsedconfig::ParsedConfig;
use crate::querycomponent::QueryComponentConfig;
use crate::searchcomponent::SearchComponentConfig;
use crate::tls_config::TlsConfig;
use crate::vbucketrouter::VbucketRoutingInfo;
use crate::viewcomponent::ViewComponentConfig;

/// Everything derived from one config snapshot that the agent's components
/// need: kv endpoints keyed by id, per-service HTTP endpoint maps, and the
/// vbucket routing table whose entries index into the kv endpoint ids.
pub(crate) struct AgentComponentConfigs {
    pub kv_client_configs: HashMap<String, KvClientConfig>,
    pub config_manager_config: ConfigManagerConfig,
    pub vbucket_routing_info: VbucketRoutingInfo,
    pub query_config: QueryComponentConfig,
    pub analytics_config: AnalyticsComponentConfig,
    pub search_config: SearchComponentConfig,
    pub view_config: ViewComponentConfig,
    pub mgmt_config: MgmtComponentConfig,
}

impl AgentComponentConfigs {
    pub fn gen_from_config(
        config: &ParsedConfig,
        network_type: &str,
        tls_config: Option<TlsConfig>,
        bucket_name: Option<String>,
        authenticator: Arc<Authenticator>,
    ) -> AgentComponentConfigs {
        let network_info = config.addresses_group_for_network_type(network_type);

        let http_scheme = if tls_config.is_some() { "https" } else { "http" };

        let mut kv_data_node_ids = Vec::new();
        let mut kv_client_configs = HashMap::new();
        let mut mgmt_endpoints = HashMap::new();
        let mut query_endpoints = HashMap::new();
        let mut search_endpoints = HashMap::new();
        let mut analytics_endpoints = HashMap::new();
        let mut view_endpoints = HashMap::new();

        for node in network_info.nodes {
            let kv_ep_id = format!("kv{}", node.node_id);
            let mgmt_ep_id = format!("mgmt{}", node.node_id);
            let query_ep_id = format!("query{}", node.node_id);
            let search_ep_id = format!("search{}", node.node_id);
            let analytics_ep_id = format!("analytics{}", node.node_id);
            let view_ep_id = format!("view{}", node.node_id);

            let ports = if tls_config.is_some() {
                &node.tls_ports
            } else {
                &node.non_tls_ports
            };

            // The vbucket map's node indexes follow the order of data nodes
            // in the config, so this list must preserve it.
            if node.has_data {
                kv_data_node_ids.push(kv_ep_id.clone());
            }

            if let Some(p) = ports.kv {
                kv_client_configs.insert(
                    kv_ep_id,
                    KvClientConfig {
                        address: Address {
                            host: node.hostname.clone(),
                            port: p,
                        },
                        tls_config: tls_config.clone(),
                        authenticator: authenticator.clone(),
                        selected_bucket: bucket_name.clone(),
                    },
                );
            }
            if let Some(p) = ports.mgmt {
                mgmt_endpoints.insert(
                    mgmt_ep_id,
                    format!("{http_scheme}://{}:{}", node.hostname, p),
                );
            }
            if let Some(p) = ports.query {
                query_endpoints.insert(
                    query_ep_id,
                    format!("{http_scheme}://{}:{}", node.hostname, p),
                );
            }
            if let Some(p) = ports.search {
                search_endpoints.insert(
                    search_ep_id,
                    format!("{http_scheme}://{}:{}", node.hostname, p),
                );
            }
            if let Some(p) = ports.analytics {
                analytics_endpoints.insert(
                    analytics_ep_id,
                    format!("{http_scheme}://{}:{}", node.hostname, p),
                );
            }
            if let Some(p) = ports.view {
                view_endpoints.insert(
                    view_ep_id,
                    format!("{http_scheme}://{}:{}", node.hostname, p),
                );
            }
        }

        let config_manager_config = ConfigManagerConfig {
            endpoints: kv_client_configs.keys().cloned().collect(),
        };

        let vbucket_routing_info = if let Some(info) = &config.bucket {
            VbucketRoutingInfo {
                vbucket_info: info.vbucket_map.clone(),
                server_list: kv_data_node_ids,
                bucket_selected: true,
            }
        } else {
            VbucketRoutingInfo {
                vbucket_info: None,
                server_list: kv_data_node_ids,
                bucket_selected: false,
            }
        };

        AgentComponentConfigs {
            kv_client_configs,
            config_manager_config,
            vbucket_routing_info,
            query_config: QueryComponentConfig {
                endpoints: query_endpoints,
                authenticator: authenticator.clone(),
            },
            analytics_config: AnalyticsComponentConfig {
                endpoints: analytics_endpoints,
                authenticator: authenticator.clone(),
            },
            search_config: SearchComponentConfig {
                endpoints: search_endpoints,
                authenticator: authenticator.clone(),
            },
            view_config: ViewComponentConfig {
                endpoints: view_endpoints,
                authenticator: authenticator.clone(),
            },
            mgmt_config: MgmtComponentConfig {
                endpoints: mgmt_endpoints,
                authenticator,
            },
        }
    }
}
