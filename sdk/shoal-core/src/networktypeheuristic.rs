use crate::parsedconfig::{ParsedConfig, ParsedConfigNodeAddresses};

/// Works out which network name to use for endpoint lookups by checking
/// whether the bootstrap host appears in the default addresses or in one of
/// the named alternate networks.
pub(crate) struct NetworkTypeHeuristic {}

impl NetworkTypeHeuristic {
    fn node_contains_address(node: &ParsedConfigNodeAddresses, addr: &str) -> bool {
        if addr == node.hostname {
            return true;
        }
        if let Some(p) = node.non_tls_ports.kv {
            if format!("{}:{}", node.hostname, p) == addr {
                return true;
            }
        }
        if let Some(p) = node.non_tls_ports.mgmt {
            if format!("{}:{}", node.hostname, p) == addr {
                return true;
            }
        }
        if let Some(p) = node.tls_ports.kv {
            if format!("{}:{}", node.hostname, p) == addr {
                return true;
            }
        }
        if let Some(p) = node.tls_ports.mgmt {
            if format!("{}:{}", node.hostname, p) == addr {
                return true;
            }
        }
        false
    }

    pub fn identify(config: &ParsedConfig) -> String {
        for node in &config.nodes {
            if Self::node_contains_address(&node.addresses, &config.source_hostname) {
                return "default".to_string();
            }
        }

        for node in &config.nodes {
            for (network_type, alt_addrs) in &node.alt_addresses {
                if Self::node_contains_address(alt_addrs, &config.source_hostname) {
                    return network_type.clone();
                }
            }
        }

        "default".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsedconfig::{ParsedConfigNode, ParsedConfigNodePorts};
    use std::collections::HashMap;

    fn node(hostname: &str, alt: Option<(&str, &str)>) -> ParsedConfigNode {
        let mut alt_addresses = HashMap::new();
        if let Some((network, alt_host)) = alt {
            alt_addresses.insert(
                network.to_string(),
                ParsedConfigNodeAddresses {
                    hostname: alt_host.to_string(),
                    non_tls_ports: ParsedConfigNodePorts {
                        kv: Some(11210),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            );
        }

        ParsedConfigNode {
            this_node: false,
            has_data: true,
            addresses: ParsedConfigNodeAddresses {
                hostname: hostname.to_string(),
                non_tls_ports: ParsedConfigNodePorts {
                    kv: Some(11210),
                    ..Default::default()
                },
                ..Default::default()
            },
            alt_addresses,
        }
    }

    #[test]
    fn bootstrap_host_on_default_network() {
        let config = ParsedConfig {
            source_hostname: "10.0.0.1".to_string(),
            nodes: vec![node("10.0.0.1", Some(("external", "203.0.113.1")))],
            ..Default::default()
        };

        assert_eq!(NetworkTypeHeuristic::identify(&config), "default");
    }

    #[test]
    fn bootstrap_host_on_alternate_network() {
        let config = ParsedConfig {
            source_hostname: "203.0.113.1:11210".to_string(),
            nodes: vec![node("10.0.0.1", Some(("external", "203.0.113.1")))],
            ..Default::default()
        };

        assert_eq!(NetworkTypeHeuristic::identify(&config), "external");
    }

    #[test]
    fn unknown_host_falls_back_to_default() {
        let config = ParsedConfig {
            source_hostname: "unrelated".to_string(),
            nodes: vec![node("10.0.0.1", None)],
            ..Default::default()
        };

        assert_eq!(NetworkTypeHeuristic::identify(&config), "default");
    }
}
