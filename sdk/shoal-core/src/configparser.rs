use std::collections::HashMap;

use crate::clustermap::{ClusterMapJson, NodePortsJson, VbucketServerMapJson};
use crate::error::Result;
use crate::parsedconfig::{
    BucketType, ParsedConfig, ParsedConfigBucket, ParsedConfigBucketFeature, ParsedConfigNode,
    ParsedConfigNodeAddresses, ParsedConfigNodePorts,
};
use crate::vbucketmap::VbucketMap;

pub(crate) struct ConfigParser {}

impl ConfigParser {
    pub fn parse_cluster_map(config: ClusterMapJson, source_hostname: &str) -> Result<ParsedConfig> {
        let rev_id = config.rev;
        let rev_epoch = config.rev_epoch.unwrap_or_default();

        let len_nodes = config.nodes.as_ref().map(|nodes| nodes.len()).unwrap_or(0);

        let mut nodes = Vec::with_capacity(config.nodes_ext.len());
        for (node_idx, node) in config.nodes_ext.into_iter().enumerate() {
            let node_hostname = Self::parse_config_hostname(&node.hostname, source_hostname);

            let mut alt_addresses = HashMap::new();
            for (network_type, alt_addrs) in node.alternate_addresses {
                let alt_hostname = Self::parse_config_hostname(&alt_addrs.hostname, &node_hostname);
                let this_address = Self::parse_config_ports_into(
                    &alt_hostname,
                    alt_addrs.ports.unwrap_or_default(),
                );

                alt_addresses.insert(network_type, this_address);
            }

            nodes.push(ParsedConfigNode {
                this_node: node.this_node.unwrap_or_default(),
                has_data: node_idx < len_nodes,
                addresses: Self::parse_config_ports_into(
                    &node_hostname,
                    node.services.unwrap_or_default(),
                ),
                alt_addresses,
            });
        }

        let bucket = if let Some(bucket_name) = config.name {
            let bucket_uuid = config.uuid.unwrap_or_default();
            let (bucket_type, vbucket_map) = match config.node_locator.as_deref() {
                Some("vbucket") => (
                    BucketType::Shoal,
                    Self::parse_vbucket_server_map(config.vbucket_server_map)?,
                ),
                _ => (BucketType::Invalid, None),
            };

            let mut features = vec![];
            if let Some(bucket_capabilities) = config.bucket_capabilities {
                for cap in bucket_capabilities {
                    let feat = ParsedConfigBucketFeature::from(cap);
                    if feat != ParsedConfigBucketFeature::Unknown {
                        features.push(feat);
                    }
                }
            }

            Some(ParsedConfigBucket {
                bucket_uuid,
                bucket_name,
                bucket_type,
                vbucket_map,
                features,
            })
        } else {
            None
        };

        Ok(ParsedConfig {
            rev_id,
            rev_epoch,
            bucket,
            nodes,
            source_hostname: source_hostname.to_string(),
        })
    }

    fn parse_config_hostname(hostname: &Option<String>, source_hostname: &str) -> String {
        match hostname {
            Some(hostname) => {
                if hostname.contains(':') {
                    format!("[{hostname}]")
                } else {
                    hostname.to_string()
                }
            }
            None => source_hostname.to_string(),
        }
    }

    fn parse_config_ports_into(hostname: &str, ports: NodePortsJson) -> ParsedConfigNodeAddresses {
        ParsedConfigNodeAddresses {
            hostname: hostname.to_string(),
            non_tls_ports: ParsedConfigNodePorts {
                kv: ports.kv,
                mgmt: ports.mgmt,
                query: ports.query,
                search: ports.search,
                analytics: ports.analytics,
                view: ports.view,
                eventing: ports.eventing,
            },
            tls_ports: ParsedConfigNodePorts {
                kv: ports.kv_tls,
                mgmt: ports.mgmt_tls,
                query: ports.query_tls,
                search: ports.search_tls,
                analytics: ports.analytics_tls,
                view: ports.view_tls,
                eventing: ports.eventing_tls,
            },
        }
    }

    fn parse_vbucket_server_map(
        vbucket_server_map: Option<VbucketServerMapJson>,
    ) -> Result<Option<VbucketMap>> {
        if let Some(vbucket_server_map) = vbucket_server_map {
            if vbucket_server_map.vbucket_map.is_empty() {
                return Ok(None);
            }

            return Ok(Some(VbucketMap::new(
                vbucket_server_map.vbucket_map,
                vbucket_server_map.num_replicas,
            )?));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"{
        "rev": 1073,
        "revEpoch": 2,
        "name": "default",
        "uuid": "6ebbbcdfc1cb7a33640f3e6f7b8c5e17",
        "nodeLocator": "vbucket",
        "bucketCapabilities": ["collections", "rangeScan", "durableWrite"],
        "nodes": [
            { "hostname": "10.0.0.1:8091" },
            { "hostname": "10.0.0.2:8091" }
        ],
        "nodesExt": [
            {
                "services": { "kv": 11210, "kvSSL": 11207, "mgmt": 8091, "n1ql": 8093 },
                "thisNode": true,
                "hostname": "10.0.0.1",
                "alternateAddresses": {
                    "external": {
                        "hostname": "203.0.113.1",
                        "ports": { "kv": 21210, "mgmt": 28091 }
                    }
                }
            },
            {
                "services": { "kv": 11210, "mgmt": 8091 },
                "hostname": "10.0.0.2"
            },
            {
                "services": { "mgmt": 8091 },
                "hostname": "10.0.0.3"
            }
        ],
        "vBucketServerMap": {
            "hashAlgorithm": "CRC",
            "numReplicas": 1,
            "serverList": ["10.0.0.1:11210", "10.0.0.2:11210"],
            "vBucketMap": [[0,1],[1,0],[0,1],[1,0]]
        }
    }"#;

    #[test]
    fn parses_full_bucket_config() {
        let map: ClusterMapJson = serde_json::from_str(SAMPLE_CONFIG).unwrap();
        let parsed = ConfigParser::parse_cluster_map(map, "10.0.0.1").unwrap();

        assert_eq!(parsed.rev_id, 1073);
        assert_eq!(parsed.rev_epoch, 2);
        assert_eq!(parsed.nodes.len(), 3);
        assert!(parsed.nodes[0].this_node);
        assert!(parsed.nodes[0].has_data);
        assert!(parsed.nodes[1].has_data);
        // The third node carries no data service.
        assert!(!parsed.nodes[2].has_data);
        assert_eq!(parsed.nodes[0].addresses.non_tls_ports.kv, Some(11210));
        assert_eq!(parsed.nodes[0].addresses.tls_ports.kv, Some(11207));

        let alt = parsed.nodes[0].alt_addresses.get("external").unwrap();
        assert_eq!(alt.hostname, "203.0.113.1");
        assert_eq!(alt.non_tls_ports.kv, Some(21210));

        let bucket = parsed.bucket.unwrap();
        assert_eq!(bucket.bucket_name, "default");
        assert_eq!(bucket.bucket_type, BucketType::Shoal);
        assert_eq!(bucket.features.len(), 3);

        let vb_map = bucket.vbucket_map.unwrap();
        assert_eq!(vb_map.num_vbuckets(), 4);
        assert_eq!(vb_map.num_replicas(), 1);
    }

    #[test]
    fn missing_hostname_falls_back_to_source() {
        let config = r#"{
            "rev": 1,
            "nodesExt": [ { "services": { "kv": 11210 } } ]
        }"#;

        let map: ClusterMapJson = serde_json::from_str(config).unwrap();
        let parsed = ConfigParser::parse_cluster_map(map, "seed.example.com").unwrap();

        assert_eq!(parsed.nodes[0].addresses.hostname, "seed.example.com");
        assert!(parsed.bucket.is_none());
    }

    #[test]
    fn non_power_of_two_vbucket_map_is_rejected() {
        let config = r#"{
            "rev": 1,
            "name": "default",
            "nodeLocator": "vbucket",
            "nodesExt": [],
            "vBucketServerMap": {
                "hashAlgorithm": "CRC",
                "numReplicas": 0,
                "serverList": ["a:11210"],
                "vBucketMap": [[0],[0],[0]]
            }
        }"#;

        let map: ClusterMapJson = serde_json::from_str(config).unwrap();
        assert!(ConfigParser::parse_cluster_map(map, "a").is_err());
    }
}
