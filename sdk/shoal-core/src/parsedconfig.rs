use crate::vbucketmap::VbucketMap;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum BucketType {
    Invalid,
    Shoal,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub(crate) struct ParsedConfigNodePorts {
    pub kv: Option<u16>,
    pub mgmt: Option<u16>,
    pub query: Option<u16>,
    pub search: Option<u16>,
    pub analytics: Option<u16>,
    pub view: Option<u16>,
    pub eventing: Option<u16>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub(crate) struct ParsedConfigNodeAddresses {
    pub hostname: String,
    pub non_tls_ports: ParsedConfigNodePorts,
    pub tls_ports: ParsedConfigNodePorts,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub(crate) struct ParsedConfigNode {
    pub this_node: bool,
    pub has_data: bool,
    pub addresses: ParsedConfigNodeAddresses,
    pub alt_addresses: HashMap<String, ParsedConfigNodeAddresses>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub(crate) enum ParsedConfigBucketFeature {
    RangeScan,
    Collections,
    DurableWrites,
    ReplicaRead,
    NonDedupedHistory,
    Unknown,
}

impl From<String> for ParsedConfigBucketFeature {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rangeScan" => ParsedConfigBucketFeature::RangeScan,
            "collections" => ParsedConfigBucketFeature::Collections,
            "durableWrite" => ParsedConfigBucketFeature::DurableWrites,
            "subdoc.ReplicaRead" => ParsedConfigBucketFeature::ReplicaRead,
            "nonDedupedHistory" => ParsedConfigBucketFeature::NonDedupedHistory,
            _ => ParsedConfigBucketFeature::Unknown,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ParsedConfigBucket {
    pub bucket_uuid: String,
    pub bucket_name: String,
    pub bucket_type: BucketType,
    pub vbucket_map: Option<VbucketMap>,
    pub features: Vec<ParsedConfigBucketFeature>,
}

/// An immutable snapshot of the cluster topology, parsed out of one cluster
/// map. Snapshots are ordered by (rev_epoch, rev_id); the config manager only
/// ever replaces the current snapshot with a strictly newer one.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ParsedConfig {
    pub rev_id: i64,
    pub rev_epoch: i64,

    pub source_hostname: String,

    pub bucket: Option<ParsedConfigBucket>,

    pub nodes: Vec<ParsedConfigNode>,
}

impl Default for ParsedConfig {
    fn default() -> Self {
        Self {
            rev_id: -1,
            rev_epoch: 0,
            source_hostname: "".to_string(),
            bucket: None,
            nodes: vec![],
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct NetworkConfigNode {
    pub node_id: String,
    pub hostname: String,
    pub has_data: bool,
    pub non_tls_ports: ParsedConfigNodePorts,
    pub tls_ports: ParsedConfigNodePorts,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct NetworkConfig {
    pub nodes: Vec<NetworkConfigNode>,
}

impl ParsedConfig {
    pub fn is_versioned(&self) -> bool {
        self.rev_epoch > 0 && self.rev_id > 0
    }

    // Projects the nodes through the requested network. Unknown network names
    // fall back to the default addresses.
    pub fn addresses_group_for_network_type(&self, network_type: &str) -> NetworkConfig {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let node_id = format!(
                "ep-{}-{}",
                node.addresses.hostname,
                node.addresses.non_tls_ports.mgmt.unwrap_or_default()
            );

            let addresses = if network_type == "default" {
                &node.addresses
            } else if let Some(alt_info) = node.alt_addresses.get(network_type) {
                alt_info
            } else {
                &node.addresses
            };

            nodes.push(NetworkConfigNode {
                node_id,
                hostname: addresses.hostname.clone(),
                has_data: node.has_data,
                non_tls_ports: addresses.non_tls_ports.clone(),
                tls_ports: addresses.tls_ports.clone(),
            });
        }

        NetworkConfig { nodes }
    }
}

impl PartialOrd for ParsedConfig {
    fn partial_cmp(&self, other: &ParsedConfig) -> Option<Ordering> {
        match self.rev_epoch.cmp(&other.rev_epoch) {
            Ordering::Less => return Some(Ordering::Less),
            Ordering::Greater => return Some(Ordering::Greater),
            Ordering::Equal => {}
        }

        Some(self.rev_id.cmp(&other.rev_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rev_epoch: i64, rev_id: i64) -> ParsedConfig {
        ParsedConfig {
            rev_id,
            rev_epoch,
            ..Default::default()
        }
    }

    #[test]
    fn ordering_is_epoch_then_rev() {
        assert!(config(1, 1) < config(2, 0));
        assert!(config(1, 2) > config(1, 1));
        assert!(config(1, 1) == config(1, 1).clone());
        assert_eq!(
            config(2, 5).partial_cmp(&config(2, 5)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn missing_epoch_orders_lowest() {
        // An absent epoch parses as zero and never supersedes an epoch'd one.
        assert!(config(0, 100) < config(1, 1));
    }
}
