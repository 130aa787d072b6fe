use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// The JSON shape of a cluster map as published by the server, either via the
// KV GetClusterConfig op or the terse HTTP endpoints.

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct VbucketServerMapJson {
    #[serde(alias = "hashAlgorithm", default)]
    pub hash_algorithm: String,
    #[serde(alias = "numReplicas", default)]
    pub num_replicas: usize,
    #[serde(alias = "serverList", default)]
    pub server_list: Vec<String>,
    #[serde(alias = "vBucketMap", default)]
    pub vbucket_map: Vec<Vec<i16>>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct NodePortsJson {
    #[serde(alias = "kv")]
    pub kv: Option<u16>,
    #[serde(alias = "mgmt")]
    pub mgmt: Option<u16>,
    #[serde(alias = "n1ql")]
    pub query: Option<u16>,
    #[serde(alias = "fts")]
    pub search: Option<u16>,
    #[serde(alias = "cbas")]
    pub analytics: Option<u16>,
    #[serde(alias = "capi")]
    pub view: Option<u16>,
    #[serde(alias = "eventingAdminPort")]
    pub eventing: Option<u16>,

    #[serde(alias = "kvSSL")]
    pub kv_tls: Option<u16>,
    #[serde(alias = "mgmtSSL")]
    pub mgmt_tls: Option<u16>,
    #[serde(alias = "n1qlSSL")]
    pub query_tls: Option<u16>,
    #[serde(alias = "ftsSSL")]
    pub search_tls: Option<u16>,
    #[serde(alias = "cbasSSL")]
    pub analytics_tls: Option<u16>,
    #[serde(alias = "capiSSL")]
    pub view_tls: Option<u16>,
    #[serde(alias = "eventingSSL")]
    pub eventing_tls: Option<u16>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeAltAddressJson {
    #[serde(alias = "ports", default)]
    pub ports: Option<NodePortsJson>,
    #[serde(alias = "hostname")]
    pub hostname: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeExtJson {
    #[serde(alias = "services")]
    pub services: Option<NodePortsJson>,
    #[serde(alias = "thisNode")]
    pub this_node: Option<bool>,
    #[serde(alias = "hostname")]
    pub hostname: Option<String>,
    #[serde(alias = "alternateAddresses", default)]
    pub alternate_addresses: HashMap<String, NodeAltAddressJson>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeJson {
    #[serde(alias = "hostname")]
    pub hostname: Option<String>,
    #[serde(alias = "couchApiBase")]
    pub couch_api_base: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClusterMapJson {
    #[serde(alias = "rev")]
    pub rev: i64,
    #[serde(alias = "revEpoch")]
    pub rev_epoch: Option<i64>,
    #[serde(alias = "name")]
    pub name: Option<String>,
    #[serde(alias = "uuid")]
    pub uuid: Option<String>,
    #[serde(alias = "nodeLocator")]
    pub node_locator: Option<String>,
    #[serde(alias = "bucketCapabilities")]
    pub bucket_capabilities: Option<Vec<String>>,
    #[serde(alias = "collectionsManifestUid")]
    pub collections_manifest_uid: Option<String>,
    #[serde(alias = "vBucketServerMap")]
    pub vbucket_server_map: Option<VbucketServerMapJson>,
    #[serde(alias = "nodes")]
    pub nodes: Option<Vec<NodeJson>>,
    #[serde(alias = "nodesExt", default)]
    pub nodes_ext: Vec<NodeExtJson>,
    #[serde(alias = "clusterCapabilities", default)]
    pub cluster_capabilities: HashMap<String, Vec<String>>,
}

// A collection manifest as returned by GetCollectionsManifest or the scopes
// management endpoint: a monotonic uid over a tree of scopes and collections.

#[derive(Deserialize, Serialize, Debug, Clone)]
#[non_exhaustive]
pub struct CollectionManifestCollectionJson {
    #[serde(rename = "uid")]
    pub uid: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "maxTTL", default)]
    pub max_expiry: Option<i32>,
    #[serde(rename = "history", default)]
    pub history: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[non_exhaustive]
pub struct CollectionManifestScopeJson {
    #[serde(rename = "uid")]
    pub uid: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "collections", default)]
    pub collections: Vec<CollectionManifestCollectionJson>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[non_exhaustive]
pub struct CollectionManifestJson {
    #[serde(rename = "uid")]
    pub uid: String,
    #[serde(rename = "scopes", default)]
    pub scopes: Vec<CollectionManifestScopeJson>,
}
