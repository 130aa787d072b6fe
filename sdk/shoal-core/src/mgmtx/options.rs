#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTerseBucketConfigOptions<'a> {
    pub bucket_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTerseClusterConfigOptions {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct BucketSettings {
    pub ram_quota_mb: Option<u64>,
    pub flush_enabled: Option<bool>,
    pub num_replicas: Option<u32>,
    pub bucket_type: Option<String>,
    pub eviction_policy: Option<String>,
    pub max_expiry_secs: Option<u32>,
    pub compression_mode: Option<String>,
    pub durability_min_level: Option<String>,
    pub storage_backend: Option<String>,
    pub num_vbuckets: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketOptions<'a> {
    pub bucket_name: &'a str,
    pub settings: BucketSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteBucketOptions<'a> {
    pub bucket_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateScopeOptions<'a> {
    pub bucket_name: &'a str,
    pub scope_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteScopeOptions<'a> {
    pub bucket_name: &'a str,
    pub scope_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCollectionOptions<'a> {
    pub bucket_name: &'a str,
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub max_expiry_secs: Option<i32>,
    pub history: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteCollectionOptions<'a> {
    pub bucket_name: &'a str,
    pub scope_name: &'a str,
    pub collection_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCollectionManifestOptions<'a> {
    pub bucket_name: &'a str,
}
