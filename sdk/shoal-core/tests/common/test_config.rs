use envconfig::Envconfig;

#[derive(Debug, Clone, Envconfig)]
pub struct TestConfig {
    #[envconfig(from = "SHOAL_KV_ADDRS")]
    pub kv_addrs: Option<String>,
    #[envconfig(from = "SHOAL_HTTP_ADDRS")]
    pub http_addrs: Option<String>,
    #[envconfig(from = "SHOAL_USERNAME", default = "Administrator")]
    pub username: String,
    #[envconfig(from = "SHOAL_PASSWORD", default = "password")]
    pub password: String,
    #[envconfig(from = "SHOAL_BUCKET", default = "default")]
    pub bucket: String,
}

impl TestConfig {
    /// Integration tests skip when no cluster seed is configured.
    pub fn load() -> Option<TestConfig> {
        let config = TestConfig::init_from_env().ok()?;
        config.kv_addrs.as_ref()?;
        Some(config)
    }
}
