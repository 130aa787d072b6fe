pub mod test_config;

use shoal_core::address::Address;
use shoal_core::agent::Agent;
use shoal_core::agentoptions::{AgentOptions, SeedConfig};
use shoal_core::authenticator::{Authenticator, PasswordAuthenticator};
use shoal_core::features::BucketFeature;

use test_config::TestConfig;

fn parse_addrs(addrs: &str, default_port: u16) -> Vec<Address> {
    addrs
        .split(',')
        .filter(|a| !a.is_empty())
        .map(|a| {
            if let Some((host, port)) = a.rsplit_once(':') {
                Address {
                    host: host.to_string(),
                    port: port.parse().unwrap_or(default_port),
                }
            } else {
                Address {
                    host: a.to_string(),
                    port: default_port,
                }
            }
        })
        .collect()
}

/// Creates an agent against the configured test cluster, or None when no
/// cluster is configured and the test should silently skip.
pub async fn create_test_agent() -> Option<Agent> {
    let _ = env_logger::try_init();

    let config = TestConfig::load()?;

    let kv_addrs = parse_addrs(config.kv_addrs.as_deref().unwrap_or_default(), 11210);
    let http_addrs = config
        .http_addrs
        .as_deref()
        .map(|a| parse_addrs(a, 8091))
        .unwrap_or_default();

    let mut opts = AgentOptions::new(
        SeedConfig {
            kv_addrs,
            http_addrs,
        },
        Authenticator::PasswordAuthenticator(PasswordAuthenticator {
            username: config.username.clone(),
            password: config.password.clone(),
        }),
    );
    opts.bucket_name = Some(config.bucket.clone());

    Some(Agent::new(opts).await.expect("failed to create agent"))
}

pub async fn feature_supported(agent: &Agent, feature: BucketFeature) -> bool {
    agent
        .bucket_features()
        .await
        .map(|features| features.contains(&feature))
        .unwrap_or(false)
}

/// The vbucket a key routes to, assuming the server default of 1024
/// vbuckets: low bits of a CRC32 over the key.
pub fn vbucket_for_key(key: &[u8]) -> u16 {
    (crc32fast::hash(key) & 1023) as u16
}
