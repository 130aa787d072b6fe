pub mod error;

use error::ErrorKind;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 8091;
pub const DEFAULT_HTTPS_PORT: u16 = 18091;
pub const DEFAULT_KV_PORT: u16 = 11210;
pub const DEFAULT_TLS_KV_PORT: u16 = 11207;

const PLAIN_SCHEME: &str = "shoal";
const TLS_SCHEME: &str = "shoals";

/// The parsed, unresolved form of a connection string:
/// `scheme://host[:port][,host[:port]]*[?option=value&...]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnSpec {
    scheme: Option<String>,
    hosts: Vec<HostEntry>,
    options: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostEntry {
    host: String,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsConfig {
    pub nameserver: SocketAddr,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SrvRecord {
    pub proto: String,
    pub scheme: String,
    pub host: String,
}

impl ConnSpec {
    pub fn options(&self) -> &HashMap<String, Vec<String>> {
        &self.options
    }

    // A spec is SRV-eligible when it names exactly one host with no explicit
    // port and the host is not an IP literal.
    fn srv_record(&self) -> Option<SrvRecord> {
        let scheme = self.scheme.as_deref()?;
        if (scheme != PLAIN_SCHEME && scheme != TLS_SCHEME)
            || self.hosts.len() != 1
            || self.hosts[0].port.is_some()
        {
            return None;
        }

        let host = &self.hosts[0].host;
        if host_is_ip_address(host) {
            return None;
        }

        Some(SrvRecord {
            scheme: scheme.to_string(),
            proto: "tcp".to_string(),
            host: host.clone(),
        })
    }
}

impl Display for ConnSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let scheme = self
            .scheme
            .clone()
            .map(|scheme| format!("{scheme}://"))
            .unwrap_or_default();

        let hosts = self
            .hosts
            .iter()
            .map(|entry| {
                if let Some(port) = &entry.port {
                    format!("{}:{}", entry.host, port)
                } else {
                    entry.host.clone()
                }
            })
            .collect::<Vec<String>>()
            .join(",");

        let mut url_options = self.options.iter().fold(String::new(), |acc, (k, v)| {
            let values = v
                .iter()
                .map(|value| format!("{k}={value}"))
                .collect::<Vec<String>>()
                .join("&");
            if acc.is_empty() {
                values
            } else {
                format!("{acc}&{values}")
            }
        });
        if !url_options.is_empty() {
            url_options = format!("?{url_options}");
        }

        write!(f, "{scheme}{hosts}{url_options}")
    }
}

pub fn parse(conn_str: impl AsRef<str>) -> error::Result<ConnSpec> {
    let conn_str = conn_str.as_ref();

    let parts_matcher =
        Regex::new(r"((.*)://)?(([^/?:]*)(:([^/?:@]*))?@)?([^/?]*)(/([^?]*))?(\?(.*))?").unwrap();
    let host_matcher = Regex::new(r"((\[[^]]+]+)|([^;,:]+))(:([0-9]*))?(;,)?").unwrap();

    let parts = match parts_matcher.captures(conn_str) {
        Some(parts) => parts,
        None => return Ok(ConnSpec::default()),
    };

    let scheme = parts.get(2).map(|m| m.as_str().to_string());

    let mut hosts = vec![];
    if let Some(host_list) = parts.get(7) {
        for host_info in host_matcher.captures_iter(host_list.as_str()) {
            let mut entry = HostEntry {
                host: host_info[1].to_string(),
                port: None,
            };

            if let Some(port) = host_info.get(5) {
                entry.port = Some(
                    port.as_str()
                        .parse()
                        .map_err(|e| ErrorKind::Parse(format!("failed to parse port: {e}")))?,
                );
            }

            hosts.push(entry);
        }
    }

    let options = if let Some(options) = parts.get(11) {
        form_urlencoded::parse(options.as_str().as_bytes())
            .into_owned()
            .fold(
                HashMap::new(),
                |mut acc: HashMap<String, Vec<String>>, (k, v)| {
                    acc.entry(k).or_default().push(v);
                    acc
                },
            )
    } else {
        HashMap::default()
    };

    Ok(ConnSpec {
        scheme,
        hosts,
        options,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConnSpec {
    pub use_tls: bool,
    pub kv_hosts: Vec<Address>,
    pub http_hosts: Vec<Address>,
    pub srv_record: Option<SrvRecord>,
    pub options: HashMap<String, Vec<String>>,
}

pub async fn resolve(
    conn_spec: ConnSpec,
    dns_config: impl Into<Option<DnsConfig>>,
) -> error::Result<ResolvedConnSpec> {
    let (default_port, has_explicit_scheme, use_tls) = match conn_spec.scheme.as_deref() {
        Some(PLAIN_SCHEME) => (DEFAULT_KV_PORT, true, false),
        Some(TLS_SCHEME) => (DEFAULT_TLS_KV_PORT, true, true),
        Some("") | None => (DEFAULT_KV_PORT, false, false),
        Some(_) => {
            return Err(ErrorKind::InvalidArgument {
                msg: "unrecognized scheme".to_string(),
                arg: "scheme".to_string(),
            }
            .into());
        }
    };

    if let Some(srv_record) = conn_spec.srv_record() {
        match lookup_srv(
            &srv_record.scheme,
            &srv_record.proto,
            &srv_record.host,
            dns_config.into(),
        )
        .await
        {
            Ok(kv_hosts) => {
                return Ok(ResolvedConnSpec {
                    use_tls,
                    kv_hosts,
                    http_hosts: vec![],
                    srv_record: Some(srv_record),
                    options: conn_spec.options,
                });
            }
            Err(e) => {
                debug!("Srv lookup failed {e}");
            }
        };
    };

    let (default_kv_port, default_http_port) = if use_tls {
        (DEFAULT_TLS_KV_PORT, DEFAULT_HTTPS_PORT)
    } else {
        (DEFAULT_KV_PORT, DEFAULT_HTTP_PORT)
    };

    if conn_spec.hosts.is_empty() {
        return Ok(ResolvedConnSpec {
            use_tls,
            kv_hosts: vec![Address {
                host: "127.0.0.1".to_string(),
                port: default_kv_port,
            }],
            http_hosts: vec![Address {
                host: "127.0.0.1".to_string(),
                port: default_http_port,
            }],
            srv_record: None,
            options: conn_spec.options,
        });
    }

    let mut kv_hosts = vec![];
    let mut http_hosts = vec![];
    for entry in conn_spec.hosts {
        if let Some(port) = entry.port {
            if port == DEFAULT_HTTP_PORT {
                return Err(ErrorKind::InvalidArgument {
                    msg: format!(
                        "{PLAIN_SCHEME}://host:{DEFAULT_HTTP_PORT} is not supported, use {PLAIN_SCHEME}://host"
                    ),
                    arg: "port".to_string(),
                }
                .into());
            }

            if !has_explicit_scheme && port != default_port {
                return Err(ErrorKind::InvalidArgument {
                    msg: "ambiguous port without scheme".to_string(),
                    arg: "port".to_string(),
                }
                .into());
            }

            kv_hosts.push(Address {
                host: entry.host,
                port,
            });
        } else {
            kv_hosts.push(Address {
                host: entry.host.clone(),
                port: default_kv_port,
            });
            http_hosts.push(Address {
                host: entry.host,
                port: default_http_port,
            });
        }
    }

    Ok(ResolvedConnSpec {
        use_tls,
        kv_hosts,
        http_hosts,
        srv_record: None,
        options: conn_spec.options,
    })
}

async fn lookup_srv(
    scheme: &str,
    proto: &str,
    host: &str,
    dns_config: Option<DnsConfig>,
) -> error::Result<Vec<Address>> {
    let (resolver_config, resolver_opts) = match dns_config {
        Some(dns) => {
            let mut group = NameServerConfigGroup::with_capacity(2);
            group.push(NameServerConfig::new(dns.nameserver, Protocol::Udp));
            group.push(NameServerConfig::new(dns.nameserver, Protocol::Tcp));

            let config = ResolverConfig::from_parts(None, vec![], group);

            let mut opts = ResolverOpts::default();
            if let Some(timeout) = dns.timeout {
                opts.timeout = timeout;
            }

            (config, opts)
        }
        None => read_system_conf().map_err(ErrorKind::Resolve)?,
    };

    let resolver = TokioAsyncResolver::tokio(resolver_config, resolver_opts);

    let name = format!("_{scheme}._{proto}.{host}");
    let response = resolver.srv_lookup(name).await?;

    let mut addresses = vec![];
    for record in response.iter() {
        addresses.push(Address {
            host: record.target().to_string(),
            port: record.port(),
        });
    }

    Ok(addresses)
}

fn host_is_ip_address(host: &str) -> bool {
    host.starts_with('[') || host.parse::<std::net::IpAddr>().is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_or_die(conn_str: &str) -> ConnSpec {
        parse(conn_str).unwrap_or_else(|e| panic!("Failed to parse {conn_str}: {e:?}"))
    }

    async fn resolve_or_die(conn_spec: ConnSpec) -> ResolvedConnSpec {
        resolve(conn_spec.clone(), None)
            .await
            .unwrap_or_else(|e| panic!("Failed to resolve {conn_spec:?}: {e:?}"))
    }

    async fn check_spec(
        conn_str: &str,
        expected_scheme: Option<&str>,
        expected_hosts: &[(&str, Option<u16>)],
        expect_kv_hosts: &[(&str, u16)],
        use_tls: bool,
    ) {
        let cs = parse_or_die(conn_str);

        assert_eq!(
            cs.scheme.as_deref(),
            expected_scheme,
            "Parsed incorrect scheme for {conn_str}"
        );
        assert_eq!(
            cs.hosts.len(),
            expected_hosts.len(),
            "Some addresses were not parsed for {conn_str}"
        );
        for (entry, (host, port)) in cs.hosts.iter().zip(expected_hosts.iter()) {
            assert_eq!(&entry.host, host);
            assert_eq!(&entry.port, port);
        }

        let rcs = resolve_or_die(cs).await;
        assert_eq!(rcs.use_tls, use_tls, "Did not correctly mark TLS");
        assert_eq!(rcs.kv_hosts.len(), expect_kv_hosts.len());
        for (addr, (host, port)) in rcs.kv_hosts.iter().zip(expect_kv_hosts.iter()) {
            assert_eq!(&addr.host, host);
            assert_eq!(&addr.port, port);
        }
    }

    #[tokio::test]
    async fn test_parse_basic() {
        check_spec(
            "shoal://1.2.3.4",
            Some("shoal"),
            &[("1.2.3.4", None)],
            &[("1.2.3.4", DEFAULT_KV_PORT)],
            false,
        )
        .await;

        check_spec(
            "shoal://[2001:4860:4860::8888]",
            Some("shoal"),
            &[("[2001:4860:4860::8888]", None)],
            &[("[2001:4860:4860::8888]", DEFAULT_KV_PORT)],
            false,
        )
        .await;

        check_spec(
            "shoal://",
            Some("shoal"),
            &[],
            &[("127.0.0.1", DEFAULT_KV_PORT)],
            false,
        )
        .await;

        check_spec(
            "1.2.3.4",
            None,
            &[("1.2.3.4", None)],
            &[("1.2.3.4", DEFAULT_KV_PORT)],
            false,
        )
        .await;

        let cs = parse_or_die("1.2.3.4:8091");
        assert!(
            resolve(cs, None).await.is_err(),
            "Expected error with http port"
        );

        let cs = parse_or_die("1.2.3.4:999");
        assert!(
            resolve(cs, None).await.is_err(),
            "Expected error with non-default port without scheme"
        );

        let cs = parse_or_die("http://1.2.3.4");
        assert!(
            resolve(cs, None).await.is_err(),
            "Expected error with unknown scheme"
        );
    }

    #[tokio::test]
    async fn test_parse_hosts() {
        check_spec(
            "shoal://foo.com,bar.com,baz.com",
            Some("shoal"),
            &[("foo.com", None), ("bar.com", None), ("baz.com", None)],
            &[
                ("foo.com", DEFAULT_KV_PORT),
                ("bar.com", DEFAULT_KV_PORT),
                ("baz.com", DEFAULT_KV_PORT),
            ],
            false,
        )
        .await;

        check_spec(
            "shoal://foo.com,bar.com:4444",
            Some("shoal"),
            &[("foo.com", None), ("bar.com", Some(4444))],
            &[("foo.com", DEFAULT_KV_PORT), ("bar.com", 4444)],
            false,
        )
        .await;

        check_spec(
            "shoals://foo.com:4444,bar.com:5555",
            Some("shoals"),
            &[("foo.com", Some(4444)), ("bar.com", Some(5555))],
            &[("foo.com", 4444), ("bar.com", 5555)],
            true,
        )
        .await;

        check_spec(
            "shoals://",
            Some("shoals"),
            &[],
            &[("127.0.0.1", DEFAULT_TLS_KV_PORT)],
            true,
        )
        .await;

        let cs = parse_or_die("shoal://foo.com:8091");
        assert!(
            resolve(cs, None).await.is_err(),
            "Expected error for shoal://XXX:8091"
        );
    }

    #[tokio::test]
    async fn test_options_passthrough() {
        let cs = parse_or_die("shoal://1.2.3.4?foo=fooval&bar=barval");
        assert_eq!(cs.options.len(), 2);
        assert_eq!(cs.options.get("foo"), Some(&vec!["fooval".to_string()]));
        assert_eq!(cs.options.get("bar"), Some(&vec!["barval".to_string()]));

        let cs = parse_or_die("shoal://1.2.3.4?foo=val1&foo=val2&");
        assert_eq!(
            cs.options.get("foo"),
            Some(&vec!["val1".to_string(), "val2".to_string()])
        );

        let rcs = resolve_or_die(cs).await;
        assert_eq!(
            rcs.options.get("foo"),
            Some(&vec!["val1".to_string(), "val2".to_string()])
        );
    }

    #[tokio::test]
    async fn test_http_hosts_follow_scheme() {
        let rcs = resolve_or_die(parse_or_die("shoals://foo.com")).await;
        // An explicit kv host resolution also records the http bootstrap host.
        assert!(rcs.kv_hosts.len() == 1 || rcs.srv_record.is_some());
        if rcs.srv_record.is_none() {
            assert_eq!(rcs.http_hosts.len(), 1);
            assert_eq!(rcs.http_hosts[0].port, DEFAULT_HTTPS_PORT);
        }
    }
}
