use url::Url;

use crate::error;
use crate::error::Error;

pub(crate) fn get_host_port_from_uri(uri: &str) -> error::Result<String> {
    let parsed = Url::parse(uri)
        .map_err(|e| Error::new_message_error(&format!("failed to parse uri: {e}")))?;

    let host = if let Some(host) = parsed.host() {
        if let Some(port) = parsed.port() {
            format!("{host}:{port}")
        } else {
            host.to_string()
        }
    } else {
        return Err(Error::new_message_error(&format!("no host in URI {uri}")));
    };

    Ok(host)
}

pub(crate) fn hostname_from_addr_str(addr: &str) -> String {
    match split_host_port(addr) {
        Ok((host, _)) => host.to_string(),
        Err(_e) => addr.to_string(),
    }
}

pub(crate) fn get_hostname_from_host_port(host_port: &str) -> error::Result<String> {
    let (host, _) = split_host_port(host_port)?;

    if host.contains(':') {
        return Ok(format!("[{host}]"));
    }

    Ok(host.to_string())
}

fn split_host_port(hostport: &str) -> error::Result<(&str, &str)> {
    let i = hostport
        .rfind(':')
        .ok_or_else(|| Error::new_message_error("missing port in address"))?;

    if let Some(stripped) = hostport.strip_prefix('[') {
        let end = hostport
            .find(']')
            .ok_or_else(|| Error::new_message_error("missing ']' in address"))?;
        if end + 1 == hostport.len() || end + 1 != i {
            return Err(Error::new_message_error(&format!(
                "invalid address '{hostport}'"
            )));
        }
        let host = &hostport[1..end];
        let port = &hostport[i + 1..];
        if stripped.contains('[') || hostport[end + 1..].contains(']') {
            return Err(Error::new_message_error(&format!(
                "invalid address '{hostport}'"
            )));
        }
        Ok((host, port))
    } else {
        let host = &hostport[..i];
        if host.contains(':') {
            return Err(Error::new_message_error(&format!(
                "invalid address '{hostport}': too many colons"
            )));
        }
        let port = &hostport[i + 1..];
        Ok((host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_ports() {
        assert_eq!(split_host_port("foo:123").unwrap(), ("foo", "123"));
        assert_eq!(split_host_port("[::1]:123").unwrap(), ("::1", "123"));
        assert!(split_host_port("foo").is_err());
        assert!(split_host_port("a:b:123").is_err());
    }

    #[test]
    fn extracts_host_port_from_uri() {
        assert_eq!(
            get_host_port_from_uri("http://foo:8091/pools").unwrap(),
            "foo:8091"
        );
        assert!(get_host_port_from_uri("not a uri").is_err());
    }
}
