use arc_swap::ArcSwap;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::memd::status::Status;

// The server-published error map: status code (hex string) to metadata
// describing how unknown statuses should be treated.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct ErrMap {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub errors: HashMap<String, ErrMapError>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct ErrMapError {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub attrs: Vec<String>,
}

impl ErrMap {
    fn parse(data: &[u8]) -> Option<ErrMap> {
        match serde_json::from_slice(data) {
            Ok(map) => Some(map),
            Err(e) => {
                debug!("Failed to parse error map: {e}");
                None
            }
        }
    }

    fn error_for_status(&self, status: Status) -> Option<&ErrMapError> {
        let code = format!("{:x}", u16::from(status));
        self.errors.get(&code)
    }
}

pub(crate) struct ErrMapComponent {
    err_map: ArcSwap<Option<ErrMap>>,
}

impl ErrMapComponent {
    pub fn new() -> Self {
        Self {
            err_map: ArcSwap::from_pointee(None),
        }
    }

    pub fn on_err_map(&self, data: &[u8]) {
        let new_map = match ErrMap::parse(data) {
            Some(map) => map,
            None => return,
        };

        let current = self.err_map.load();
        if let Some(current) = current.as_ref() {
            if current.revision >= new_map.revision {
                return;
            }
        }

        debug!(
            "Applying error map version {} revision {}",
            new_map.version, new_map.revision
        );
        self.err_map.store(Arc::new(Some(new_map)));
    }

    pub fn should_retry(&self, status: Status) -> bool {
        let guard = self.err_map.load();
        let map = match guard.as_ref() {
            Some(map) => map,
            None => return false,
        };

        let error = match map.error_for_status(status) {
            Some(error) => error,
            None => return false,
        };

        error
            .attrs
            .iter()
            .any(|attr| attr == "auto-retry" || attr == "retry-now" || attr == "retry-later")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"{
        "version": 2,
        "revision": 1,
        "errors": {
            "86": { "name": "ETMPFAIL", "desc": "Temporary failure", "attrs": ["temp", "retry-now"] },
            "ff": { "name": "EWEIRD", "desc": "Mystery status", "attrs": ["special-handling"] }
        }
    }"#;

    #[test]
    fn retry_follows_attrs() {
        let component = ErrMapComponent::new();
        component.on_err_map(SAMPLE);

        assert!(component.should_retry(Status::TmpFail));
        assert!(!component.should_retry(Status::Unknown(0xff)));
        assert!(!component.should_retry(Status::Unknown(0x77)));
    }

    #[test]
    fn older_revisions_are_ignored() {
        let component = ErrMapComponent::new();
        component.on_err_map(SAMPLE);

        let older = br#"{ "version": 2, "revision": 0, "errors": {} }"#;
        component.on_err_map(older);

        assert!(component.should_retry(Status::TmpFail));
    }

    #[test]
    fn unparseable_maps_are_dropped() {
        let component = ErrMapComponent::new();
        component.on_err_map(b"not json");
        assert!(!component.should_retry(Status::TmpFail));
    }
}
