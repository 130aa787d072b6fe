use crate::clustermap::ClusterMapJson;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::memd::error::ServerErrorKind;
use crate::nmvbhandler::NotMyVbucketConfigHandler;
use crate::vbucketmap::VbucketMap;
use log::debug;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) trait VbucketRouter: Send + Sync {
    fn update_vbucket_info(&self, info: VbucketRoutingInfo);
    fn dispatch_by_key(
        &self,
        collection_id: u32,
        key: &[u8],
        vbucket_server_idx: u32,
    ) -> Result<(String, u16)>;
    fn dispatch_to_vbucket(&self, vb_id: u16) -> Result<String>;
    fn num_replicas(&self) -> Result<usize>;
}

#[derive(Clone, Debug)]
pub(crate) struct VbucketRoutingInfo {
    pub vbucket_info: Option<VbucketMap>,
    pub server_list: Vec<String>,
    pub bucket_selected: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct VbucketRouterOptions {}

pub(crate) struct StdVbucketRouter {
    routing_info: Mutex<VbucketRoutingInfo>,
}

impl StdVbucketRouter {
    pub(crate) fn new(info: VbucketRoutingInfo, _opts: VbucketRouterOptions) -> Self {
        Self {
            routing_info: Mutex::new(info),
        }
    }

    fn get_vbucket_info<'a>(info: &'a MutexGuard<VbucketRoutingInfo>) -> Result<&'a VbucketMap> {
        if let Some(i) = &info.vbucket_info {
            return Ok(i);
        }

        Err(ErrorKind::NoVbucketMap.into())
    }
}

impl VbucketRouter for StdVbucketRouter {
    fn update_vbucket_info(&self, info: VbucketRoutingInfo) {
        *self.routing_info.lock().unwrap() = info;
    }

    fn dispatch_by_key(
        &self,
        collection_id: u32,
        key: &[u8],
        vbucket_server_idx: u32,
    ) -> Result<(String, u16)> {
        let info = self.routing_info.lock().unwrap();
        if !info.bucket_selected {
            return Err(ErrorKind::NoBucket.into());
        }

        let vbucket_info = Self::get_vbucket_info(&info)?;
        let vb_id = vbucket_info.vbucket_by_key(collection_id, key);
        let idx = vbucket_info.node_by_vbucket(vb_id, vbucket_server_idx)?;

        if idx >= 0 {
            if let Some(server) = info.server_list.get(idx as usize) {
                return Ok((server.clone(), vb_id));
            }
        }

        Err(ErrorKind::NoServerAssigned {
            requested_vb_id: vb_id,
        }
        .into())
    }

    fn dispatch_to_vbucket(&self, vb_id: u16) -> Result<String> {
        let info = self.routing_info.lock().unwrap();
        if !info.bucket_selected {
            return Err(ErrorKind::NoBucket.into());
        }

        let idx = Self::get_vbucket_info(&info)?.node_by_vbucket(vb_id, 0)?;

        if idx >= 0 {
            if let Some(server) = info.server_list.get(idx as usize) {
                return Ok(server.clone());
            }
        }

        Err(ErrorKind::NoServerAssigned {
            requested_vb_id: vb_id,
        }
        .into())
    }

    fn num_replicas(&self) -> Result<usize> {
        let info = self.routing_info.lock().unwrap();
        Ok(Self::get_vbucket_info(&info)?.num_replicas())
    }
}

pub(crate) async fn orchestrate_memd_routing<V, Resp, Fut>(
    vb: Arc<V>,
    nmvb_handler: Arc<impl NotMyVbucketConfigHandler>,
    collection_id: u32,
    key: &[u8],
    vb_server_idx: u32,
    operation: impl Fn(String, u16) -> Fut,
) -> Result<Resp>
where
    V: VbucketRouter,
    Fut: Future<Output = Result<Resp>> + Send,
{
    let (endpoint, vb_id) = vb.dispatch_by_key(collection_id, key, vb_server_idx)?;

    let err = match operation(endpoint.clone(), vb_id).await {
        Ok(r) => return Ok(r),
        Err(e) => e,
    };

    // A NotMyVbucket response usually piggy-backs the newer config; apply it
    // before the retry orchestrator reroutes the operation.
    let config = if let Some(memd_err) = err.is_memd_error() {
        if memd_err.is_server_error_kind(ServerErrorKind::NotMyVbucket) {
            match memd_err.has_server_config() {
                Some(config) => config,
                None => {
                    debug!("Received empty not-my-vbucket response");
                    return Err(err);
                }
            }
        } else {
            return Err(err);
        }
    } else {
        return Err(err);
    };

    if config.is_empty() {
        return Err(err);
    }

    let value = match std::str::from_utf8(config.as_slice()) {
        Ok(v) => v.to_string(),
        Err(_e) => return Err(err),
    };

    let config = value.replace("$HOST", &endpoint);

    let config_json: ClusterMapJson = match serde_json::from_str(&config) {
        Ok(c) => c,
        Err(_) => {
            return Err(err);
        }
    };

    nmvb_handler
        .not_my_vbucket_config(config_json, &endpoint)
        .await;

    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_key_routes_to_expected_node() {
        let routing_info = VbucketRoutingInfo {
            vbucket_info: Some(
                VbucketMap::new(vec![vec![0, 1], vec![1, 0], vec![0, 1], vec![1, 0]], 1).unwrap(),
            ),
            server_list: vec!["endpoint1".to_string(), "endpoint2".to_string()],
            bucket_selected: true,
        };

        let router = StdVbucketRouter::new(routing_info, VbucketRouterOptions::default());

        // crc32("key1") & 3 == 0, crc32("key2") & 3 == 2.
        let (endpoint, vb_id) = router.dispatch_by_key(0, b"key1", 0).unwrap();
        assert_eq!("endpoint1", endpoint);
        assert_eq!(0, vb_id);

        let (endpoint, vb_id) = router.dispatch_by_key(0, b"key2", 0).unwrap();
        assert_eq!("endpoint1", endpoint);
        assert_eq!(2, vb_id);

        // Replica read goes to the other copy.
        let (endpoint, vb_id) = router.dispatch_by_key(0, b"key2", 1).unwrap();
        assert_eq!("endpoint2", endpoint);
        assert_eq!(2, vb_id);
    }

    #[test]
    fn dispatch_without_bucket_fails() {
        let routing_info = VbucketRoutingInfo {
            vbucket_info: Some(VbucketMap::new(vec![vec![0]; 2], 0).unwrap()),
            server_list: vec!["endpoint1".to_string()],
            bucket_selected: false,
        };

        let router = StdVbucketRouter::new(routing_info, VbucketRouterOptions::default());
        assert!(router.dispatch_by_key(0, b"key1", 0).is_err());
    }

    #[test]
    fn unassigned_vbucket_reports_no_server() {
        let routing_info = VbucketRoutingInfo {
            vbucket_info: Some(VbucketMap::new(vec![vec![-1], vec![-1]], 0).unwrap()),
            server_list: vec!["endpoint1".to_string()],
            bucket_selected: true,
        };

        let router = StdVbucketRouter::new(routing_info, VbucketRouterOptions::default());
        let err = router.dispatch_by_key(0, b"key1", 0).unwrap_err();
        assert!(matches!(
            err.kind.as_ref(),
            ErrorKind::NoServerAssigned { .. }
        ));
    }
}
