use log::warn;
use tokio::time::Instant;

use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::op_auth_saslauto::{OpSASLAutoEncoder, OpsSASLAuthAuto, SASLAuthAutoOptions};
use crate::memd::pendingop::{run_op_future_with_deadline, StandardPendingOp};
use crate::memd::request::{
    GetClusterConfigRequest, GetErrorMapRequest, HelloRequest, SelectBucketRequest,
};
use crate::memd::response::{
    BootstrapResult, GetClusterConfigResponse, GetErrorMapResponse, HelloResponse,
    SelectBucketResponse,
};

pub trait OpBootstrapEncoder {
    fn hello<D>(
        &self,
        dispatcher: &D,
        request: HelloRequest,
    ) -> impl std::future::Future<Output = Result<StandardPendingOp<HelloResponse>>>
    where
        D: Dispatcher;

    fn get_error_map<D>(
        &self,
        dispatcher: &D,
        request: GetErrorMapRequest,
    ) -> impl std::future::Future<Output = Result<StandardPendingOp<GetErrorMapResponse>>>
    where
        D: Dispatcher;

    fn select_bucket<D>(
        &self,
        dispatcher: &D,
        request: SelectBucketRequest,
    ) -> impl std::future::Future<Output = Result<StandardPendingOp<SelectBucketResponse>>>
    where
        D: Dispatcher;

    fn get_cluster_config<D>(
        &self,
        dispatcher: &D,
        request: GetClusterConfigRequest,
    ) -> impl std::future::Future<Output = Result<StandardPendingOp<GetClusterConfigResponse>>>
    where
        D: Dispatcher;
}

pub struct OpBootstrap {}

#[derive(Clone, Debug)]
pub struct BootstrapOptions {
    pub hello: Option<HelloRequest>,
    pub get_error_map: Option<GetErrorMapRequest>,
    pub auth: Option<SASLAuthAutoOptions>,
    pub select_bucket: Option<SelectBucketRequest>,
    pub get_cluster_config: Option<GetClusterConfigRequest>,
    pub deadline: Instant,
}

impl OpBootstrap {
    // Bootstrap is not pipelined; SCRAM's multi-step exchange and the retry
    // behaviour inside sasl auto make pipelining awkward for little gain.
    pub async fn bootstrap<E, D>(
        encoder: E,
        dispatcher: &D,
        opts: BootstrapOptions,
    ) -> Result<BootstrapResult>
    where
        E: OpBootstrapEncoder + OpSASLAutoEncoder,
        D: Dispatcher,
    {
        let mut result = BootstrapResult {
            hello: None,
            error_map: None,
            cluster_config: None,
        };

        if let Some(req) = opts.hello {
            result.hello =
                match run_op_future_with_deadline(opts.deadline, encoder.hello(dispatcher, req))
                    .await
                {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!("Hello failed {e}");
                        None
                    }
                };
        }

        if let Some(req) = opts.get_error_map {
            result.error_map = match run_op_future_with_deadline(
                opts.deadline,
                encoder.get_error_map(dispatcher, req),
            )
            .await
            {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!("Get error map failed {e}");
                    None
                }
            };
        }

        if let Some(req) = opts.auth {
            if let Err(e) = (OpsSASLAuthAuto {})
                .sasl_auth_auto(&encoder, dispatcher, opts.deadline, req)
                .await
            {
                warn!("Auth failed {e}");
                return Err(e);
            }
        }

        if let Some(req) = opts.select_bucket {
            if let Err(e) =
                run_op_future_with_deadline(opts.deadline, encoder.select_bucket(dispatcher, req))
                    .await
            {
                warn!("Select bucket failed {e}");
                return Err(e);
            }
        }

        if let Some(req) = opts.get_cluster_config {
            result.cluster_config = match run_op_future_with_deadline(
                opts.deadline,
                encoder.get_cluster_config(dispatcher, req),
            )
            .await
            {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!("Get cluster config failed {e}");
                    None
                }
            };
        }

        Ok(result)
    }
}
