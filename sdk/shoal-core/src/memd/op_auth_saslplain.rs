use tokio::time::Instant;

use crate::memd::auth_mechanism::AuthMechanism;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::pendingop::{run_op_future_with_deadline, StandardPendingOp};
use crate::memd::request::SASLAuthRequest;
use crate::memd::response::SASLAuthResponse;

pub trait OpSASLPlainEncoder {
    fn sasl_auth<D>(
        &self,
        dispatcher: &D,
        request: SASLAuthRequest,
    ) -> impl std::future::Future<Output = Result<StandardPendingOp<SASLAuthResponse>>>
    where
        D: Dispatcher;
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLAuthPlainOptions {
    pub username: String,
    pub password: String,
    pub deadline: Instant,
}

pub struct OpsSASLAuthPlain {}

impl OpsSASLAuthPlain {
    pub async fn sasl_auth_plain<E, D>(
        &self,
        encoder: &E,
        dispatcher: &D,
        opts: SASLAuthPlainOptions,
    ) -> Result<()>
    where
        E: OpSASLPlainEncoder,
        D: Dispatcher,
    {
        let mut payload = vec![0];
        payload.extend_from_slice(opts.username.as_bytes());
        payload.push(0);
        payload.extend_from_slice(opts.password.as_bytes());

        let req = SASLAuthRequest {
            payload,
            auth_mechanism: AuthMechanism::Plain,
        };

        run_op_future_with_deadline(opts.deadline, encoder.sasl_auth(dispatcher, req)).await?;

        Ok(())
    }
}
