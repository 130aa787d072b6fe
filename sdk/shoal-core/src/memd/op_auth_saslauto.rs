use tokio::time::Instant;

use crate::memd::auth_mechanism::AuthMechanism;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Error;
use crate::memd::error::Result;
use crate::memd::op_auth_saslbyname::{
    Credentials, OpSASLAuthByNameEncoder, OpsSASLAuthByName, SASLAuthByNameOptions,
};
use crate::memd::pendingop::ClientPendingOp;
use crate::memd::request::SASLListMechsRequest;
use crate::memd::response::{SASLListMechsResponse, TryFromClientResponse};

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLAuthAutoOptions {
    pub credentials: Credentials,

    // In preference order, strongest first.
    pub enabled_mechs: Vec<AuthMechanism>,
}

pub trait OpSASLAutoEncoder: OpSASLAuthByNameEncoder {
    fn sasl_list_mechs<D>(
        &self,
        dispatcher: &D,
        request: SASLListMechsRequest,
    ) -> impl std::future::Future<Output = Result<ClientPendingOp>>
    where
        D: Dispatcher;
}

pub struct OpsSASLAuthAuto {}

impl OpsSASLAuthAuto {
    pub async fn sasl_auth_auto<E, D>(
        &self,
        encoder: &E,
        dispatcher: &D,
        deadline: Instant,
        opts: SASLAuthAutoOptions,
    ) -> Result<()>
    where
        E: OpSASLAutoEncoder,
        D: Dispatcher,
    {
        if opts.enabled_mechs.is_empty() {
            return Err(Error::new_invalid_argument_error(
                "no enabled mechanisms",
                "enabled_mechs".to_string(),
            ));
        }

        let mut op = encoder
            .sasl_list_mechs(dispatcher, SASLListMechsRequest {})
            .await?;
        let packet = op.recv().await?;
        let server_mechs =
            <SASLListMechsResponse as TryFromClientResponse>::try_from(packet)?.available_mechs;

        // This unwrap is safe, we know the list is non-empty.
        let default_mech = opts.enabled_mechs.first().unwrap();

        match (OpsSASLAuthByName {})
            .sasl_auth_by_name(
                encoder,
                dispatcher,
                SASLAuthByNameOptions {
                    credentials: opts.credentials.clone(),
                    auth_mechanism: default_mech.clone(),
                    deadline,
                },
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_cancellation_error() {
                    return Err(e);
                }

                // There is no reliable way to tell an unsupported mechanism
                // apart from bad credentials. If the server advertised our
                // default mechanism the failure is real; otherwise fall back
                // to the strongest mechanism both sides support.
                if server_mechs.contains(default_mech) {
                    return Err(e);
                }

                let selected_mech = opts
                    .enabled_mechs
                    .iter()
                    .find(|item| server_mechs.contains(item));

                let selected_mech = match selected_mech {
                    Some(mech) => mech,
                    None => {
                        return Err(Error::new_message_error("no supported mechanisms found"));
                    }
                };

                OpsSASLAuthByName {}
                    .sasl_auth_by_name(
                        encoder,
                        dispatcher,
                        SASLAuthByNameOptions {
                            credentials: opts.credentials,
                            auth_mechanism: selected_mech.clone(),
                            deadline,
                        },
                    )
                    .await
            }
        }
    }
}
