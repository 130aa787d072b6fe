use hmac::Hmac;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use tokio::time::Instant;

use crate::memd::auth_mechanism::AuthMechanism;
use crate::memd::dispatcher::Dispatcher;
use crate::memd::error::Result;
use crate::memd::op_auth_saslplain::{OpSASLPlainEncoder, OpsSASLAuthPlain, SASLAuthPlainOptions};
use crate::memd::op_auth_saslscram::{OpSASLScramEncoder, OpsSASLAuthScram, SASLAuthScramOptions};
use crate::scram;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SASLAuthByNameOptions {
    pub credentials: Credentials,
    pub auth_mechanism: AuthMechanism,
    pub deadline: Instant,
}

pub trait OpSASLAuthByNameEncoder: OpSASLScramEncoder {}

pub struct OpsSASLAuthByName {}

impl OpsSASLAuthByName {
    pub async fn sasl_auth_by_name<E, D>(
        &self,
        encoder: &E,
        dispatcher: &D,
        opts: SASLAuthByNameOptions,
    ) -> Result<()>
    where
        E: OpSASLAuthByNameEncoder,
        D: Dispatcher,
    {
        let Credentials { username, password } = opts.credentials;

        match opts.auth_mechanism {
            AuthMechanism::Plain => {
                OpsSASLAuthPlain {}
                    .sasl_auth_plain(
                        encoder,
                        dispatcher,
                        SASLAuthPlainOptions {
                            username,
                            password,
                            deadline: opts.deadline,
                        },
                    )
                    .await
            }
            AuthMechanism::ScramSha1 => {
                let client =
                    scram::Client::<Hmac<Sha1>, Sha1>::new(username, password, None);
                OpsSASLAuthScram {}
                    .sasl_auth_scram(
                        encoder,
                        dispatcher,
                        client,
                        SASLAuthScramOptions {
                            mechanism: AuthMechanism::ScramSha1,
                            deadline: opts.deadline,
                        },
                    )
                    .await
            }
            AuthMechanism::ScramSha256 => {
                let client =
                    scram::Client::<Hmac<Sha256>, Sha256>::new(username, password, None);
                OpsSASLAuthScram {}
                    .sasl_auth_scram(
                        encoder,
                        dispatcher,
                        client,
                        SASLAuthScramOptions {
                            mechanism: AuthMechanism::ScramSha256,
                            deadline: opts.deadline,
                        },
                    )
                    .await
            }
            AuthMechanism::ScramSha512 => {
                let client =
                    scram::Client::<Hmac<Sha512>, Sha512>::new(username, password, None);
                OpsSASLAuthScram {}
                    .sasl_auth_scram(
                        encoder,
                        dispatcher,
                        client,
                        SASLAuthScramOptions {
                            mechanism: AuthMechanism::ScramSha512,
                            deadline: opts.deadline,
                        },
                    )
                    .await
            }
        }
    }
}
