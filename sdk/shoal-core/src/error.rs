use crate::httpx::error::Error as HttpError;
use crate::memd::error::Error as MemdError;
use crate::mgmtx::error::Error as MgmtError;
use crate::retry::RetryReason;
use crate::service_type::ServiceType;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

/// The ordered record of retry attempts made on behalf of an operation,
/// attached to the error when the operation finally fails.
#[derive(Debug, Clone, Default)]
pub struct RetryInfo {
    pub attempts: u32,
    pub reasons: Vec<RetryReason>,
}

impl Display for RetryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "attempts: {}, reasons: [{}]",
            self.attempts,
            self.reasons
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[derive(thiserror::Error, Debug, Clone)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    pub kind: Arc<ErrorKind>,
    pub(crate) retry_info: Option<RetryInfo>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Arc::new(kind),
            retry_info: None,
        }
    }

    pub fn is_memd_error(&self) -> Option<&MemdError> {
        match self.kind.as_ref() {
            ErrorKind::Memd { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn retry_info(&self) -> Option<&RetryInfo> {
        self.retry_info.as_ref()
    }

    pub(crate) fn set_retry_info(&mut self, retry_info: RetryInfo) {
        self.retry_info = Some(retry_info);
    }

    pub(crate) fn new_invalid_arguments_error(msg: &str) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            msg: msg.to_string(),
        })
    }

    pub(crate) fn new_internal_error(msg: &str) -> Self {
        Self::new(ErrorKind::Internal {
            msg: msg.to_string(),
        })
    }

    pub(crate) fn new_message_error(msg: &str) -> Self {
        Self::new(ErrorKind::Generic {
            msg: msg.to_string(),
        })
    }

    pub(crate) fn new_feature_not_available_error(feature: String, msg: String) -> Self {
        Self::new(ErrorKind::FeatureNotAvailable { feature, msg })
    }

    pub fn new_memd_error(
        source: MemdError,
        dispatched_to: Option<SocketAddr>,
        dispatched_from: Option<SocketAddr>,
    ) -> Self {
        Self::new(ErrorKind::Memd {
            source,
            dispatched_to: dispatched_to.map(|x| x.to_string()),
            dispatched_from: dispatched_from.map(|x| x.to_string()),
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("{source} dispatched to: {dispatched_to:?}, dispatched from: {dispatched_from:?}")]
    Memd {
        source: MemdError,
        dispatched_to: Option<String>,
        dispatched_from: Option<String>,
    },
    #[error("{0}")]
    Http(HttpError),
    #[error("{0}")]
    Mgmt(MgmtError),
    #[error("An error occurred during serialization/deserialization {msg}")]
    #[non_exhaustive]
    JsonError { msg: String },
    #[error("Invalid argument {msg}")]
    #[non_exhaustive]
    InvalidArgument { msg: String },
    #[error("Endpoint not known {endpoint}")]
    #[non_exhaustive]
    EndpointNotKnown { endpoint: String },
    #[error("No endpoints available")]
    #[non_exhaustive]
    NoEndpointsAvailable,
    #[error("Shutdown")]
    Shutdown,
    #[error("No bucket selected")]
    NoBucket,
    #[error("No vbucket map available")]
    NoVbucketMap,
    #[error("Invalid vbucket map")]
    InvalidVbucketMap,
    #[error("No server assigned to vbucket {requested_vb_id}")]
    #[non_exhaustive]
    NoServerAssigned { requested_vb_id: u16 },
    #[error("Collection manifest outdated: our manifest uid: {manifest_uid}, server manifest uid: {server_manifest_uid}")]
    CollectionManifestOutdated {
        manifest_uid: u64,
        server_manifest_uid: u64,
    },
    #[error("Document irretrievable: no replica could service the read")]
    DocumentIrretrievable,
    #[error("Service not available {service}")]
    #[non_exhaustive]
    ServiceNotAvailable { service: ServiceType },
    #[error("Feature not available {feature}, {msg}")]
    #[non_exhaustive]
    FeatureNotAvailable { feature: String, msg: String },
    #[error("{msg}")]
    #[non_exhaustive]
    Generic { msg: String },
    #[error("Internal error {msg}")]
    #[non_exhaustive]
    Internal { msg: String },
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self {
            kind: Arc::new(err.into()),
            retry_info: None,
        }
    }
}

impl From<HttpError> for Error {
    fn from(value: HttpError) -> Self {
        Self::new(ErrorKind::Http(value))
    }
}

impl From<MgmtError> for Error {
    fn from(value: MgmtError) -> Self {
        Self::new(ErrorKind::Mgmt(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(ErrorKind::JsonError {
            msg: value.to_string(),
        })
    }
}
