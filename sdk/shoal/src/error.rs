use std::fmt::{Display, Formatter};
use std::sync::Arc;

use shoal_core::error::ErrorKind as CoreErrorKind;
use shoal_core::memd::error::{
    CancellationErrorKind, ErrorKind as MemdErrorKind, ServerErrorKind, SubdocErrorKind,
};
use shoal_core::mgmtx::error::{
    ErrorKind as MgmtErrorKind, ServerErrorKind as MgmtServerErrorKind,
};

pub type Result<T> = std::result::Result<T, Error>;

/// The user-visible error surface: a classified kind plus the context of the
/// failed operation (retries performed, last dispatched endpoint and so on).
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: ErrorContext,
    source: Option<Arc<shoal_core::error::Error>>,
}

#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ErrorContext {
    pub client_context_id: Option<String>,
    pub dispatched_to: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Application errors.
    DocumentNotFound,
    DocumentExists,
    CasMismatch,
    ValueTooLarge,
    PathNotFound,
    PathExists,
    DeltaInvalid,
    DocumentLocked,
    DocumentNotLocked,
    DocumentIrretrievable,

    // Durability errors.
    DurabilityImpossible,
    DurabilityAmbiguous,
    DurabilityInvalidLevel,
    SyncWriteInProgress,
    SyncWriteRecommitInProgress,

    // Resource errors.
    BucketNotFound,
    ScopeNotFound,
    CollectionNotFound,
    BucketExists,
    ScopeExists,
    CollectionExists,
    FeatureNotAvailable,

    // Transport errors.
    AmbiguousTimeout,
    UnambiguousTimeout,
    RequestCanceled,
    Disconnected,
    ServiceNotAvailable,

    // Auth and security errors.
    AuthenticationFailure,
    PermissionDenied,
    InvalidCertificate,

    // Internal errors.
    ParsingFailure,
    InvalidArgument,
    EncodingFailure,
    Internal,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: ErrorContext::default(),
            source: None,
        }
    }

    pub(crate) fn new_timeout(ambiguous: bool) -> Self {
        Self::new(if ambiguous {
            ErrorKind::AmbiguousTimeout
        } else {
            ErrorKind::UnambiguousTimeout
        })
    }

    pub(crate) fn invalid_argument(_msg: &str) -> Self {
        Self::new(ErrorKind::InvalidArgument)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.kind)?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if self.context.retry_attempts > 0 {
            write!(
                f,
                " (retried {} times: [{}])",
                self.context.retry_attempts,
                self.context.retry_reasons.join(", ")
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

fn classify_server_error(kind: &ServerErrorKind) -> ErrorKind {
    match kind {
        ServerErrorKind::KeyNotFound => ErrorKind::DocumentNotFound,
        ServerErrorKind::KeyExists => ErrorKind::DocumentExists,
        ServerErrorKind::CasMismatch => ErrorKind::CasMismatch,
        ServerErrorKind::TooBig => ErrorKind::ValueTooLarge,
        ServerErrorKind::Locked => ErrorKind::DocumentLocked,
        ServerErrorKind::NotStored => ErrorKind::DocumentExists,
        ServerErrorKind::DeltaBadVal => ErrorKind::DeltaInvalid,
        ServerErrorKind::DurabilityImpossible => ErrorKind::DurabilityImpossible,
        ServerErrorKind::DurabilityInvalid => ErrorKind::DurabilityInvalidLevel,
        ServerErrorKind::SyncWriteAmbiguous => ErrorKind::DurabilityAmbiguous,
        ServerErrorKind::SyncWriteInProgress => ErrorKind::SyncWriteInProgress,
        ServerErrorKind::SyncWriteRecommitInProgress => ErrorKind::SyncWriteRecommitInProgress,
        ServerErrorKind::UnknownCollectionID | ServerErrorKind::UnknownCollectionName => {
            ErrorKind::CollectionNotFound
        }
        ServerErrorKind::UnknownScopeName => ErrorKind::ScopeNotFound,
        ServerErrorKind::UnknownBucketName | ServerErrorKind::NoBucket => {
            ErrorKind::BucketNotFound
        }
        ServerErrorKind::Auth { .. } => ErrorKind::AuthenticationFailure,
        ServerErrorKind::Access => ErrorKind::PermissionDenied,
        ServerErrorKind::NotSupported => ErrorKind::FeatureNotAvailable,
        ServerErrorKind::InvalidArgs => ErrorKind::InvalidArgument,
        ServerErrorKind::RangeScanCancelled => ErrorKind::RequestCanceled,
        ServerErrorKind::Subdoc { error } => match error.kind() {
            SubdocErrorKind::PathNotFound => ErrorKind::PathNotFound,
            SubdocErrorKind::PathExists => ErrorKind::PathExists,
            SubdocErrorKind::BadDelta => ErrorKind::DeltaInvalid,
            _ => ErrorKind::InvalidArgument,
        },
        _ => ErrorKind::Internal,
    }
}

impl From<shoal_core::error::Error> for Error {
    fn from(err: shoal_core::error::Error) -> Self {
        let mut context = ErrorContext::default();
        if let Some(retry_info) = err.retry_info() {
            context.retry_attempts = retry_info.attempts;
            context.retry_reasons = retry_info.reasons.iter().map(|r| r.to_string()).collect();
        }

        let kind = match err.kind.as_ref() {
            CoreErrorKind::Memd {
                source,
                dispatched_to,
                ..
            } => {
                context.dispatched_to = dispatched_to.clone();

                match source.kind() {
                    MemdErrorKind::Server(e) => classify_server_error(e.kind()),
                    MemdErrorKind::Resource(e) => classify_server_error(e.cause().kind()),
                    MemdErrorKind::Cancelled(cancel_kind) => match cancel_kind {
                        CancellationErrorKind::Timeout => ErrorKind::UnambiguousTimeout,
                        CancellationErrorKind::RequestCancelled => ErrorKind::RequestCanceled,
                        CancellationErrorKind::ClosedInFlight => ErrorKind::Disconnected,
                        _ => unreachable!("non-exhaustive enum variant"),
                    },
                    MemdErrorKind::Dispatch { .. } => ErrorKind::Disconnected,
                    MemdErrorKind::Close { .. } => ErrorKind::Disconnected,
                    MemdErrorKind::ConnectionFailed { .. } => ErrorKind::Disconnected,
                    MemdErrorKind::Io => ErrorKind::Disconnected,
                    MemdErrorKind::Protocol { .. } => ErrorKind::ParsingFailure,
                    MemdErrorKind::Decompression => ErrorKind::ParsingFailure,
                    MemdErrorKind::InvalidArgument { .. } => ErrorKind::InvalidArgument,
                    _ => ErrorKind::Internal,
                }
            }
            CoreErrorKind::Mgmt(e) => match e.kind() {
                MgmtErrorKind::Server { kind, .. } => match kind {
                    MgmtServerErrorKind::AccessDenied => ErrorKind::PermissionDenied,
                    MgmtServerErrorKind::BucketNotFound => ErrorKind::BucketNotFound,
                    MgmtServerErrorKind::BucketExists => ErrorKind::BucketExists,
                    MgmtServerErrorKind::ScopeNotFound => ErrorKind::ScopeNotFound,
                    MgmtServerErrorKind::ScopeExists => ErrorKind::ScopeExists,
                    MgmtServerErrorKind::CollectionNotFound => ErrorKind::CollectionNotFound,
                    MgmtServerErrorKind::CollectionExists => ErrorKind::CollectionExists,
                    _ => ErrorKind::Internal,
                },
                MgmtErrorKind::Http(_) => ErrorKind::ServiceNotAvailable,
                _ => ErrorKind::Internal,
            },
            CoreErrorKind::Http(_) => ErrorKind::ServiceNotAvailable,
            CoreErrorKind::DocumentIrretrievable => ErrorKind::DocumentIrretrievable,
            CoreErrorKind::ServiceNotAvailable { .. } => ErrorKind::ServiceNotAvailable,
            CoreErrorKind::FeatureNotAvailable { .. } => ErrorKind::FeatureNotAvailable,
            CoreErrorKind::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            CoreErrorKind::JsonError { .. } => ErrorKind::ParsingFailure,
            CoreErrorKind::NoBucket => ErrorKind::BucketNotFound,
            CoreErrorKind::Shutdown => ErrorKind::RequestCanceled,
            _ => ErrorKind::Internal,
        };

        Self {
            kind,
            context,
            source: Some(Arc::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(_err: serde_json::Error) -> Self {
        Self::new(ErrorKind::EncodingFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::memd::error::ServerError;
    use shoal_core::memd::opcode::OpCode;
    use shoal_core::memd::status::Status;

    fn core_server_error(kind: ServerErrorKind, status: Status) -> shoal_core::error::Error {
        shoal_core::error::Error::new_memd_error(
            ServerError::new(kind, OpCode::Get, status, 1).into(),
            Some("10.0.0.1:11210".parse().unwrap()),
            None,
        )
    }

    #[test]
    fn classifies_application_errors() {
        let err: Error =
            core_server_error(ServerErrorKind::KeyNotFound, Status::KeyNotFound).into();
        assert_eq!(err.kind(), ErrorKind::DocumentNotFound);
        assert_eq!(
            err.context().dispatched_to.as_deref(),
            Some("10.0.0.1:11210")
        );

        let err: Error = core_server_error(ServerErrorKind::CasMismatch, Status::KeyExists).into();
        assert_eq!(err.kind(), ErrorKind::CasMismatch);

        let err: Error = core_server_error(
            ServerErrorKind::Auth {
                msg: "denied".to_string(),
            },
            Status::AuthError,
        )
        .into();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn classifies_durability_errors() {
        let err: Error = core_server_error(
            ServerErrorKind::SyncWriteAmbiguous,
            Status::SyncWriteAmbiguous,
        )
        .into();
        assert_eq!(err.kind(), ErrorKind::DurabilityAmbiguous);
    }
}
