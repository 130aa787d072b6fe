use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use log::debug;
use tokio::time::sleep;

use crate::errmap::ErrMapComponent;
use crate::error::{Error, ErrorKind, RetryInfo};
use crate::memd::error::ErrorKind::{Cancelled, Dispatch, Resource, Server};
use crate::memd::error::{CancellationErrorKind, ServerError, ServerErrorKind};
use crate::retrybesteffort::BestEffortRetryStrategy;
use crate::{error, httpx};

lazy_static! {
    pub(crate) static ref DEFAULT_RETRY_STRATEGY: Arc<dyn RetryStrategy> =
        Arc::new(BestEffortRetryStrategy::default());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RetryReason {
    KvNotMyVbucket,
    KvInvalidVbucketMap,
    KvTemporaryFailure,
    KvCollectionOutdated,
    KvErrorMapRetryIndicated,
    KvLocked,
    KvBusy,
    KvConfigOnly,
    KvSyncWriteInProgress,
    KvSyncWriteRecommitInProgress,
    ServiceNotAvailable,
    SocketClosedWhileInFlight,
    SocketNotAvailable,
    HttpSendRequestFailed,
    NotReady,
}

impl RetryReason {
    pub fn allows_non_idempotent_retry(&self) -> bool {
        // Disconnects with a request in flight are ambiguous; everything else
        // here happens before the server has made the write visible.
        !matches!(self, RetryReason::SocketClosedWhileInFlight)
    }

    // Reasons which indicate the route itself was stale: these retry without
    // consulting the strategy since the follow-up goes somewhere new.
    pub fn always_retry(&self) -> bool {
        matches!(
            self,
            RetryReason::KvInvalidVbucketMap
                | RetryReason::KvNotMyVbucket
                | RetryReason::KvCollectionOutdated
                | RetryReason::KvConfigOnly
        )
    }
}

impl Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryReason::KvNotMyVbucket => write!(f, "KV_NOT_MY_VBUCKET"),
            RetryReason::KvInvalidVbucketMap => write!(f, "KV_INVALID_VBUCKET_MAP"),
            RetryReason::KvTemporaryFailure => write!(f, "KV_TEMPORARY_FAILURE"),
            RetryReason::KvCollectionOutdated => write!(f, "KV_COLLECTION_OUTDATED"),
            RetryReason::KvErrorMapRetryIndicated => write!(f, "KV_ERROR_MAP_RETRY_INDICATED"),
            RetryReason::KvLocked => write!(f, "KV_LOCKED"),
            RetryReason::KvBusy => write!(f, "KV_BUSY"),
            RetryReason::KvConfigOnly => write!(f, "KV_CONFIG_ONLY"),
            RetryReason::KvSyncWriteInProgress => write!(f, "KV_SYNC_WRITE_IN_PROGRESS"),
            RetryReason::KvSyncWriteRecommitInProgress => {
                write!(f, "KV_SYNC_WRITE_RECOMMIT_IN_PROGRESS")
            }
            RetryReason::ServiceNotAvailable => write!(f, "SERVICE_NOT_AVAILABLE"),
            RetryReason::SocketClosedWhileInFlight => write!(f, "SOCKET_CLOSED_WHILE_IN_FLIGHT"),
            RetryReason::SocketNotAvailable => write!(f, "SOCKET_NOT_AVAILABLE"),
            RetryReason::HttpSendRequestFailed => write!(f, "HTTP_SEND_REQUEST_FAILED"),
            RetryReason::NotReady => write!(f, "NOT_READY"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryAction {
    pub duration: Duration,
}

impl RetryAction {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

pub trait RetryStrategy: Debug + Send + Sync {
    fn retry_after(&self, request: &RetryRequest, reason: &RetryReason) -> Option<RetryAction>;
}

#[derive(Clone, Debug)]
pub struct RetryRequest {
    pub(crate) operation: &'static str,
    pub is_idempotent: bool,
    pub retry_attempts: u32,
    pub retry_reasons: Vec<RetryReason>,
    pub(crate) unique_id: Option<String>,
}

impl RetryRequest {
    pub(crate) fn new(operation: &'static str, is_idempotent: bool) -> Self {
        Self {
            operation,
            is_idempotent,
            retry_attempts: 0,
            retry_reasons: vec![],
            unique_id: None,
        }
    }

    pub(crate) fn add_retry_attempt(&mut self, reason: RetryReason) {
        self.retry_attempts += 1;
        self.retry_reasons.push(reason);
    }

    pub fn is_idempotent(&self) -> bool {
        self.is_idempotent
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn retry_reasons(&self) -> &[RetryReason] {
        &self.retry_reasons
    }

    pub(crate) fn to_retry_info(&self) -> RetryInfo {
        RetryInfo {
            attempts: self.retry_attempts,
            reasons: self.retry_reasons.clone(),
        }
    }
}

impl Display for RetryRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ operation: {}, id: {}, is_idempotent: {}, retry_attempts: {}, retry_reasons: {} }}",
            self.operation,
            self.unique_id.as_deref().unwrap_or(""),
            self.is_idempotent,
            self.retry_attempts,
            self.retry_reasons
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

pub struct RetryManager {
    err_map_component: Arc<ErrMapComponent>,
}

impl RetryManager {
    pub(crate) fn new(err_map_component: Arc<ErrMapComponent>) -> Self {
        Self { err_map_component }
    }

    pub async fn maybe_retry(
        &self,
        strategy: Arc<dyn RetryStrategy>,
        request: &mut RetryRequest,
        reason: RetryReason,
    ) -> Option<Duration> {
        if reason.always_retry() {
            request.add_retry_attempt(reason);
            let backoff = controlled_backoff(request.retry_attempts);

            return Some(backoff);
        }

        let action = strategy.retry_after(request, &reason);

        if let Some(a) = action {
            request.add_retry_attempt(reason);

            return Some(a.duration);
        }

        None
    }

    pub(crate) fn error_to_retry_reason(
        &self,
        retry_info: &mut RetryRequest,
        err: &Error,
    ) -> Option<RetryReason> {
        match err.kind.as_ref() {
            ErrorKind::Memd { source, .. } => {
                retry_info.unique_id = source.has_opaque().map(|o| o.to_string());

                match source.kind() {
                    Server(e) => return self.server_error_to_retry_reason(e),
                    Resource(e) => return self.server_error_to_retry_reason(e.cause()),
                    Cancelled(e) => {
                        if e == &CancellationErrorKind::ClosedInFlight {
                            return Some(RetryReason::SocketClosedWhileInFlight);
                        }
                    }
                    Dispatch { .. } => return Some(RetryReason::SocketNotAvailable),
                    _ => {}
                }
            }
            ErrorKind::NoVbucketMap => {
                return Some(RetryReason::KvInvalidVbucketMap);
            }
            ErrorKind::NoServerAssigned { .. } => {
                return Some(RetryReason::KvInvalidVbucketMap);
            }
            ErrorKind::ServiceNotAvailable { .. } => {
                return Some(RetryReason::ServiceNotAvailable);
            }
            ErrorKind::EndpointNotKnown { .. } => {
                return Some(RetryReason::SocketNotAvailable);
            }
            ErrorKind::Http(e) => {
                if let httpx::error::ErrorKind::SendRequest { .. } = e.kind() {
                    return Some(RetryReason::HttpSendRequestFailed);
                }
            }
            ErrorKind::Mgmt(e) => {
                if let crate::mgmtx::error::ErrorKind::Http(error) = e.kind() {
                    if let httpx::error::ErrorKind::SendRequest { .. } = error.kind() {
                        return Some(RetryReason::HttpSendRequestFailed);
                    }
                }
            }
            _ => {}
        }

        None
    }

    fn server_error_to_retry_reason(&self, e: &ServerError) -> Option<RetryReason> {
        match e.kind() {
            ServerErrorKind::NotMyVbucket => Some(RetryReason::KvNotMyVbucket),
            ServerErrorKind::TmpFail => Some(RetryReason::KvTemporaryFailure),
            ServerErrorKind::Busy => Some(RetryReason::KvBusy),
            ServerErrorKind::ConfigOnly => Some(RetryReason::KvConfigOnly),
            ServerErrorKind::UnknownCollectionID => Some(RetryReason::KvCollectionOutdated),
            ServerErrorKind::UnknownCollectionName => Some(RetryReason::KvCollectionOutdated),
            ServerErrorKind::UnknownScopeName => Some(RetryReason::KvCollectionOutdated),
            ServerErrorKind::Locked => Some(RetryReason::KvLocked),
            ServerErrorKind::ConfigNotSet => Some(RetryReason::NotReady),
            ServerErrorKind::SyncWriteInProgress => Some(RetryReason::KvSyncWriteInProgress),
            ServerErrorKind::SyncWriteRecommitInProgress => {
                Some(RetryReason::KvSyncWriteRecommitInProgress)
            }
            ServerErrorKind::UnknownStatus { status } => {
                if self.err_map_component.should_retry(*status) {
                    Some(RetryReason::KvErrorMapRetryIndicated)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

pub(crate) async fn orchestrate_retries<Fut, Resp>(
    rs: Arc<RetryManager>,
    strategy: Arc<dyn RetryStrategy>,
    mut retry_info: RetryRequest,
    operation: impl Fn() -> Fut + Send + Sync,
) -> error::Result<Resp>
where
    Fut: Future<Output = error::Result<Resp>> + Send,
    Resp: Send,
{
    loop {
        let mut err = match operation().await {
            Ok(r) => {
                return Ok(r);
            }
            Err(e) => e,
        };

        if let Some(reason) = rs.error_to_retry_reason(&mut retry_info, &err) {
            if let Some(duration) = rs
                .maybe_retry(strategy.clone(), &mut retry_info, reason)
                .await
            {
                debug!(
                    "Retrying {} after {:?} due to {}",
                    &retry_info, duration, reason
                );
                sleep(duration).await;
                continue;
            }
        }

        if retry_info.retry_attempts > 0 {
            // Not retrying any further, record what was attempted.
            err.set_retry_info(retry_info.to_retry_info());
        }

        return Err(err);
    }
}

pub(crate) fn controlled_backoff(retry_attempts: u32) -> Duration {
    match retry_attempts {
        0 => Duration::from_millis(1),
        1 => Duration::from_millis(10),
        2 => Duration::from_millis(50),
        3 => Duration::from_millis(100),
        4 => Duration::from_millis(500),
        _ => Duration::from_millis(1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memd::error::ServerError;
    use crate::memd::opcode::OpCode;
    use crate::memd::status::Status;

    fn manager() -> RetryManager {
        RetryManager::new(Arc::new(ErrMapComponent::new()))
    }

    fn server_error(kind: ServerErrorKind, status: Status) -> Error {
        Error::new_memd_error(
            ServerError::new(kind, OpCode::Get, status, 1).into(),
            None,
            None,
        )
    }

    #[test]
    fn classifies_not_my_vbucket() {
        let rs = manager();
        let mut req = RetryRequest::new("get", true);

        let err = server_error(ServerErrorKind::NotMyVbucket, Status::NotMyVbucket);
        let reason = rs.error_to_retry_reason(&mut req, &err).unwrap();
        assert_eq!(reason, RetryReason::KvNotMyVbucket);
        assert!(reason.always_retry());
    }

    #[test]
    fn classifies_tmp_fail_as_backoff_retry() {
        let rs = manager();
        let mut req = RetryRequest::new("get", true);

        let err = server_error(ServerErrorKind::TmpFail, Status::TmpFail);
        let reason = rs.error_to_retry_reason(&mut req, &err).unwrap();
        assert_eq!(reason, RetryReason::KvTemporaryFailure);
        assert!(!reason.always_retry());
        assert!(reason.allows_non_idempotent_retry());
    }

    #[test]
    fn ambiguous_disconnect_never_retries_mutations() {
        let rs = manager();
        let mut req = RetryRequest::new("set", false);

        let err = Error::new_memd_error(
            crate::memd::error::Error::new_cancelled_error(CancellationErrorKind::ClosedInFlight),
            None,
            None,
        );
        let reason = rs.error_to_retry_reason(&mut req, &err).unwrap();
        assert_eq!(reason, RetryReason::SocketClosedWhileInFlight);
        assert!(!reason.allows_non_idempotent_retry());
    }

    #[test]
    fn application_errors_do_not_classify() {
        let rs = manager();
        let mut req = RetryRequest::new("get", true);

        let err = server_error(ServerErrorKind::KeyNotFound, Status::KeyNotFound);
        assert!(rs.error_to_retry_reason(&mut req, &err).is_none());
    }

    #[test]
    fn retry_reasons_record_in_order() {
        let mut req = RetryRequest::new("get", true);
        req.add_retry_attempt(RetryReason::KvNotMyVbucket);
        req.add_retry_attempt(RetryReason::KvTemporaryFailure);
        req.add_retry_attempt(RetryReason::KvTemporaryFailure);

        assert_eq!(req.retry_attempts(), 3);
        assert_eq!(
            req.retry_reasons(),
            &[
                RetryReason::KvNotMyVbucket,
                RetryReason::KvTemporaryFailure,
                RetryReason::KvTemporaryFailure,
            ]
        );
    }

    #[test]
    fn controlled_backoff_is_capped() {
        assert_eq!(controlled_backoff(0), Duration::from_millis(1));
        assert_eq!(controlled_backoff(4), Duration::from_millis(500));
        assert_eq!(controlled_backoff(100), Duration::from_millis(1000));
    }
}
