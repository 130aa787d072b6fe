use std::sync::Arc;
use std::time::Duration;

use shoal_core::memd::durability_level::DurabilityLevel;
use shoal_core::retry::RetryStrategy;

/// The expiry of a stored document: either relative from now in seconds, or
/// an absolute unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiry {
    None,
    RelativeSeconds(u32),
    AbsoluteEpoch(u32),
}

impl Expiry {
    // The wire field is overloaded: the server reads values under 30 days as
    // relative seconds and anything larger as an absolute timestamp.
    pub(crate) fn encode(&self) -> Option<u32> {
        match self {
            Expiry::None => None,
            Expiry::RelativeSeconds(secs) => Some(*secs),
            Expiry::AbsoluteEpoch(epoch) => Some(*epoch),
        }
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Expiry::None
    }
}

#[derive(Default, Clone)]
pub struct GetOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub with_expiry: bool,
    pub projections: Vec<String>,
}

#[derive(Default, Clone)]
pub struct GetReplicaOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub replica_index: Option<u32>,
}

#[derive(Default, Clone)]
pub struct ExistsOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Default, Clone)]
pub struct UpsertOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub expiry: Expiry,
    pub preserve_expiry: bool,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct InsertOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub expiry: Expiry,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct ReplaceOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub expiry: Expiry,
    pub preserve_expiry: bool,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct RemoveOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct TouchOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Default, Clone)]
pub struct GetAndTouchOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Default, Clone)]
pub struct GetAndLockOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Default, Clone)]
pub struct UnlockOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Default, Clone)]
pub struct LookupInOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub access_deleted: bool,
}

#[derive(Default, Clone)]
pub struct MutateInOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub expiry: Expiry,
    pub preserve_expiry: bool,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct CounterOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub delta: Option<u64>,
    pub initial: Option<u64>,
    pub expiry: Expiry,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct BinaryMutationOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
}

#[derive(Default, Clone)]
pub struct QueryOptions {
    pub timeout: Option<Duration>,
    pub client_context_id: Option<String>,
    pub args: Option<Vec<serde_json::Value>>,
    pub readonly: Option<bool>,
    pub scan_consistency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_encoding() {
        assert_eq!(Expiry::None.encode(), None);
        assert_eq!(Expiry::RelativeSeconds(60).encode(), Some(60));
        assert_eq!(
            Expiry::AbsoluteEpoch(1_700_000_000).encode(),
            Some(1_700_000_000)
        );
    }
}
