use std::sync::Arc;

use crate::memd::durability_level::DurabilityLevel;
use crate::memd::subdoc::{LookupInOp, MutateInOp, SubdocDocFlag};
use crate::retry::RetryStrategy;

#[derive(Clone, Default)]
pub struct GetOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct GetReplicaOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub replica_index: u32,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct GetMetaOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct UpsertOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub value: &'a [u8],
    pub flags: u32,
    pub datatype: u8,
    pub expiry: Option<u32>,
    pub preserve_expiry: Option<bool>,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct InsertOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub value: &'a [u8],
    pub flags: u32,
    pub datatype: u8,
    pub expiry: Option<u32>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct ReplaceOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub value: &'a [u8],
    pub flags: u32,
    pub datatype: u8,
    pub expiry: Option<u32>,
    pub preserve_expiry: Option<bool>,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct RemoveOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct TouchOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub expiry: u32,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct GetAndTouchOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub expiry: u32,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct GetAndLockOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub lock_time: u32,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct UnlockOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub cas: u64,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct AppendOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub value: &'a [u8],
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct PrependOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub value: &'a [u8],
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct IncrementOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub delta: Option<u64>,
    pub initial: Option<u64>,
    pub expiry: Option<u32>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone, Default)]
pub struct DecrementOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub delta: Option<u64>,
    pub initial: Option<u64>,
    pub expiry: Option<u32>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone)]
pub struct LookupInOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub flags: SubdocDocFlag,
    pub ops: &'a [LookupInOp<'a>],
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

#[derive(Clone)]
pub struct MutateInOptions<'a> {
    pub key: &'a [u8],
    pub scope_name: &'a str,
    pub collection_name: &'a str,
    pub flags: SubdocDocFlag,
    pub ops: &'a [MutateInOp<'a>],
    pub expiry: Option<u32>,
    pub preserve_expiry: Option<bool>,
    pub cas: Option<u64>,
    pub durability_level: Option<DurabilityLevel>,
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
}
