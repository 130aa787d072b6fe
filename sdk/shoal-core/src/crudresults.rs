use std::time::Duration;

use crate::memd::subdoc::SubDocResult;
use crate::mutationtoken::MutationToken;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GetResult {
    pub value: Vec<u8>,
    pub flags: u32,
    pub datatype: u8,
    pub cas: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GetReplicaResult {
    pub value: Vec<u8>,
    pub flags: u32,
    pub datatype: u8,
    pub cas: u64,
    pub is_active: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GetMetaResult {
    pub flags: u32,
    pub cas: u64,
    pub expiry: u32,
    pub seq_no: u64,
    pub datatype: u8,
    pub deleted: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UpsertResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InsertResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReplaceResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RemoveResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TouchResult {
    pub cas: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GetAndTouchResult {
    pub value: Vec<u8>,
    pub flags: u32,
    pub datatype: u8,
    pub cas: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GetAndLockResult {
    pub value: Vec<u8>,
    pub flags: u32,
    pub datatype: u8,
    pub cas: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UnlockResult {}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AppendResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PrependResult {
    pub cas: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IncrementResult {
    pub cas: u64,
    pub value: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DecrementResult {
    pub cas: u64,
    pub value: u64,
    pub mutation_token: Option<MutationToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LookupInResult {
    pub cas: u64,
    pub ops: Vec<SubDocResult>,
    pub doc_is_deleted: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MutateInResult {
    pub cas: u64,
    pub ops: Vec<SubDocResult>,
    pub mutation_token: Option<MutationToken>,
}
