use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::transcoder::JsonTranscoder;
use shoal_core::mutationtoken::MutationToken;

#[derive(Debug, Clone)]
pub struct GetResult {
    pub(crate) content: Vec<u8>,
    pub(crate) flags: u32,
    pub(crate) cas: u64,
    pub(crate) expiry: Option<u32>,
}

impl GetResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn expiry(&self) -> Option<u32> {
        self.expiry
    }

    pub fn content_as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        JsonTranscoder::default().decode(&self.content, self.flags)
    }
}

#[derive(Debug, Clone)]
pub struct GetReplicaResult {
    pub(crate) content: Vec<u8>,
    pub(crate) flags: u32,
    pub(crate) cas: u64,
    pub(crate) is_replica: bool,
}

impl GetReplicaResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn is_replica(&self) -> bool {
        self.is_replica
    }

    pub fn content_as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        JsonTranscoder::default().decode(&self.content, self.flags)
    }
}

#[derive(Debug, Clone)]
pub struct ExistsResult {
    pub(crate) exists: bool,
    pub(crate) cas: u64,
}

impl ExistsResult {
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn cas(&self) -> u64 {
        self.cas
    }
}

#[derive(Debug, Clone)]
pub struct MutationResult {
    pub(crate) cas: u64,
    pub(crate) mutation_token: Option<MutationToken>,
}

impl MutationResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn mutation_token(&self) -> Option<&MutationToken> {
        self.mutation_token.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct CounterResult {
    pub(crate) cas: u64,
    pub(crate) content: u64,
    pub(crate) mutation_token: Option<MutationToken>,
}

impl CounterResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn content(&self) -> u64 {
        self.content
    }

    pub fn mutation_token(&self) -> Option<&MutationToken> {
        self.mutation_token.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct LookupInResult {
    pub(crate) cas: u64,
    pub(crate) entries: Vec<LookupInEntry>,
}

#[derive(Debug, Clone)]
pub struct LookupInEntry {
    pub(crate) value: Option<Vec<u8>>,
    pub(crate) exists: bool,
}

impl LookupInResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn exists(&self, index: usize) -> bool {
        self.entries.get(index).map(|e| e.exists).unwrap_or(false)
    }

    pub fn content_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let entry = self
            .entries
            .get(index)
            .and_then(|e| e.value.as_deref())
            .ok_or_else(|| crate::error::Error::new(crate::error::ErrorKind::PathNotFound))?;

        JsonTranscoder::default().decode(entry, 0)
    }
}

#[derive(Debug, Clone)]
pub struct MutateInResult {
    pub(crate) cas: u64,
    pub(crate) mutation_token: Option<MutationToken>,
}

impl MutateInResult {
    pub fn cas(&self) -> u64 {
        self.cas
    }

    pub fn mutation_token(&self) -> Option<&MutationToken> {
        self.mutation_token.as_ref()
    }
}
