use serde::Serialize;

use crate::error::Result;

/// One path lookup inside a document.
#[derive(Debug, Clone)]
pub struct LookupInSpec {
    pub(crate) op: LookupInOpKind,
    pub(crate) path: String,
    pub(crate) xattr: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupInOpKind {
    Get,
    Exists,
    Count,
}

impl LookupInSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            op: LookupInOpKind::Get,
            path: path.into(),
            xattr: false,
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self {
            op: LookupInOpKind::Exists,
            path: path.into(),
            xattr: false,
        }
    }

    pub fn count(path: impl Into<String>) -> Self {
        Self {
            op: LookupInOpKind::Count,
            path: path.into(),
            xattr: false,
        }
    }

    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }
}

/// One path mutation inside a document.
#[derive(Debug, Clone)]
pub struct MutateInSpec {
    pub(crate) op: MutateInOpKind,
    pub(crate) path: String,
    pub(crate) value: Vec<u8>,
    pub(crate) create_path: bool,
    pub(crate) xattr: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MutateInOpKind {
    DictUpsert,
    DictInsert,
    Replace,
    Remove,
    ArrayAppend,
    ArrayPrepend,
    Counter,
}

impl MutateInSpec {
    fn new(op: MutateInOpKind, path: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            op,
            path: path.into(),
            value,
            create_path: false,
            xattr: false,
        }
    }

    pub fn upsert<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::DictUpsert,
            path,
            serde_json::to_vec(value)?,
        ))
    }

    pub fn insert<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::DictInsert,
            path,
            serde_json::to_vec(value)?,
        ))
    }

    pub fn replace<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::Replace,
            path,
            serde_json::to_vec(value)?,
        ))
    }

    pub fn remove(path: impl Into<String>) -> Result<Self> {
        Ok(Self::new(MutateInOpKind::Remove, path, vec![]))
    }

    pub fn array_append<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::ArrayAppend,
            path,
            serde_json::to_vec(value)?,
        ))
    }

    pub fn array_prepend<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::ArrayPrepend,
            path,
            serde_json::to_vec(value)?,
        ))
    }

    pub fn counter(path: impl Into<String>, delta: i64) -> Result<Self> {
        Ok(Self::new(
            MutateInOpKind::Counter,
            path,
            serde_json::to_vec(&delta)?,
        ))
    }

    pub fn create_path(mut self) -> Self {
        self.create_path = true;
        self
    }

    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }
}
