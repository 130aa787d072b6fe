use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::bucket::BucketInner;
use crate::error::{Error, ErrorKind, Result};
use crate::options::{
    BinaryMutationOptions, CounterOptions, ExistsOptions, GetAndLockOptions, GetAndTouchOptions,
    GetOptions, GetReplicaOptions, InsertOptions, LookupInOptions, MutateInOptions, RemoveOptions,
    ReplaceOptions, TouchOptions, UnlockOptions, UpsertOptions,
};
use crate::results::{
    CounterResult, ExistsResult, GetReplicaResult, GetResult, LookupInEntry, LookupInResult,
    MutateInResult, MutationResult,
};
use crate::subdoc::{LookupInOpKind, LookupInSpec, MutateInOpKind, MutateInSpec};
use crate::transcoder::JsonTranscoder;
use shoal_core::crudoptions;
use shoal_core::memd::subdoc::{
    LookupInOp, LookupInOpType, MutateInOp, MutateInOpType, SubdocDocFlag, SubdocOpFlag,
};

const MAX_PROJECTIONS: usize = 16;
const EXPIRY_MACRO_PATH: &str = "$document.exptime";

/// A named collection of documents; all key-value traffic goes through here.
#[derive(Clone)]
pub struct Collection {
    bucket: Arc<BucketInner>,
    scope_name: String,
    name: String,
}

impl Collection {
    pub(crate) fn new(bucket: Arc<BucketInner>, scope_name: String, name: String) -> Self {
        Self {
            bucket,
            scope_name,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    fn kv_timeout(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.bucket.cluster.kv_timeout)
    }

    // Timeouts on reads are unambiguous; a timed out mutation may or may not
    // have been applied by the server.
    async fn run<T>(
        &self,
        timeout: Duration,
        ambiguous_on_timeout: bool,
        fut: impl Future<Output = shoal_core::error::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result.map_err(Error::from),
            Err(_elapsed) => Err(Error::new_timeout(ambiguous_on_timeout)),
        }
    }

    pub async fn get(&self, id: impl AsRef<str>, opts: GetOptions) -> Result<GetResult> {
        if opts.with_expiry || !opts.projections.is_empty() {
            return self.get_with_lookup(id, opts).await;
        }

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                false,
                agent.get(crudoptions::GetOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(GetResult {
            content: resp.value,
            flags: resp.flags,
            cas: resp.cas,
            expiry: None,
        })
    }

    // Expiry and projections ride on a subdoc lookup rather than a plain get.
    async fn get_with_lookup(&self, id: impl AsRef<str>, opts: GetOptions) -> Result<GetResult> {
        if opts.projections.len() > MAX_PROJECTIONS {
            return Err(Error::invalid_argument(
                "at most 16 projections are supported",
            ));
        }

        let mut paths: Vec<String> = vec![];
        let mut ops: Vec<LookupInOp> = vec![];

        if opts.with_expiry {
            paths.push(EXPIRY_MACRO_PATH.to_string());
        }
        for projection in &opts.projections {
            paths.push(projection.clone());
        }

        let mut idx = 0;
        if opts.with_expiry {
            ops.push(LookupInOp {
                op: LookupInOpType::Get,
                flags: SubdocOpFlag::XATTR_PATH,
                path: paths[idx].as_bytes(),
            });
            idx += 1;
        }

        if opts.projections.is_empty() {
            ops.push(LookupInOp {
                op: LookupInOpType::GetDoc,
                flags: SubdocOpFlag::empty(),
                path: b"",
            });
        } else {
            for path in &paths[idx..] {
                ops.push(LookupInOp {
                    op: LookupInOpType::Get,
                    flags: SubdocOpFlag::empty(),
                    path: path.as_bytes(),
                });
            }
        }

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                false,
                agent.lookup_in(crudoptions::LookupInOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    flags: SubdocDocFlag::empty(),
                    ops: &ops,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        let mut results = resp.ops.into_iter();

        let expiry = if opts.with_expiry {
            let op = results
                .next()
                .ok_or_else(|| Error::new(ErrorKind::ParsingFailure))?;
            op.value
                .as_deref()
                .and_then(|v| serde_json::from_slice::<i64>(v).ok())
                .map(|v| v as u32)
        } else {
            None
        };

        let content = if opts.projections.is_empty() {
            results
                .next()
                .and_then(|op| op.value)
                .ok_or_else(|| Error::new(ErrorKind::ParsingFailure))?
        } else {
            let mut reassembled = serde_json::Map::new();
            for (projection, op) in opts.projections.iter().zip(results) {
                let value = match op.value.as_deref() {
                    Some(value) => match serde_json::from_slice(value) {
                        Ok(value) => value,
                        Err(_e) => continue,
                    },
                    None => continue,
                };

                insert_projection(&mut reassembled, projection, value);
            }

            serde_json::to_vec(&serde_json::Value::Object(reassembled))
                .map_err(|_e| Error::new(ErrorKind::EncodingFailure))?
        };

        Ok(GetResult {
            content,
            // A reassembled projection result is always JSON.
            flags: 2 << 24,
            cas: resp.cas,
            expiry,
        })
    }

    pub async fn get_any_replica(
        &self,
        id: impl AsRef<str>,
        opts: GetReplicaOptions,
    ) -> Result<GetReplicaResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                false,
                agent.get_any_replica(crudoptions::GetReplicaOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    replica_index: opts.replica_index.unwrap_or_default(),
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(GetReplicaResult {
            content: resp.value,
            flags: resp.flags,
            cas: resp.cas,
            is_replica: !resp.is_active,
        })
    }

    pub async fn get_all_replicas(
        &self,
        id: impl AsRef<str>,
        opts: GetReplicaOptions,
    ) -> Result<Vec<GetReplicaResult>> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resps = self
            .run(
                timeout,
                false,
                agent.get_all_replicas(crudoptions::GetReplicaOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    replica_index: 0,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(resps
            .into_iter()
            .map(|resp| GetReplicaResult {
                content: resp.value,
                flags: resp.flags,
                cas: resp.cas,
                is_replica: !resp.is_active,
            })
            .collect())
    }

    pub async fn exists(&self, id: impl AsRef<str>, opts: ExistsOptions) -> Result<ExistsResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let result = self
            .run(
                timeout,
                false,
                agent.get_meta(crudoptions::GetMetaOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await;

        match result {
            Ok(resp) => Ok(ExistsResult {
                exists: !resp.deleted,
                cas: resp.cas,
            }),
            Err(e) => {
                if e.is_kind(ErrorKind::DocumentNotFound) {
                    return Ok(ExistsResult {
                        exists: false,
                        cas: 0,
                    });
                }
                Err(e)
            }
        }
    }

    pub async fn upsert<T: Serialize>(
        &self,
        id: impl AsRef<str>,
        value: &T,
        opts: UpsertOptions,
    ) -> Result<MutationResult> {
        let (bytes, flags) = JsonTranscoder::default().encode(value)?;
        self.upsert_raw(id, &bytes, flags, opts).await
    }

    pub async fn upsert_raw(
        &self,
        id: impl AsRef<str>,
        value: &[u8],
        flags: u32,
        opts: UpsertOptions,
    ) -> Result<MutationResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.upsert(crudoptions::UpsertOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    value,
                    flags,
                    datatype: 0,
                    expiry: opts.expiry.encode(),
                    preserve_expiry: opts.preserve_expiry.then_some(true),
                    cas: None,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn insert<T: Serialize>(
        &self,
        id: impl AsRef<str>,
        value: &T,
        opts: InsertOptions,
    ) -> Result<MutationResult> {
        let (bytes, flags) = JsonTranscoder::default().encode(value)?;

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.insert(crudoptions::InsertOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    value: &bytes,
                    flags,
                    datatype: 0,
                    expiry: opts.expiry.encode(),
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn replace<T: Serialize>(
        &self,
        id: impl AsRef<str>,
        value: &T,
        opts: ReplaceOptions,
    ) -> Result<MutationResult> {
        let (bytes, flags) = JsonTranscoder::default().encode(value)?;

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.replace(crudoptions::ReplaceOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    value: &bytes,
                    flags,
                    datatype: 0,
                    expiry: opts.expiry.encode(),
                    preserve_expiry: opts.preserve_expiry.then_some(true),
                    cas: opts.cas,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn remove(&self, id: impl AsRef<str>, opts: RemoveOptions) -> Result<MutationResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.remove(crudoptions::RemoveOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    cas: opts.cas,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn touch(
        &self,
        id: impl AsRef<str>,
        expiry: Duration,
        opts: TouchOptions,
    ) -> Result<MutationResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.touch(crudoptions::TouchOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    expiry: expiry.as_secs() as u32,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: None,
        })
    }

    pub async fn get_and_touch(
        &self,
        id: impl AsRef<str>,
        expiry: Duration,
        opts: GetAndTouchOptions,
    ) -> Result<GetResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.get_and_touch(crudoptions::GetAndTouchOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    expiry: expiry.as_secs() as u32,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(GetResult {
            content: resp.value,
            flags: resp.flags,
            cas: resp.cas,
            expiry: None,
        })
    }

    pub async fn get_and_lock(
        &self,
        id: impl AsRef<str>,
        lock_time: Duration,
        opts: GetAndLockOptions,
    ) -> Result<GetResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                false,
                agent.get_and_lock(crudoptions::GetAndLockOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    lock_time: lock_time.as_secs() as u32,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(GetResult {
            content: resp.value,
            flags: resp.flags,
            cas: resp.cas,
            expiry: None,
        })
    }

    pub async fn unlock(
        &self,
        id: impl AsRef<str>,
        cas: u64,
        opts: UnlockOptions,
    ) -> Result<()> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        self.run(
            timeout,
            false,
            agent.unlock(crudoptions::UnlockOptions {
                key: id.as_ref().as_bytes(),
                scope_name: &self.scope_name,
                collection_name: &self.name,
                cas,
                retry_strategy: opts.retry_strategy.clone(),
            }),
        )
        .await?;

        Ok(())
    }

    pub async fn increment(
        &self,
        id: impl AsRef<str>,
        opts: CounterOptions,
    ) -> Result<CounterResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.increment(crudoptions::IncrementOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    delta: opts.delta,
                    initial: opts.initial,
                    expiry: opts.expiry.encode(),
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(CounterResult {
            cas: resp.cas,
            content: resp.value,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn decrement(
        &self,
        id: impl AsRef<str>,
        opts: CounterOptions,
    ) -> Result<CounterResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.decrement(crudoptions::DecrementOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    delta: opts.delta,
                    initial: opts.initial,
                    expiry: opts.expiry.encode(),
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(CounterResult {
            cas: resp.cas,
            content: resp.value,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn append(
        &self,
        id: impl AsRef<str>,
        value: &[u8],
        opts: BinaryMutationOptions,
    ) -> Result<MutationResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.append(crudoptions::AppendOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    value,
                    cas: opts.cas,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn prepend(
        &self,
        id: impl AsRef<str>,
        value: &[u8],
        opts: BinaryMutationOptions,
    ) -> Result<MutationResult> {
        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.prepend(crudoptions::PrependOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    value,
                    cas: opts.cas,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutationResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }

    pub async fn lookup_in(
        &self,
        id: impl AsRef<str>,
        specs: &[LookupInSpec],
        opts: LookupInOptions,
    ) -> Result<LookupInResult> {
        let ops: Vec<LookupInOp> = specs
            .iter()
            .map(|spec| LookupInOp {
                op: match spec.op {
                    LookupInOpKind::Get => LookupInOpType::Get,
                    LookupInOpKind::Exists => LookupInOpType::Exists,
                    LookupInOpKind::Count => LookupInOpType::GetCount,
                },
                flags: if spec.xattr {
                    SubdocOpFlag::XATTR_PATH
                } else {
                    SubdocOpFlag::empty()
                },
                path: spec.path.as_bytes(),
            })
            .collect();

        let doc_flags = if opts.access_deleted {
            SubdocDocFlag::ACCESS_DELETED
        } else {
            SubdocDocFlag::empty()
        };

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                false,
                agent.lookup_in(crudoptions::LookupInOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    flags: doc_flags,
                    ops: &ops,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(LookupInResult {
            cas: resp.cas,
            entries: resp
                .ops
                .into_iter()
                .map(|op| LookupInEntry {
                    exists: op.err.is_none(),
                    value: op.value,
                })
                .collect(),
        })
    }

    pub async fn mutate_in(
        &self,
        id: impl AsRef<str>,
        specs: &[MutateInSpec],
        opts: MutateInOptions,
    ) -> Result<MutateInResult> {
        let ops: Vec<MutateInOp> = specs
            .iter()
            .map(|spec| {
                let mut flags = SubdocOpFlag::empty();
                if spec.create_path {
                    flags |= SubdocOpFlag::MKDIR_P;
                }
                if spec.xattr {
                    flags |= SubdocOpFlag::XATTR_PATH;
                }

                MutateInOp {
                    op: match spec.op {
                        MutateInOpKind::DictUpsert => MutateInOpType::DictSet,
                        MutateInOpKind::DictInsert => MutateInOpType::DictAdd,
                        MutateInOpKind::Replace => MutateInOpType::Replace,
                        MutateInOpKind::Remove => MutateInOpType::Delete,
                        MutateInOpKind::ArrayAppend => MutateInOpType::ArrayPushLast,
                        MutateInOpKind::ArrayPrepend => MutateInOpType::ArrayPushFirst,
                        MutateInOpKind::Counter => MutateInOpType::Counter,
                    },
                    flags,
                    path: spec.path.as_bytes(),
                    value: &spec.value,
                }
            })
            .collect();

        let timeout = self.kv_timeout(opts.timeout);
        let agent = &self.bucket.agent;

        let resp = self
            .run(
                timeout,
                true,
                agent.mutate_in(crudoptions::MutateInOptions {
                    key: id.as_ref().as_bytes(),
                    scope_name: &self.scope_name,
                    collection_name: &self.name,
                    flags: SubdocDocFlag::empty(),
                    ops: &ops,
                    expiry: opts.expiry.encode(),
                    preserve_expiry: opts.preserve_expiry.then_some(true),
                    cas: opts.cas,
                    durability_level: opts.durability_level,
                    retry_strategy: opts.retry_strategy.clone(),
                }),
            )
            .await?;

        Ok(MutateInResult {
            cas: resp.cas,
            mutation_token: resp.mutation_token,
        })
    }
}

// Inserts a dotted-path projection back into the reassembled document.
fn insert_projection(
    target: &mut serde_json::Map<String, serde_json::Value>,
    path: &str,
    value: serde_json::Value,
) {
    let mut parts = path.split('.').peekable();
    let mut current = target;

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }

        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));

        current = match entry.as_object_mut() {
            Some(obj) => obj,
            None => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projections_reassemble_nested_paths() {
        let mut target = serde_json::Map::new();
        insert_projection(&mut target, "name", serde_json::json!("ship"));
        insert_projection(&mut target, "specs.length", serde_json::json!(12));
        insert_projection(&mut target, "specs.beam", serde_json::json!(4));

        let value = serde_json::Value::Object(target);
        assert_eq!(value["name"], "ship");
        assert_eq!(value["specs"]["length"], 12);
        assert_eq!(value["specs"]["beam"], 4);
    }
}
