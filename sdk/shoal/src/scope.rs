use std::sync::Arc;

use crate::bucket::BucketInner;
use crate::collection::Collection;

/// A named scope within a bucket; purely a path component for collections.
#[derive(Clone)]
pub struct Scope {
    pub(crate) bucket: Arc<BucketInner>,
    pub(crate) name: String,
}

impl Scope {
    pub(crate) fn new(bucket: Arc<BucketInner>, name: String) -> Self {
        Self { bucket, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(self.bucket.clone(), self.name.clone(), name.into())
    }
}
