//! The Shoal Rust SDK.
//!
//! A cluster handle is created from a connection string and credentials, and
//! hands out bucket, scope and collection handles:
//!
//! ```no_run
//! use shoal::cluster::{Cluster, ClusterOptions};
//! use shoal::options::{GetOptions, UpsertOptions};
//!
//! # async fn run() -> shoal::error::Result<()> {
//! let cluster = Cluster::connect(
//!     "shoal://10.0.0.1",
//!     ClusterOptions::new("Administrator", "password"),
//! )
//! .await?;
//!
//! let bucket = cluster.bucket("default").await?;
//! let collection = bucket.default_collection();
//!
//! collection
//!     .upsert("dock-1", &serde_json::json!({"berths": 12}), UpsertOptions::default())
//!     .await?;
//! let doc = collection.get("dock-1", GetOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod cluster;
pub mod collection;
pub mod error;
pub mod options;
pub mod query_result;
pub mod results;
pub mod scope;
pub mod subdoc;
pub mod transcoder;

pub use shoal_core::memd::durability_level::DurabilityLevel;
pub use shoal_core::mutationtoken::MutationToken;
