mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serial_test::serial;

use shoal_core::crudoptions::UpsertOptions;
use shoal_core::features::BucketFeature;
use shoal_core::memd::error::ServerErrorKind;
use shoal_core::memd::rangescan::{RangeScanItem, ScanType, SnapshotRequirements};
use shoal_core::mutationtoken::MutationToken;
use shoal_core::rangescancomponent::{
    RangeScanCancelOptions, RangeScanContinueOptions, RangeScanCreateOptions,
};

use common::{create_test_agent, feature_supported, vbucket_for_key};

fn scan_continue_opts(
    scan_uuid: [u8; 16],
    vbucket_id: u16,
    ids_only: bool,
) -> RangeScanContinueOptions {
    RangeScanContinueOptions {
        vbucket_id,
        scan_uuid,
        ids_only,
        batch_item_limit: 0,
        batch_byte_limit: 0,
        batch_time_limit_ms: 0,
    }
}

async fn populate_documents_for_range_scan(
    agent: &shoal_core::agent::Agent,
    ids: &[String],
    value: &[u8],
) -> HashMap<Vec<u8>, MutationToken> {
    let mut mutations = HashMap::new();
    for id in ids {
        let result = agent
            .upsert(UpsertOptions {
                key: id.as_bytes(),
                scope_name: "",
                collection_name: "",
                value,
                ..Default::default()
            })
            .await
            .expect("failed to upsert test document");

        let token = result
            .mutation_token
            .expect("mutation tokens must be enabled for scan tests");
        mutations.insert(id.as_bytes().to_vec(), token);
    }

    mutations
}

// Picks the scanned vbucket: the one holding the most test keys.
fn busiest_vbucket(ids: &[String]) -> u16 {
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for id in ids {
        *counts.entry(vbucket_for_key(id.as_bytes())).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(vb, _)| vb)
        .unwrap()
}

fn snapshot_for_vbucket(
    mutations: &HashMap<Vec<u8>, MutationToken>,
    vbucket_id: u16,
) -> SnapshotRequirements {
    let highest = mutations
        .values()
        .filter(|t| t.partition_id == vbucket_id)
        .max_by_key(|t| t.sequence_number)
        .expect("no mutations for scanned vbucket");

    SnapshotRequirements {
        partition_uuid: highest.partition_uuid,
        sequence_number: highest.sequence_number,
        timeout_ms: Some(10_000),
    }
}

async fn collect_scan(
    agent: &shoal_core::agent::Agent,
    scan_uuid: [u8; 16],
    vbucket_id: u16,
    ids_only: bool,
) -> Vec<RangeScanItem> {
    let items = Arc::new(Mutex::new(vec![]));

    loop {
        let items_sink = items.clone();
        let result = agent
            .range_scan_continue(
                scan_continue_opts(scan_uuid, vbucket_id, ids_only),
                &move |item| {
                    items_sink.lock().unwrap().push(item);
                },
            )
            .await
            .expect("scan continue failed");

        if result.complete {
            break;
        }
        assert!(result.more);
    }

    let guard = items.lock().unwrap();
    guard.clone()
}

#[tokio::test]
#[serial]
async fn range_scan_large_values() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };
    if !feature_supported(&agent, BucketFeature::RangeScan).await {
        return;
    }

    let mut value = vec![0u8; 16384];
    for (i, b) in value.iter_mut().enumerate() {
        *b = i as u8;
    }

    let ids: Vec<String> = [
        2960, 3064, 3686, 3716, 5354, 5426, 6175, 6607, 6797, 7871,
    ]
    .iter()
    .map(|i| format!("largevalues-{i}"))
    .collect();

    let mutations = populate_documents_for_range_scan(&agent, &ids, &value).await;

    let vbucket_id = busiest_vbucket(&ids);
    let snapshot = snapshot_for_vbucket(&mutations, vbucket_id);

    let create = agent
        .range_scan_create(RangeScanCreateOptions {
            vbucket_id,
            scope_name: "",
            collection_name: "",
            scan_type: ScanType::Range {
                from_key_inclusive: b"largevalues".to_vec(),
                to_key_exclusive: b"largevalues\xff".to_vec(),
            },
            ids_only: false,
            snapshot_requirements: Some(snapshot),
            retry_strategy: None,
        })
        .await
        .expect("scan create failed");

    let items = collect_scan(&agent, create.scan_uuid, vbucket_id, false).await;
    assert!(!items.is_empty());

    let expected: Vec<&Vec<u8>> = mutations
        .keys()
        .filter(|k| vbucket_for_key(k) == vbucket_id)
        .collect();

    for key in &expected {
        assert!(
            items.iter().any(|item| &&item.key == key),
            "expected scanned item for key {:?}",
            String::from_utf8_lossy(key)
        );
    }

    for item in &items {
        let Some(token) = mutations.get(&item.key) else {
            continue;
        };

        let body = item.body.as_ref().expect("expected a document body");
        assert_eq!(body.value, value);
        assert_eq!(body.seq_no, token.sequence_number);
    }

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn range_scan_ids_only() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };
    if !feature_supported(&agent, BucketFeature::RangeScan).await {
        return;
    }

    let value = b"{\"kind\":\"keysonly\"}".to_vec();
    let ids: Vec<String> = [1269, 2048, 4378, 7159, 8898, 8908, 19559, 20808, 20998, 25889]
        .iter()
        .map(|i| format!("rangekeysonly-{i}"))
        .collect();

    let mutations = populate_documents_for_range_scan(&agent, &ids, &value).await;

    let vbucket_id = busiest_vbucket(&ids);
    let snapshot = snapshot_for_vbucket(&mutations, vbucket_id);

    let create = agent
        .range_scan_create(RangeScanCreateOptions {
            vbucket_id,
            scope_name: "",
            collection_name: "",
            scan_type: ScanType::Prefix {
                prefix: b"rangekeysonly".to_vec(),
            },
            ids_only: true,
            snapshot_requirements: Some(snapshot),
            retry_strategy: None,
        })
        .await
        .expect("scan create failed");

    let items = collect_scan(&agent, create.scan_uuid, vbucket_id, true).await;
    assert!(!items.is_empty());

    for item in &items {
        assert!(!item.key.is_empty());
        assert!(item.body.is_none(), "ids-only scans must not carry bodies");
    }

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn range_scan_collection_retry() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };
    if !feature_supported(&agent, BucketFeature::RangeScan).await {
        return;
    }

    let config = common::test_config::TestConfig::load().unwrap();
    let collection_name = format!("scantest-{}", uuid_suffix());

    agent
        .create_collection(&shoal_core::mgmtx::options::CreateCollectionOptions {
            bucket_name: &config.bucket,
            scope_name: "_default",
            collection_name: &collection_name,
            max_expiry_secs: None,
            history: None,
        })
        .await
        .expect("failed to create collection");

    wait_for_collection(&agent, &config.bucket, &collection_name).await;

    let value = b"{\"kind\":\"collectionretry\"}".to_vec();
    let ids: Vec<String> = [
        9695, 24520, 90825, 119677, 150939, 170176, 199557, 225568, 231302, 245898,
    ]
    .iter()
    .map(|i| format!("rangecollectionretry-{i}"))
    .collect();

    // The agent's collection cache has never seen this collection, so the
    // first operation forces a resolver round trip.
    let mut mutations = HashMap::new();
    for id in &ids {
        let result = agent
            .upsert(UpsertOptions {
                key: id.as_bytes(),
                scope_name: "_default",
                collection_name: &collection_name,
                value: &value,
                ..Default::default()
            })
            .await
            .expect("failed to upsert into new collection");
        mutations.insert(
            id.as_bytes().to_vec(),
            result.mutation_token.expect("expected mutation token"),
        );
    }

    let vbucket_id = busiest_vbucket(&ids);
    let snapshot = snapshot_for_vbucket(&mutations, vbucket_id);

    let create = agent
        .range_scan_create(RangeScanCreateOptions {
            vbucket_id,
            scope_name: "_default",
            collection_name: &collection_name,
            scan_type: ScanType::Prefix {
                prefix: b"rangecollectionretry".to_vec(),
            },
            ids_only: false,
            snapshot_requirements: Some(snapshot),
            retry_strategy: None,
        })
        .await
        .expect("scan create failed");

    let items = collect_scan(&agent, create.scan_uuid, vbucket_id, false).await;
    assert!(!items.is_empty());

    for item in &items {
        let body = item.body.as_ref().expect("expected a document body");
        assert_eq!(body.value, value);
    }

    agent
        .delete_collection(&shoal_core::mgmtx::options::DeleteCollectionOptions {
            bucket_name: &config.bucket,
            scope_name: "_default",
            collection_name: &collection_name,
        })
        .await
        .expect("failed to drop collection");

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn range_scan_cancel_before_continue() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };
    if !feature_supported(&agent, BucketFeature::RangeScan).await {
        return;
    }

    let value = b"{\"kind\":\"cancel\"}".to_vec();
    let ids: Vec<String> = [2746, 37795, 63440, 116036, 136879, 156589]
        .iter()
        .map(|i| format!("rangescancancel-{i}"))
        .collect();

    let mutations = populate_documents_for_range_scan(&agent, &ids, &value).await;
    let vbucket_id = busiest_vbucket(&ids);
    let snapshot = snapshot_for_vbucket(&mutations, vbucket_id);

    let create = agent
        .range_scan_create(RangeScanCreateOptions {
            vbucket_id,
            scope_name: "",
            collection_name: "",
            scan_type: ScanType::Prefix {
                prefix: b"rangescancancel".to_vec(),
            },
            ids_only: false,
            snapshot_requirements: Some(snapshot),
            retry_strategy: None,
        })
        .await
        .expect("scan create failed");

    agent
        .range_scan_cancel(RangeScanCancelOptions {
            vbucket_id,
            scan_uuid: create.scan_uuid,
        })
        .await
        .expect("scan cancel failed");

    // A continue against a cancelled scan reports the scan as unknown and
    // delivers no items.
    let items = Arc::new(Mutex::new(Vec::<RangeScanItem>::new()));
    let items_sink = items.clone();
    let err = agent
        .range_scan_continue(
            scan_continue_opts(create.scan_uuid, vbucket_id, false),
            &move |item| {
                items_sink.lock().unwrap().push(item);
            },
        )
        .await
        .expect_err("continue after cancel must fail");

    let memd_err = err.is_memd_error().expect("expected a kv error");
    assert!(memd_err.is_server_error_kind(ServerErrorKind::KeyNotFound));
    assert!(items.lock().unwrap().is_empty());

    // Cancelling again is a no-op.
    agent
        .range_scan_cancel(RangeScanCancelOptions {
            vbucket_id,
            scan_uuid: create.scan_uuid,
        })
        .await
        .expect("repeated cancel must not error");

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn range_scan_cancel_mid_stream() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };
    if !feature_supported(&agent, BucketFeature::RangeScan).await {
        return;
    }

    let value = b"{\"kind\":\"cancelstream\"}".to_vec();
    let ids: Vec<String> = (0..24)
        .map(|i| format!("rangescanstream-{i:04}"))
        .collect();

    let mutations = populate_documents_for_range_scan(&agent, &ids, &value).await;
    let vbucket_id = busiest_vbucket(&ids);
    let snapshot = snapshot_for_vbucket(&mutations, vbucket_id);

    let create = agent
        .range_scan_create(RangeScanCreateOptions {
            vbucket_id,
            scope_name: "",
            collection_name: "",
            scan_type: ScanType::Prefix {
                prefix: b"rangescanstream".to_vec(),
            },
            ids_only: false,
            snapshot_requirements: Some(snapshot),
            retry_strategy: None,
        })
        .await
        .expect("scan create failed");

    // Take one bounded batch, then cancel while the scan is still open.
    let mut opts = scan_continue_opts(create.scan_uuid, vbucket_id, false);
    opts.batch_item_limit = 3;

    let items = Arc::new(Mutex::new(Vec::<RangeScanItem>::new()));
    let items_sink = items.clone();
    let result = agent
        .range_scan_continue(opts, &move |item| {
            items_sink.lock().unwrap().push(item);
        })
        .await
        .expect("first continue failed");

    let first_batch = items.lock().unwrap().len();
    if result.complete {
        // Everything fit in one batch; nothing left to race against.
        return;
    }
    assert_eq!(first_batch, 3, "batch item limit must bound the first batch");

    agent
        .range_scan_cancel(RangeScanCancelOptions {
            vbucket_id,
            scan_uuid: create.scan_uuid,
        })
        .await
        .expect("mid-stream cancel failed");

    let err = agent
        .range_scan_continue(
            scan_continue_opts(create.scan_uuid, vbucket_id, false),
            &|_item| {},
        )
        .await
        .expect_err("continue after mid-stream cancel must fail");

    let memd_err = err.is_memd_error().expect("expected a kv error");
    assert!(memd_err.is_server_error_kind(ServerErrorKind::KeyNotFound));

    agent.close().await;
}

async fn wait_for_collection(agent: &shoal_core::agent::Agent, bucket: &str, collection: &str) {
    for _ in 0..100 {
        let manifest = agent
            .get_collection_manifest(&shoal_core::mgmtx::options::GetCollectionManifestOptions {
                bucket_name: bucket,
            })
            .await
            .expect("failed to fetch manifest");

        let present = manifest.scopes.iter().any(|scope| {
            scope.name == "_default" && scope.collections.iter().any(|c| c.name == collection)
        });
        if present {
            return;
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    panic!("collection {collection} never appeared in the manifest");
}

fn uuid_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{nanos:x}")
}
