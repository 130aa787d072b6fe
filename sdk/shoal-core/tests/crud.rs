mod common;

use serial_test::serial;

use shoal_core::crudoptions::{
    GetOptions, GetReplicaOptions, RemoveOptions, UpsertOptions,
};
use shoal_core::error::ErrorKind;
use shoal_core::memd::error::ServerErrorKind;

use common::create_test_agent;

#[tokio::test]
#[serial]
async fn upsert_then_get_round_trips() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };

    let value = br#"{"kind":"crud"}"#;

    let upsert = agent
        .upsert(UpsertOptions {
            key: b"crud-doc-1",
            scope_name: "",
            collection_name: "",
            value,
            ..Default::default()
        })
        .await
        .expect("upsert failed");
    assert_ne!(upsert.cas, 0);

    let get = agent
        .get(GetOptions {
            key: b"crud-doc-1",
            scope_name: "",
            collection_name: "",
            retry_strategy: None,
        })
        .await
        .expect("get failed");

    assert_eq!(get.value, value);
    assert_eq!(get.cas, upsert.cas);

    agent
        .remove(RemoveOptions {
            key: b"crud-doc-1",
            scope_name: "",
            collection_name: "",
            ..Default::default()
        })
        .await
        .expect("remove failed");

    let err = agent
        .get(GetOptions {
            key: b"crud-doc-1",
            scope_name: "",
            collection_name: "",
            retry_strategy: None,
        })
        .await
        .expect_err("get after remove must fail");

    let memd_err = err.is_memd_error().expect("expected a kv error");
    assert!(memd_err.is_server_error_kind(ServerErrorKind::KeyNotFound));

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn get_any_replica_with_absent_key() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };

    let err = agent
        .get_any_replica(GetReplicaOptions {
            key: b"replica-absent-key",
            scope_name: "",
            collection_name: "",
            replica_index: 0,
            retry_strategy: None,
        })
        .await
        .expect_err("get any replica of an absent key must fail");

    assert!(matches!(
        err.kind.as_ref(),
        ErrorKind::DocumentIrretrievable
    ));

    agent.close().await;
}

#[tokio::test]
#[serial]
async fn get_all_replicas_returns_one_per_copy() {
    let agent = match create_test_agent().await {
        Some(agent) => agent,
        None => return,
    };

    agent
        .upsert(UpsertOptions {
            key: b"replica-doc-1",
            scope_name: "",
            collection_name: "",
            value: br#"{"kind":"replica"}"#,
            ..Default::default()
        })
        .await
        .expect("upsert failed");

    // Replica writes lag the active; poll briefly until every copy answers.
    let mut results = vec![];
    for _ in 0..50 {
        results = match agent
            .get_all_replicas(GetReplicaOptions {
                key: b"replica-doc-1",
                scope_name: "",
                collection_name: "",
                replica_index: 0,
                retry_strategy: None,
            })
            .await
        {
            Ok(results) => results,
            Err(_e) => vec![],
        };

        if !results.is_empty() {
            break;
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    assert!(!results.is_empty());
    assert_eq!(
        results.iter().filter(|r| r.is_active).count(),
        1,
        "exactly one result must come from the active copy"
    );

    agent.close().await;
}
