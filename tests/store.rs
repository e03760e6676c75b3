//! Driver and in-memory store tests.

mod common;

use bytes::Bytes;
use datty::core::config::{CodecConfig, StoreConfig};
use datty::io::{MinorKeys, Operation, OperationResult, QueryKey, Record, UpdatePolicy, Version};
use datty::store::{execute_encoded, Driver, MemoryStore};
use datty::ErrCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

async fn roundtrip(store: &MemoryStore, op: &Operation, config: &CodecConfig) -> OperationResult {
    let request = op.to_bytes(config.numeric_keys).unwrap();
    let response = execute_encoded(store, request, config).await.unwrap();
    OperationResult::decode(response, config.limits(), config.read_mode()).unwrap()
}

#[tokio::test]
async fn encoded_put_fetch_cycle() {
    let store = MemoryStore::new();
    let config = CodecConfig::default();

    let put = Operation::put(common::user_key("u1"), common::record(&[("name", "John")]));
    assert_eq!(
        roundtrip(&store, &put, &config).await,
        OperationResult::Put {
            version: Some(Version::Long(1))
        }
    );

    let fetch = Operation::fetch(common::user_key("u1"), MinorKeys::All);
    assert_eq!(
        roundtrip(&store, &fetch, &config).await,
        OperationResult::Fetch {
            version: Some(Version::Long(1)),
            record: Some(common::record(&[("name", "John")])),
        }
    );
}

#[tokio::test]
async fn encoded_loop_with_named_keys_and_slices() {
    let store = MemoryStore::new();
    let config = CodecConfig {
        numeric_keys: false,
        copy_payloads: false,
        ..CodecConfig::default()
    };
    let put = Operation::put(common::user_key("u1"), common::record(&[("a", "1")]));
    roundtrip(&store, &put, &config).await;
    let head = roundtrip(&store, &Operation::head(common::user_key("u1")), &config).await;
    assert_eq!(
        head,
        OperationResult::Head {
            version: Some(Version::Long(1)),
            minor_keys: vec!["a".into()],
        }
    );
}

#[tokio::test]
async fn encoded_errors_become_error_results() {
    let store = MemoryStore::new();
    let config = CodecConfig::default();

    let response = execute_encoded(&store, Bytes::from_static(&[0xc1]), &config)
        .await
        .unwrap();
    let result = OperationResult::decode(response, config.limits(), config.read_mode()).unwrap();
    assert!(matches!(
        result,
        OperationResult::Error {
            code: ErrCode::BadPayload,
            ..
        }
    ));

    let blank = Operation::head(QueryKey::new("", "u1"));
    match roundtrip(&store, &blank, &config).await {
        OperationResult::Error { code, message } => {
            assert_eq!(code, ErrCode::BadArguments);
            assert!(message.contains("set name"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn optimistic_update_loop() {
    let store = MemoryStore::new();
    let key = common::user_key("counter");
    store
        .execute(Operation::put(key.clone(), common::record(&[("n", "0")])))
        .await
        .unwrap();

    for expected in 1..=3i64 {
        let head = store.execute(Operation::head(key.clone())).await.unwrap();
        let version = head.version().cloned();
        assert_eq!(version, Some(Version::Long(expected)));
        let value = expected.to_string();
        let result = store
            .execute(Operation::compare_and_set(
                key.clone(),
                version,
                common::record(&[("n", value.as_str())]),
            ))
            .await
            .unwrap();
        assert!(matches!(result, OperationResult::CompareAndSet { updated: true, .. }));
    }

    let stale = store
        .execute(Operation::compare_and_set(
            key.clone(),
            Some(Version::Long(1)),
            common::record(&[("n", "x")]),
        ))
        .await
        .unwrap();
    assert_eq!(
        stale,
        OperationResult::CompareAndSet {
            updated: false,
            version: Some(Version::Long(4)),
        }
    );
}

#[tokio::test]
async fn compare_and_set_create_only_once() {
    let store = MemoryStore::new();
    let key = common::user_key("u1");
    let create = Operation::compare_and_set(key.clone(), None, common::record(&[("a", "1")]));
    let first = store.execute(create.clone()).await.unwrap();
    let second = store.execute(create).await.unwrap();
    assert!(matches!(first, OperationResult::CompareAndSet { updated: true, .. }));
    assert!(matches!(second, OperationResult::CompareAndSet { updated: false, .. }));
}

#[tokio::test]
async fn batch_runs_in_order() {
    let store = MemoryStore::new();
    let key = common::user_key("u1");
    let results = store
        .execute_batch(vec![
            Operation::put(key.clone(), common::record(&[("a", "1"), ("b", "2")])),
            Operation::put(key.clone(), Record::new().without("a")),
            Operation::fetch(key.clone(), MinorKeys::Only(vec!["a".into(), "b".into()])),
            Operation::head(QueryKey::new("users", "")),
            Operation::remove(key.clone(), MinorKeys::All),
            Operation::head(key),
        ])
        .await;

    assert_eq!(results.len(), 6);
    assert_eq!(
        results[2],
        OperationResult::Fetch {
            version: Some(Version::Long(2)),
            record: Some(common::record(&[("b", "2")])),
        }
    );
    assert!(results[3].is_error());
    assert_eq!(results[4], OperationResult::Remove);
    assert_eq!(
        results[5],
        OperationResult::Head {
            version: None,
            minor_keys: vec![],
        }
    );
}

#[tokio::test]
async fn replace_policy_drops_unlisted_columns() {
    let store = MemoryStore::new();
    let key = common::user_key("u1");
    store
        .execute(Operation::put(key.clone(), common::record(&[("a", "1"), ("b", "2")])))
        .await
        .unwrap();
    store
        .execute(
            Operation::put(key.clone(), common::record(&[("c", "3")]))
                .with_update_policy(UpdatePolicy::Replace),
        )
        .await
        .unwrap();
    let fetched = store.execute(Operation::fetch(key, MinorKeys::All)).await.unwrap();
    assert_eq!(
        fetched,
        OperationResult::Fetch {
            version: Some(Version::Long(2)),
            record: Some(common::record(&[("c", "3")])),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn default_ttl_from_config() {
    let store = MemoryStore::from_config(&StoreConfig {
        default_ttl_seconds: 5,
    });
    let key = common::user_key("session");
    store
        .execute(Operation::put(key.clone(), common::record(&[("token", "t")])))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(3)).await;
    // An update without TTL keeps the original expiry.
    store
        .execute(Operation::put(key.clone(), common::record(&[("seen", "1")])))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;

    let head = store.execute(Operation::head(key.clone())).await.unwrap();
    assert_eq!(head.version(), None);

    // Expired records are recreated from version 1.
    let put = store
        .execute(Operation::put(key, common::record(&[("token", "u")])).with_ttl_seconds(0))
        .await
        .unwrap();
    assert_eq!(put.version(), Some(&Version::Long(1)));
}

#[tokio::test]
async fn shared_across_tasks() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let key = QueryKey::new("users", format!("u{}", i));
            store
                .execute(Operation::put(key, common::record(&[("a", "1")])))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.version(), Some(&Version::Long(1)));
    }
    assert_eq!(store.size("users"), 8);
}

#[tokio::test]
async fn driver_as_trait_object() {
    let driver: Arc<dyn Driver> = Arc::new(MemoryStore::new());
    assert_eq!(driver.name(), "memory");
    let config = CodecConfig::default();
    let request = Operation::head(common::user_key("none"))
        .to_bytes(true)
        .unwrap();
    let response = execute_encoded(driver.as_ref(), request, &config).await.unwrap();
    assert_eq!(response.as_ref(), &[0x81, 2, 2]);
}

#[tokio::test]
async fn versioned_put_over_the_wire() {
    let store = MemoryStore::new();
    let config = CodecConfig::default();
    let key = common::user_key("u1");

    let create = Operation::put(key.clone(), common::record(&[("a", "1")])).with_version(None);
    assert_eq!(roundtrip(&store, &create, &config).await.version(), Some(&Version::Long(1)));
    // Create-only: a second versionless write is a conflict.
    match roundtrip(&store, &create, &config).await {
        OperationResult::Error { code, .. } => assert_eq!(code, ErrCode::ConcurrentUpdate),
        other => panic!("unexpected {:?}", other),
    }

    let update = Operation::put(key.clone(), common::record(&[("a", "2")]))
        .with_version(Some(Version::Long(1)));
    assert_eq!(roundtrip(&store, &update, &config).await.version(), Some(&Version::Long(2)));
    // Replaying the same update is stale now.
    assert!(roundtrip(&store, &update, &config).await.is_error());

    let fetch = store.execute(Operation::fetch(key, MinorKeys::All)).await.unwrap();
    assert_eq!(
        fetch,
        OperationResult::Fetch {
            version: Some(Version::Long(2)),
            record: Some(common::record(&[("a", "2")])),
        }
    );
}

#[tokio::test]
async fn size_counts_live_records_per_set() {
    let store = MemoryStore::new();
    let config = CodecConfig {
        numeric_keys: false,
        ..CodecConfig::default()
    };
    for major_key in ["a", "b", "c"] {
        store
            .execute(Operation::put(common::user_key(major_key), common::record(&[("x", "1")])))
            .await
            .unwrap();
    }
    store
        .execute(Operation::put(QueryKey::new("other", "z"), common::record(&[("x", "1")])))
        .await
        .unwrap();
    store
        .execute(Operation::remove(common::user_key("b"), MinorKeys::All))
        .await
        .unwrap();

    assert_eq!(
        roundtrip(&store, &Operation::size("users"), &config).await,
        OperationResult::Size { count: 2 }
    );
    assert_eq!(
        roundtrip(&store, &Operation::size("empty"), &config).await,
        OperationResult::Size { count: 0 }
    );
    match roundtrip(&store, &Operation::size(""), &config).await {
        OperationResult::Error { code, .. } => assert_eq!(code, ErrCode::BadArguments),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn sequence_streams_results_in_order() {
    let store = Arc::new(MemoryStore::new());
    let (op_tx, op_rx) = mpsc::channel(2);
    let (result_tx, mut result_rx) = mpsc::channel(2);

    let runner = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.execute_sequence(op_rx, result_tx).await })
    };
    let producer = tokio::spawn(async move {
        for i in 0..5 {
            let op = Operation::put(common::user_key("counter"), common::record(&[("n", "x")]))
                .with_version((i > 0).then_some(Version::Long(i)));
            op_tx.send(op).await.unwrap();
        }
        op_tx.send(Operation::head(QueryKey::new("", "bad"))).await.unwrap();
        op_tx.send(Operation::size("users")).await.unwrap();
    });

    let mut results = Vec::new();
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }
    producer.await.unwrap();
    assert_eq!(runner.await.unwrap(), 7);

    let versions: Vec<_> = results[..5].iter().map(|r| r.version().cloned()).collect();
    assert_eq!(versions, (1..=5).map(|v| Some(Version::Long(v))).collect::<Vec<_>>());
    assert!(results[5].is_error());
    assert_eq!(results[6], OperationResult::Size { count: 1 });
}

#[tokio::test(start_paused = true)]
async fn largest_default_ttl_is_usable() {
    let config = StoreConfig {
        default_ttl_seconds: u64::from(u32::MAX),
    };
    let store = MemoryStore::from_config(&config);
    let key = common::user_key("long-lived");
    store
        .execute(Operation::put(key.clone(), common::record(&[("a", "1")])))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(86_400)).await;
    let head = store.execute(Operation::head(key)).await.unwrap();
    assert_eq!(head.version(), Some(&Version::Long(1)));
}
