//! Integration tests for the store.

use snapkv::{Store, StoreConfig, StoreError};
use std::time::Duration;
use tempfile::tempdir;

/// Config with the background loop disabled, for tests that drive
/// sweeps and saves by hand.
fn manual() -> StoreConfig {
    StoreConfig::new().save_interval(Duration::ZERO).build()
}

#[test]
fn test_basic_workflow() {
    let store: Store<String> = Store::in_memory(manual());

    // Initially empty
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);

    // Set a value
    store.set("key1", "value1".to_string());
    assert_eq!(store.len(), 1);
    assert!(!store.is_empty());

    // Get the value back
    assert_eq!(store.get("key1"), Some("value1".to_string()));

    // Check contains
    assert!(store.contains("key1"));
    assert!(!store.contains("nonexistent"));

    // Delete
    assert!(store.delete("key1"));
    assert!(!store.contains("key1"));
    assert!(!store.delete("key1")); // Already deleted
}

#[test]
fn test_ttl_visibility() {
    let store: Store<String> = Store::in_memory(manual());

    store.set_with_ttl("expiring", "value".to_string(), Duration::from_millis(50));

    // Visible immediately after the set
    assert_eq!(store.get("expiring"), Some("value".to_string()));

    std::thread::sleep(Duration::from_millis(80));

    // Reads as absent once the TTL elapses
    assert_eq!(store.get("expiring"), None);
    assert!(!store.contains("expiring"));
}

#[test]
fn test_no_ttl_permanence() {
    let store: Store<i64> = Store::in_memory(manual());

    store.set("permanent", 7);
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(store.get("permanent"), Some(7));
    assert!(store.delete("permanent"));
    assert_eq!(store.get("permanent"), None);
}

#[test]
fn test_keys_scenario() {
    let store: Store<String> = Store::in_memory(manual());

    store.set("k1", "a".to_string());
    store.set_with_ttl("k2", "b".to_string(), Duration::from_millis(50));

    let mut keys = store.keys();
    keys.sort();
    assert_eq!(keys, vec!["k1", "k2"]);

    std::thread::sleep(Duration::from_millis(80));

    assert_eq!(store.keys(), vec!["k1"]);
}

#[test]
fn test_ttl_query_three_way() {
    let store: Store<i64> = Store::in_memory(manual());

    store.set("forever", 1);
    store.set_with_ttl("expiring", 2, Duration::from_secs(300));

    assert_eq!(store.ttl("absent"), None);
    assert_eq!(store.ttl("forever"), Some(None));

    let remaining = store.ttl("expiring").unwrap().unwrap();
    assert!(remaining > Duration::from_secs(290));
    assert!(remaining <= Duration::from_secs(300));
}

#[tokio::test]
async fn test_sweep_convergence_via_background_loop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    let config = StoreConfig::new()
        .save_interval(Duration::from_millis(20))
        .build();
    let store: Store<String> = Store::open(&path, config).await.unwrap();

    store.set("k1", "a".to_string());
    store.set_with_ttl("k2", "b".to_string(), Duration::from_millis(50));
    assert_eq!(store.len(), 2);

    // Give the TTL and at least one background interval time to elapse.
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(store.keys(), vec!["k1"]);
    assert_eq!(store.len(), 1, "sweep should physically remove k2");

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_persistence_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set("a", 1);
    store.set("b", 2);
    store.close().await.unwrap();

    let reopened: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.get("a"), Some(1));
    assert_eq!(reopened.get("b"), Some(2));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_background_loop_persists_without_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    {
        let config = StoreConfig::new()
            .save_interval(Duration::from_millis(20))
            .build();
        let store: Store<i64> = Store::open(&path, config).await.unwrap();
        store.set("ticked", 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Dropped without close: the periodic save already ran.
    }

    let reopened: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.get("ticked"), Some(1));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_atomicity_under_write_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    let tmp = dir.path().join("db.json.tmp");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set("a", 1);
    store.save().await.unwrap();
    let before = std::fs::read(&path).unwrap();

    // Make the temp-file write fail by squatting on its path.
    std::fs::create_dir(&tmp).unwrap();
    store.set("b", 2);
    assert!(matches!(store.save().await, Err(StoreError::Io(_))));

    // The canonical file is exactly as it was before the failed save.
    assert_eq!(std::fs::read(&path).unwrap(), before);

    // The data is not silently lost: once the obstruction clears, the
    // retained dirty state saves both keys.
    std::fs::remove_dir(&tmp).unwrap();
    store.save().await.unwrap();
    store.close().await.unwrap();

    let reopened: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.get("a"), Some(1));
    assert_eq!(reopened.get("b"), Some(2));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_close_surfaces_final_save_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    let tmp = dir.path().join("db.json.tmp");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set("a", 1);

    std::fs::create_dir(&tmp).unwrap();
    assert!(store.close().await.is_err());

    std::fs::remove_dir(&tmp).unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_memory_only_mode() {
    let store: Store<String> = Store::in_memory(StoreConfig::default());

    store.set("a", "1".to_string());
    store.set_with_ttl("b", "2".to_string(), Duration::from_secs(60));
    assert!(store.delete("a"));
    assert_eq!(store.get("a"), None);
    store.save().await.unwrap();

    store.close().await.unwrap();
    store.close().await.unwrap(); // Closing twice is safe
}

#[tokio::test]
async fn test_save_skips_clean_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set("a", 1);
    store.save().await.unwrap();
    store.save().await.unwrap(); // Clean: no I/O

    assert_eq!(store.stats().saves, 1);
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_expiry_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set_with_ttl("short", 1, Duration::from_millis(30));
    store.set_with_ttl("long", 2, Duration::from_secs(300));
    store.close().await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    // The snapshot stores absolute wall-clock deadlines, so the short
    // TTL has elapsed by the time the store reopens.
    let reopened: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.get("short"), None);
    assert_eq!(reopened.get("long"), Some(2));

    let remaining = reopened.ttl("long").unwrap().unwrap();
    assert!(remaining < Duration::from_secs(300));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, b"{ definitely not json").unwrap();

    let result = Store::<i64>::open(&path, manual()).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_empty_snapshot_opens_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, b"").unwrap();

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert!(store.is_empty());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_load_on_init_disabled_ignores_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    let store: Store<i64> = Store::open(&path, manual()).await.unwrap();
    store.set("a", 1);
    store.close().await.unwrap();

    let config = StoreConfig::new()
        .save_interval(Duration::ZERO)
        .load_on_init(false)
        .build();
    let fresh: Store<i64> = Store::open(&path, config).await.unwrap();
    assert!(fresh.is_empty());
    fresh.close().await.unwrap();
}

#[tokio::test]
async fn test_pretty_snapshot_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");

    let config = StoreConfig::new()
        .save_interval(Duration::ZERO)
        .pretty(true)
        .build();
    let store: Store<String> = Store::open(&path, config).await.unwrap();
    store.set("greeting", "hello".to_string());
    store.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains('\n'), "pretty output should be indented");

    // Formatting is presentation only; compact readers see the same data.
    let reopened: Store<String> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.get("greeting"), Some("hello".to_string()));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_structured_values_round_trip() {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        logins: u32,
    }

    let dir = tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    let store: Store<Session> = Store::open(&path, manual()).await.unwrap();
    store.set(
        "abc",
        Session {
            user: "alice".to_string(),
            logins: 3,
        },
    );
    store.close().await.unwrap();

    let reopened: Store<Session> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(
        reopened.get("abc"),
        Some(Session {
            user: "alice".to_string(),
            logins: 3,
        })
    );
    reopened.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_writes_with_background_loop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    let config = StoreConfig::new()
        .save_interval(Duration::from_millis(10))
        .build();
    let store: Store<i64> = Store::open(&path, config).await.unwrap();

    let mut handles = vec![];
    for t in 0..8 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..250 {
                let key = format!("thread_{}_key_{}", t, i);
                store.set(key.clone(), i);
                assert_eq!(store.get(&key), Some(i));
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(store.len(), 2000);
    store.close().await.unwrap();

    let reopened: Store<i64> = Store::open(&path, manual()).await.unwrap();
    assert_eq!(reopened.len(), 2000);
    reopened.close().await.unwrap();
}
