//! End-to-end dispatch through the manager with a recording transport

use super::test_utils::{param, recording_manager, RecordingTransport, NOW};
use datatag::identifier;
use datatag::platform::ManualClock;
use datatag::{AnalyticsEvent, KeyValueStore, MemoryStore};
use std::collections::BTreeMap;
use std::sync::Arc;

#[tokio::test]
async fn test_session_rotates_after_inactivity_and_client_id_survives() {
    let clock = Arc::new(ManualClock::new(NOW));
    let storage = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(storage.clone(), transport.clone(), clock.clone());

    manager.log_event(AnalyticsEvent::new("click", "button1", "/home"));
    manager.flush().await;

    clock.advance_minutes(31);
    let params = BTreeMap::from([("x".to_string(), "1".to_string())]);
    manager.log_event_parts("click", "button1", "click", "/home", Some(params));
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);

    let first_session = param(&sent[0], "u.fss");
    let second_session = param(&sent[1], "u.fss");
    assert_ne!(first_session, second_session);
    assert_eq!(identifier::decode(&first_session), Some(NOW as i64));
    assert_eq!(identifier::decode(&second_session), Some((NOW + 31 * 60_000) as i64));

    assert_eq!(param(&sent[0], "cid"), param(&sent[1], "cid"));
    assert_eq!(param(&sent[1], "cid").chars().count(), 15);
    assert_eq!(param(&sent[1], "p"), r#"{"x":"1","user_agent":"ua-test"}"#);
    assert_eq!(storage.get("sessionUUID").unwrap(), Some(second_session));
}

#[tokio::test]
async fn test_session_kept_at_exactly_timeout() {
    let clock = Arc::new(ManualClock::new(NOW));
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(Arc::new(MemoryStore::new()), transport.clone(), clock.clone());

    manager.log_screen_view("/a", None);
    manager.flush().await;
    clock.advance_minutes(30);
    manager.log_screen_view("/b", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(param(&sent[0], "u.fss"), param(&sent[1], "u.fss"));
}

#[tokio::test]
async fn test_corrupt_session_and_client_id_are_replaced() {
    let clock = Arc::new(ManualClock::new(NOW));
    let storage = Arc::new(MemoryStore::new());
    storage.set("sessionUUID", "not-a-session").unwrap();
    storage.set("clientId", "tooShort").unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(storage.clone(), transport.clone(), clock);

    manager.log_screen_view("/home", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_ne!(param(&sent[0], "u.fss"), "not-a-session");
    assert!(identifier::is_valid(&param(&sent[0], "u.fss")));
    assert_eq!(param(&sent[0], "cid").chars().count(), 15);
    assert_eq!(storage.get("clientId").unwrap(), Some(param(&sent[0], "cid")));
}

#[tokio::test]
async fn test_existing_client_id_is_reused() {
    let storage = Arc::new(MemoryStore::new());
    storage.set("clientId", "keepMe123456789").unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(storage, transport.clone(), Arc::new(ManualClock::new(NOW)));

    manager.log_screen_view("/home", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(param(&sent[0], "cid"), "keepMe123456789");
    assert_eq!(param(&sent[0], "u.f"), "keepMe123456789");
}

#[tokio::test]
async fn test_events_are_sent_in_call_order() {
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(
        Arc::new(MemoryStore::new()),
        transport.clone(),
        Arc::new(ManualClock::new(NOW)),
    );

    for path in ["/one", "/two", "/three", "/four"] {
        manager.log_screen_view(path, None);
    }
    manager.flush().await;

    let paths: Vec<String> = transport.sent().iter().map(|q| param(q, "ph")).collect();
    assert_eq!(paths, vec!["/one", "/two", "/three", "/four"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_session() {
    let storage = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let manager = Arc::new(recording_manager(
        storage,
        transport.clone(),
        Arc::new(ManualClock::new(NOW)),
    ));

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.log_event(AnalyticsEvent::new("click", format!("button{}", i), "/grid"));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 16);
    let session = param(&sent[0], "u.fss");
    let client = param(&sent[0], "cid");
    assert!(sent.iter().all(|q| param(q, "u.fss") == session));
    assert!(sent.iter().all(|q| param(q, "cid") == client));

    let mut locations: Vec<String> = sent.iter().map(|q| param(q, "l")).collect();
    locations.sort();
    locations.dedup();
    assert_eq!(locations.len(), 16);
}

#[tokio::test]
async fn test_failed_send_does_not_stop_later_events() {
    let transport = Arc::new(RecordingTransport::failing_on(vec![0]));
    let manager = recording_manager(
        Arc::new(MemoryStore::new()),
        transport.clone(),
        Arc::new(ManualClock::new(NOW)),
    );

    manager.log_screen_view("/lost", None);
    manager.log_screen_view("/kept", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(param(&sent[1], "ph"), "/kept");
}

#[tokio::test]
async fn test_experiment_survives_forced_rotation_until_timeout() {
    let clock = Arc::new(ManualClock::new(NOW));
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(Arc::new(MemoryStore::new()), transport.clone(), clock.clone());

    manager.set_experiment_id("exp-42");
    manager.log_screen_view("/a", None);
    clock.advance_minutes(10);
    manager.log_screen_view("/b", None);
    manager.flush().await;
    clock.advance_minutes(31);
    manager.log_screen_view("/c", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(param(&sent[0], "p"), r#"{"user_agent":"ua-test","ex_id":"exp-42"}"#);
    assert_eq!(param(&sent[1], "p"), r#"{"user_agent":"ua-test","ex_id":"exp-42"}"#);
    assert_eq!(param(&sent[0], "u.fss"), param(&sent[1], "u.fss"));
    assert_eq!(param(&sent[2], "p"), r#"{"user_agent":"ua-test"}"#);
    assert_eq!(manager.experiment_id(), None);
}

#[tokio::test]
async fn test_shutdown_drains_queued_events() {
    let transport = Arc::new(RecordingTransport::default());
    let manager = recording_manager(
        Arc::new(MemoryStore::new()),
        transport.clone(),
        Arc::new(ManualClock::new(NOW)),
    );

    for _ in 0..5 {
        manager.log_screen_view("/queued", None);
    }
    manager.shutdown().await;

    assert_eq!(transport.sent().len(), 5);
}

#[tokio::test]
async fn test_configured_timeout_controls_rotation() {
    let clock = Arc::new(ManualClock::new(NOW));
    let transport = Arc::new(RecordingTransport::default());
    let manager = datatag::DataTaggingManager::new(
        super::test_utils::test_config().with_session_timeout_minutes(5),
        Arc::new(MemoryStore::new()),
        transport.clone(),
        super::test_utils::test_platform(clock.clone()),
    )
    .unwrap();

    manager.log_screen_view("/a", None);
    manager.flush().await;
    clock.advance_minutes(5);
    manager.log_screen_view("/b", None);
    manager.flush().await;
    clock.advance_minutes(6);
    manager.log_screen_view("/c", None);
    manager.flush().await;

    let sent = transport.sent();
    assert_eq!(param(&sent[0], "u.fss"), param(&sent[1], "u.fss"));
    assert_ne!(param(&sent[1], "u.fss"), param(&sent[2], "u.fss"));
}
