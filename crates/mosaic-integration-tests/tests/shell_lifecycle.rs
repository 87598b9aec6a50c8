//! Shell session lifecycle and subscriptions.

use std::sync::{Arc, Mutex};

use mosaic_events::MosaicEvent;
use mosaic_test::{ShellHarness, sample_catalog_json};

#[tokio::test]
async fn test_handlers_see_catalog_and_resolution_events() {
    let h = ShellHarness::new(sample_catalog_json());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.shell.subscribe_fn("recorder", move |event: &MosaicEvent| {
        sink.lock().unwrap().push(event.event_type());
    });

    h.shell.load_catalog().await.unwrap();
    h.shell.resolve("accounts").await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "status_seeded",
            "catalog_loaded",
            "status_changed",
            "status_changed",
            "remote_resolved"
        ]
    );
}

#[tokio::test]
async fn test_events_carry_session_identity() {
    let h = ShellHarness::new(sample_catalog_json());
    let mut rx = h.shell.subscribe();
    h.shell.load_catalog().await.unwrap();

    let event = std::iter::from_fn(|| rx.try_recv())
        .find(|event| event.event_type() == "catalog_loaded")
        .unwrap();
    let metadata = event.metadata();
    assert_eq!(metadata.source, "shell");
    assert_eq!(
        metadata.session_id.as_deref(),
        Some(h.shell.context().session_id.as_str())
    );
    assert_eq!(metadata.user_id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_shutdown_stops_handlers() {
    let h = ShellHarness::new(sample_catalog_json());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.shell.subscribe_fn("recorder", move |event: &MosaicEvent| {
        sink.lock().unwrap().push(event.event_type());
    });

    h.shell.shutdown();
    h.shell.load_catalog().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["shell_stopped"]);
}

#[tokio::test]
async fn test_unsubscribed_handler_is_silent() {
    let h = ShellHarness::new(sample_catalog_json());
    let seen = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&seen);
    let id = h.shell.subscribe_fn("counter", move |_| {
        let mut count = sink.lock().unwrap();
        *count = count.saturating_add(1);
    });

    assert!(h.shell.unsubscribe(id));
    assert!(!h.shell.unsubscribe(id));
    h.shell.load_catalog().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), 0);
}
