//! End-to-end resolution through the shell: variant choice, retries,
//! entry-path fallback and canary-to-stable degradation.

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use mosaic_core::{LoadState, ResolutionError, Variant};
use mosaic_events::MosaicEvent;
use mosaic_runtime::{RuntimeError, alternate_entry_url};
use mosaic_telemetry::TelemetryEventType;
use mosaic_test::{
    MockOutcome, ShellHarness, canary_route_json, canary_url, catalog_json, route_json,
    sample_catalog_json, stable_url,
};

use common::{drain, last_telemetry, remove_stable_entry, status_changes, telemetry_types};

async fn loaded(payload: serde_json::Value) -> ShellHarness {
    let harness = ShellHarness::new(payload);
    harness.shell.load_catalog().await.unwrap();
    harness
}

#[tokio::test]
async fn test_stable_route_loads_first_time() {
    let h = loaded(sample_catalog_json()).await;
    let mut rx = h.shell.subscribe();

    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert_eq!(resolved.variant, Variant::Stable);
    assert_eq!(resolved.version, "1.0.0");
    assert!(!resolved.degraded);
    assert_eq!(resolved.attempts, 1);
    assert_eq!(resolved.module.entry_url, stable_url("accounts"));

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Loaded);
    assert_eq!(status.loaded_at, Some(resolved.module.fetched_at));
    assert!(status.error.is_none());

    let states: Vec<_> = status_changes(&drain(&mut rx), "remote_accounts")
        .iter()
        .map(|status| status.state)
        .collect();
    assert_eq!(states, vec![LoadState::Loading, LoadState::Loaded]);

    let success = last_telemetry(&h, TelemetryEventType::RemoteLoadSuccess);
    assert_eq!(success.remote_id, "remote_accounts");
    assert_eq!(success.route_id, "accounts");
    assert_eq!(success.metadata["variant"], json!("stable"));
    assert_eq!(success.metadata["version"], json!("1.0.0"));
    assert_eq!(success.metadata["attempts"], json!(1));
}

#[tokio::test]
async fn test_canary_failure_serves_stable_degraded() {
    let h = loaded(catalog_json(vec![canary_route_json("accounts", 100.0)])).await;
    h.loader
        .set_outcome(canary_url("accounts"), MockOutcome::transient());
    let mut rx = h.shell.subscribe();

    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert!(resolved.degraded);
    assert_eq!(resolved.variant, Variant::Stable);
    assert_eq!(resolved.version, "1.0.0");

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Loaded);
    assert_eq!(status.variant, Variant::Stable);
    assert!(status.degraded);
    assert!(
        status
            .error
            .as_deref()
            .unwrap()
            .starts_with("Canary failed, fallback to stable:")
    );
    assert!(h.shell.has_degraded_remote());

    // The canary is never retried.
    assert_eq!(h.loader.call_count(&canary_url("accounts")), 1);
    assert_eq!(h.loader.call_count(&stable_url("accounts")), 1);

    assert_eq!(
        telemetry_types(&h),
        vec![
            TelemetryEventType::RemoteLoadCanaryFailed,
            TelemetryEventType::RemoteLoadSuccess
        ]
    );
    let canary = last_telemetry(&h, TelemetryEventType::RemoteLoadCanaryFailed);
    assert_eq!(canary.metadata["canaryVersion"], json!("1.1.0-canary"));
    assert_eq!(canary.metadata["stableVersion"], json!("1.0.0"));
    let success = last_telemetry(&h, TelemetryEventType::RemoteLoadSuccess);
    assert_eq!(success.metadata["degraded"], json!(true));

    let events = drain(&mut rx);
    assert!(events.iter().any(|event| matches!(
        event.as_ref(),
        MosaicEvent::RemoteResolved { degraded: true, .. }
    )));
}

#[tokio::test]
async fn test_canary_served_when_healthy() {
    let h = loaded(catalog_json(vec![canary_route_json("accounts", 100.0)])).await;

    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert_eq!(resolved.variant, Variant::Canary);
    assert_eq!(resolved.version, "1.1.0-canary");
    assert!(!h.shell.has_degraded_remote());
    assert_eq!(h.loader.call_count(&stable_url("accounts")), 0);
}

#[tokio::test]
async fn test_canary_and_stable_failure_is_terminal() {
    let h = loaded(catalog_json(vec![canary_route_json("accounts", 100.0)])).await;
    h.loader
        .set_outcome(canary_url("accounts"), MockOutcome::transient());
    remove_stable_entry(&h, "accounts");
    let mut rx = h.shell.subscribe();

    let err = h.shell.resolve("accounts").await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Resolution(ResolutionError::CanaryFallbackExhausted { .. })
    ));

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Error);
    assert!(status.degraded);

    assert_eq!(
        telemetry_types(&h),
        vec![
            TelemetryEventType::RemoteLoadCanaryFailed,
            TelemetryEventType::RemoteLoadFailure
        ]
    );
    let failure = last_telemetry(&h, TelemetryEventType::RemoteLoadFailure);
    assert_eq!(failure.metadata["attemptedVariant"], json!("stable-fallback"));

    let failed = drain(&mut rx)
        .into_iter()
        .find_map(|event| match event.as_ref() {
            MosaicEvent::RemoteFailed { error, .. } => Some(error.kind.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(failed, "canary_fallback_exhausted");
}

#[tokio::test]
async fn test_missing_entry_is_not_retried() {
    let h = loaded(sample_catalog_json()).await;
    remove_stable_entry(&h, "accounts");

    let err = h.shell.resolve("accounts").await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Resolution(ResolutionError::NotFound { .. })
    ));

    // One attempt: the entry plus its alternate path.
    assert_eq!(h.loader.total_calls(), 2);

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Error);
    assert_eq!(status.retry_count, 0);

    let failure = last_telemetry(&h, TelemetryEventType::RemoteLoadFailure);
    assert_eq!(failure.metadata["attemptedVariant"], json!("stable"));
    assert_eq!(failure.metadata["attempts"], json!(1));
}

#[tokio::test]
async fn test_entry_path_fallback_resolves() {
    let h = loaded(sample_catalog_json()).await;
    let url = stable_url("accounts");
    h.loader.set_outcome(url.clone(), MockOutcome::NotFound);

    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert_eq!(
        resolved.module.entry_url,
        alternate_entry_url(&url).unwrap()
    );
    assert_eq!(resolved.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_exhaust_retries() {
    let h = loaded(sample_catalog_json()).await;
    h.loader
        .set_outcome(stable_url("accounts"), MockOutcome::transient());
    let mut rx = h.shell.subscribe();

    let started = Instant::now();
    let err = h.shell.resolve("accounts").await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Resolution(ResolutionError::Transient { .. })
    ));
    assert!(started.elapsed() >= Duration::from_millis(3_500));

    // Three retries after the first attempt.
    assert_eq!(h.loader.total_calls(), 4);

    let loading: Vec<_> = status_changes(&drain(&mut rx), "remote_accounts")
        .iter()
        .filter(|status| status.state == LoadState::Loading)
        .map(|status| status.retry_count)
        .collect();
    assert_eq!(loading, vec![0, 1, 2, 3]);

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Error);
    assert_eq!(status.retry_count, 3);
    assert_eq!(telemetry_types(&h), vec![TelemetryEventType::RemoteLoadFailure]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let h = loaded(sample_catalog_json()).await;
    h.loader.queue_outcomes(
        stable_url("accounts"),
        [MockOutcome::transient(), MockOutcome::transient()],
    );

    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert_eq!(resolved.attempts, 3);

    let status = h.shell.status("remote_accounts").unwrap();
    assert_eq!(status.state, LoadState::Loaded);
    assert_eq!(status.retry_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_attempt_times_out_and_retries() {
    let h = loaded(sample_catalog_json()).await;
    h.loader
        .queue_outcomes(stable_url("accounts"), [MockOutcome::Hang]);

    let started = Instant::now();
    let resolved = h.shell.resolve("accounts").await.unwrap();
    assert_eq!(resolved.attempts, 2);
    assert!(started.elapsed() >= Duration::from_secs(15));
}

#[tokio::test]
async fn test_resolve_all_isolates_failures() {
    let h = loaded(catalog_json(vec![route_json("accounts"), route_json("payments")])).await;
    remove_stable_entry(&h, "payments");

    let results = h.shell.resolve_all().await;
    let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["accounts", "payments"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());

    assert_eq!(
        h.shell.status("remote_accounts").unwrap().state,
        LoadState::Loaded
    );
    assert_eq!(
        h.shell.status("remote_payments").unwrap().state,
        LoadState::Error
    );
    assert!(h.shell.has_degraded_remote());
}
