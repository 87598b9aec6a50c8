//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mosaic_core::RemoteStatus;
use mosaic_events::{EventReceiver, MosaicEvent};
use mosaic_runtime::alternate_entry_url;
use mosaic_telemetry::{TelemetryEvent, TelemetryEventType};
use mosaic_test::{MockOutcome, ShellHarness, stable_url};

/// Every event currently queued on `rx`.
pub fn drain(rx: &mut EventReceiver) -> Vec<Arc<MosaicEvent>> {
    std::iter::from_fn(|| rx.try_recv()).collect()
}

/// Status snapshots published for `scope`, in order.
pub fn status_changes(events: &[Arc<MosaicEvent>], scope: &str) -> Vec<RemoteStatus> {
    events
        .iter()
        .filter_map(|event| match event.as_ref() {
            MosaicEvent::StatusChanged { scope: s, status, .. } if s == scope => {
                Some(status.clone())
            },
            _ => None,
        })
        .collect()
}

/// Telemetry event types recorded by the harness, in order.
pub fn telemetry_types(harness: &ShellHarness) -> Vec<TelemetryEventType> {
    harness
        .telemetry
        .events()
        .iter()
        .map(|event| event.event_type)
        .collect()
}

/// The last telemetry event of `event_type`.
pub fn last_telemetry(harness: &ShellHarness, event_type: TelemetryEventType) -> TelemetryEvent {
    harness
        .telemetry
        .events()
        .into_iter()
        .rev()
        .find(|event| event.event_type == event_type)
        .unwrap()
}

/// Make the stable entry of `route_id` missing at both conventional paths.
pub fn remove_stable_entry(harness: &ShellHarness, route_id: &str) {
    let url = stable_url(route_id);
    let alternate = alternate_entry_url(&url).unwrap();
    harness.loader.set_outcome(url, MockOutcome::NotFound);
    harness.loader.set_outcome(alternate, MockOutcome::NotFound);
}
