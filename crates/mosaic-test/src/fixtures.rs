//! Catalog fixtures.
//!
//! Routes use scope `remote_<id>` and module `./routes`. Entry URLs live on
//! an unroutable test host so nothing reaches the network by accident.

use serde_json::{Value, json};

use mosaic_core::Catalog;
use mosaic_telemetry::ClientContext;

/// Platform name used by the fixtures.
pub const TEST_PLATFORM: &str = "mfe-platform";

/// Scope of the fixture route `route_id`.
#[must_use]
pub fn scope_for(route_id: &str) -> String {
    format!("remote_{route_id}")
}

/// Stable entry URL of the fixture route `route_id`.
#[must_use]
pub fn stable_url(route_id: &str) -> String {
    format!("http://cdn.test/{route_id}/stable/assets/remoteEntry.js")
}

/// Canary entry URL of the fixture route `route_id`.
#[must_use]
pub fn canary_url(route_id: &str) -> String {
    format!("http://cdn.test/{route_id}/canary/assets/remoteEntry.js")
}

/// A route with the canary disabled.
#[must_use]
pub fn route_json(route_id: &str) -> Value {
    route_with_rollout(route_id, false, 0.0)
}

/// A route with the canary enabled at `percentage`.
///
/// At `100.0` every user is served the canary.
#[must_use]
pub fn canary_route_json(route_id: &str, percentage: f64) -> Value {
    route_with_rollout(route_id, true, percentage)
}

fn route_with_rollout(route_id: &str, canary_enabled: bool, percentage: f64) -> Value {
    let mut title = route_id.to_owned();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    json!({
        "id": route_id,
        "title": title,
        "path": format!("/{route_id}"),
        "requiredRoles": ["USER"],
        "remote": {
            "scope": scope_for(route_id),
            "module": "./routes",
            "stable": { "url": stable_url(route_id), "version": "1.0.0" },
            "canary": { "url": canary_url(route_id), "version": "1.1.0-canary" },
            "rollout": { "canaryEnabled": canary_enabled, "canaryPercentage": percentage }
        }
    })
}

/// A catalog payload holding `routes`.
#[must_use]
pub fn catalog_json(routes: Vec<Value>) -> Value {
    json!({ "platform": TEST_PLATFORM, "routes": routes })
}

/// Two stable-only routes: `accounts` and `payments`.
#[must_use]
pub fn sample_catalog_json() -> Value {
    catalog_json(vec![route_json("accounts"), route_json("payments")])
}

/// [`sample_catalog_json`] validated.
///
/// # Panics
///
/// Panics if the fixture no longer validates.
#[must_use]
pub fn sample_catalog() -> Catalog {
    mosaic_manifest::validate(&sample_catalog_json()).expect("sample catalog must validate")
}

/// A session for `user_id`.
#[must_use]
pub fn test_context(user_id: &str) -> ClientContext {
    ClientContext::new(user_id)
}
