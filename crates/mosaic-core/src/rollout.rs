//! Deterministic canary bucketing.
//!
//! A user is placed in a fixed bucket `0..100` per route. The bucket never
//! depends on the rollout percentage, so raising the percentage only ever
//! moves users from stable to canary, never back.

use crate::catalog::{RemoteTarget, RolloutConfig, RouteDescriptor, Variant};

/// Hash `value` into a bucket in `0..100`.
///
/// Order-dependent string hash over UTF-16 code units: `h = h * 31 + unit`,
/// kept as a 32-bit unsigned value.
#[must_use]
pub fn bucket(value: &str) -> u32 {
    let hash = value.encode_utf16().fold(0_u32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(u32::from(unit))
    });
    hash.checked_rem(100).unwrap_or_default()
}

/// The bucket of `user_id` for `route_id`.
#[must_use]
pub fn user_bucket(user_id: &str, route_id: &str) -> u32 {
    bucket(&format!("{user_id}:{route_id}"))
}

/// Whether `user_id` falls inside a canary of `canary_percentage` percent.
///
/// The percentage is clamped to `0..=100`.
#[must_use]
pub fn in_canary_rollout(user_id: &str, route_id: &str, canary_percentage: f64) -> bool {
    let threshold = if canary_percentage.is_nan() {
        0.0
    } else {
        canary_percentage.clamp(0.0, 100.0)
    };
    f64::from(user_bucket(user_id, route_id)) < threshold
}

/// Decide which build `user_id` receives for `route_id`.
#[must_use]
pub fn variant(user_id: &str, route_id: &str, rollout: &RolloutConfig) -> Variant {
    if rollout.canary_enabled && in_canary_rollout(user_id, route_id, rollout.canary_percentage) {
        Variant::Canary
    } else {
        Variant::Stable
    }
}

/// The builds to try for a route: the preferred one and the stable fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets<'a> {
    /// Variant chosen for the user.
    pub variant: Variant,
    /// Build matching `variant`.
    pub preferred: &'a RemoteTarget,
    /// Always the stable build.
    pub fallback: &'a RemoteTarget,
}

/// Resolve the preferred and fallback builds of `route` for `user_id`.
#[must_use]
pub fn targets<'a>(route: &'a RouteDescriptor, user_id: &str) -> Targets<'a> {
    let variant = variant(user_id, &route.id, &route.remote.rollout);
    Targets {
        variant,
        preferred: route.remote.target(variant),
        fallback: &route.remote.stable,
    }
}
