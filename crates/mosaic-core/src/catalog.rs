//! Catalog model.
//!
//! A catalog describes every navigable route of the shell and the remote that
//! backs it. These types serialize to the exact wire shape served by the
//! registry (camelCase field names), which is also the shape persisted by the
//! manifest cache.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role tags a route may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// Regular authenticated user.
    User,
}

impl Role {
    /// Every role value accepted in a catalog, in wire form.
    pub const ALLOWED: [&'static str; 2] = ["ADMIN", "USER"];

    /// Parse a wire value (`"ADMIN"` or `"USER"`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    /// The wire form of this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which build of a remote is targeted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// The generally available build.
    #[default]
    Stable,
    /// The progressively rolled-out build.
    Canary,
}

impl Variant {
    /// Lowercase name used in logs and telemetry metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Canary => "canary",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployable build of a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteTarget {
    /// Entry point URL of the build.
    pub url: String,
    /// Version label of the build.
    pub version: String,
}

/// Canary rollout settings for a remote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutConfig {
    /// Whether the canary build may be served at all.
    pub canary_enabled: bool,
    /// Share of users (0..=100) bucketed into the canary.
    pub canary_percentage: f64,
}

/// How a route's remote is located and rolled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteConfig {
    /// Logical remote name.
    pub scope: String,
    /// Entry point identifier within the remote.
    pub module: String,
    /// Stable build.
    pub stable: RemoteTarget,
    /// Canary build.
    pub canary: RemoteTarget,
    /// Rollout settings.
    pub rollout: RolloutConfig,
}

impl RemoteConfig {
    /// The build served for `variant`.
    #[must_use]
    pub fn target(&self, variant: Variant) -> &RemoteTarget {
        match variant {
            Variant::Stable => &self.stable,
            Variant::Canary => &self.canary,
        }
    }
}

/// A navigable feature of the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// Route identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Navigation path.
    pub path: String,
    /// Roles allowed to see the route.
    pub required_roles: Vec<Role>,
    /// The backing remote.
    pub remote: RemoteConfig,
}

/// A validated catalog of routes.
///
/// Fields are private: a catalog can only be built by the manifest validator
/// (through [`Catalog::from_validated`]) and is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    platform: String,
    routes: Vec<RouteDescriptor>,
}

impl Catalog {
    /// Assemble a catalog from parts that have already passed validation.
    ///
    /// Intended for the manifest validator only.
    #[doc(hidden)]
    #[must_use]
    pub fn from_validated(platform: String, routes: Vec<RouteDescriptor>) -> Self {
        Self { platform, routes }
    }

    /// Platform name.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Routes in catalog order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Look up a route by id.
    #[must_use]
    pub fn route(&self, id: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.id == id)
    }

    /// Serialize to the registry wire shape.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
