//! Strict validation of untrusted catalog payloads.
//!
//! A single pass turns raw JSON into a [`Catalog`]. Fields are checked in
//! document order and the first violation is returned.

use serde_json::{Map, Value};

use mosaic_core::{Catalog, RemoteConfig, RemoteTarget, Role, RolloutConfig, RouteDescriptor};

use crate::error::ValidationError;

type Object = Map<String, Value>;
type Result<T> = std::result::Result<T, ValidationError>;

/// Validate a raw registry payload.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the first offending field.
pub fn validate(raw: &Value) -> Result<Catalog> {
    let root = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("payload", "must be an object"))?;

    let platform = read_string(root, "platform", "platform")?;
    let routes = root
        .get("routes")
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new("routes", "must be an array"))?;

    let routes = routes
        .iter()
        .enumerate()
        .map(|(index, route)| read_route(route, &format!("routes[{index}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Catalog::from_validated(platform, routes))
}

/// Parse and validate a JSON document.
///
/// # Errors
///
/// Returns a [`ValidationError`] at path `payload` if the text is not JSON.
pub fn validate_str(text: &str) -> Result<Catalog> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| ValidationError::new("payload", format!("must be valid JSON ({e})")))?;
    validate(&raw)
}

fn read_route(value: &Value, path: &str) -> Result<RouteDescriptor> {
    let route = as_object(value, path)?;

    let id = read_string(route, "id", &format!("{path}.id"))?;
    let title = read_string(route, "title", &format!("{path}.title"))?;
    let route_path = read_string(route, "path", &format!("{path}.path"))?;
    let required_roles = read_roles(route.get("requiredRoles"), &format!("{path}.requiredRoles"))?;
    let remote = read_remote(route.get("remote"), &format!("{path}.remote"))?;

    Ok(RouteDescriptor {
        id,
        title,
        path: route_path,
        required_roles,
        remote,
    })
}

fn read_remote(value: Option<&Value>, path: &str) -> Result<RemoteConfig> {
    let remote = as_object(value.unwrap_or(&Value::Null), path)?;

    Ok(RemoteConfig {
        scope: read_string(remote, "scope", &format!("{path}.scope"))?,
        module: read_string(remote, "module", &format!("{path}.module"))?,
        stable: read_target(remote.get("stable"), &format!("{path}.stable"))?,
        canary: read_target(remote.get("canary"), &format!("{path}.canary"))?,
        rollout: read_rollout(remote.get("rollout"), &format!("{path}.rollout"))?,
    })
}

fn read_target(value: Option<&Value>, path: &str) -> Result<RemoteTarget> {
    let target = as_object(value.unwrap_or(&Value::Null), path)?;

    Ok(RemoteTarget {
        url: read_string(target, "url", &format!("{path}.url"))?,
        version: read_string(target, "version", &format!("{path}.version"))?,
    })
}

fn read_rollout(value: Option<&Value>, path: &str) -> Result<RolloutConfig> {
    let rollout = as_object(value.unwrap_or(&Value::Null), path)?;

    let enabled_path = format!("{path}.canaryEnabled");
    let canary_enabled = rollout
        .get("canaryEnabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| ValidationError::new(enabled_path, "must be a boolean"))?;

    let percentage_path = format!("{path}.canaryPercentage");
    let canary_percentage = rollout
        .get("canaryPercentage")
        .and_then(Value::as_f64)
        .ok_or_else(|| ValidationError::new(percentage_path.clone(), "must be a number"))?;
    if !(0.0..=100.0).contains(&canary_percentage) {
        return Err(ValidationError::new(
            percentage_path,
            "must be between 0 and 100",
        ));
    }

    Ok(RolloutConfig {
        canary_enabled,
        canary_percentage,
    })
}

fn read_roles(value: Option<&Value>, path: &str) -> Result<Vec<Role>> {
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new(path, "must be an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let item_path = format!("{path}[{index}]");
            let raw = item
                .as_str()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ValidationError::new(item_path.clone(), "must be a non-empty string"))?;
            Role::from_wire(raw).ok_or_else(|| {
                ValidationError::new(
                    item_path,
                    format!("must be one of {}", Role::ALLOWED.join(", ")),
                )
            })
        })
        .collect()
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Object> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(path, "must be an object"))
}

fn read_string(object: &Object, key: &str, path: &str) -> Result<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ValidationError::new(path, "must be a non-empty string"))
}
