// Ethernet Bundle - Validation Utilities
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Input validation for request bodies.
//!
//! Bodies arrive as loosely typed JSON. The functions here check every field
//! against the request schema, collect all problems into a
//! [`ValidationErrors`] set and only then build the typed update. Unknown
//! fields are dropped.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::addressing::{parse_ipv4, parse_netmask};
use super::record::{InterfaceUpdate, LeaseUpdate};

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All schema violations found in one request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-error set.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Absorb another set, prefixing its field names (used for bulk bodies).
    fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for err in other.errors {
            self.add(format!("{}.{}", prefix, err.field), err.message);
        }
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Field reader that records errors instead of failing on the first one.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> Fields<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            errors: ValidationErrors::new(),
        }
    }

    fn missing(&mut self, key: &str) {
        self.errors.add(key, "required field is missing");
    }

    /// Booleans also accept 0 and 1, as older clients send them.
    fn boolean(&mut self, key: &str, required: bool) -> Option<bool> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                if required {
                    self.missing(key);
                }
                None
            }
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) if n.as_u64() == Some(0) => Some(false),
            Some(Value::Number(n)) if n.as_u64() == Some(1) => Some(true),
            Some(_) => {
                self.errors.add(key, "expected a boolean");
                None
            }
        }
    }

    fn id(&mut self, key: &str) -> Option<u32> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.missing(key);
                None
            }
            Some(Value::Number(n)) => match n.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(id) if id >= 1 => Some(id),
                _ => {
                    self.errors.add(key, "expected an integer >= 1");
                    None
                }
            },
            Some(_) => {
                self.errors.add(key, "expected an integer >= 1");
                None
            }
        }
    }

    fn string(&mut self, key: &str, required: bool) -> Option<String> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                if required {
                    self.missing(key);
                }
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.errors.add(key, "expected a string");
                None
            }
        }
    }

    /// Dotted-quad field; the empty string means "not configured".
    fn address(&mut self, key: &str, required: bool, netmask: bool) -> Option<String> {
        let value = self.string(key, required)?;
        if value.is_empty() {
            return Some(value);
        }
        let parsed = if netmask {
            parse_netmask(&value).map(|_| ())
        } else {
            parse_ipv4(&value).map(|_| ())
        };
        if parsed.is_err() {
            self.errors.add(key, format!("invalid IPv4 address \"{}\"", value));
            return None;
        }
        Some(value)
    }

    fn string_list(&mut self, key: &str, required: bool) -> Option<Vec<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                if required {
                    self.missing(key);
                }
                None
            }
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        _ => {
                            self.errors.add(key, "expected an array of strings");
                            return None;
                        }
                    }
                }
                Some(out)
            }
            Some(_) => {
                self.errors.add(key, "expected an array of strings");
                None
            }
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    body.as_object()
        .ok_or_else(|| ValidationErrors::single("data", "expected an object"))
}

/// Validate a single-interface PUT body.
pub fn parse_update(body: &Value) -> Result<InterfaceUpdate, ValidationErrors> {
    let map = as_object(body)?;
    let mut fields = Fields::new(map);

    let id = fields.id("id");
    let enable = fields.boolean("enable", true);
    let update = InterfaceUpdate {
        id: id.unwrap_or_default(),
        enable: enable.unwrap_or_default(),
        enable_dhcp: fields.boolean("enableDhcp", false),
        wan: fields.boolean("wan", false),
        ip: fields.address("ip", false, false),
        netmask: fields.address("netmask", false, true),
        gateway: fields.address("gateway", false, false),
        dns: fields.string_list("dns", false),
        restart: fields.boolean("restart", false),
    };

    fields.errors.into_result(update)
}

/// Validate a bulk PUT body: a non-empty array of single-interface bodies.
pub fn parse_updates(body: &Value) -> Result<Vec<InterfaceUpdate>, ValidationErrors> {
    let items = body
        .as_array()
        .ok_or_else(|| ValidationErrors::single("data", "expected an array"))?;
    if items.is_empty() {
        return Err(ValidationErrors::single("data", "empty \"data\""));
    }

    let mut errors = ValidationErrors::new();
    let mut updates = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_update(item) {
            Ok(update) => updates.push(update),
            Err(e) => errors.extend_prefixed(&format!("data[{}]", index), e),
        }
    }

    errors.into_result(updates)
}

/// Validate a DHCP lease body pushed by the DHCP client hook.
pub fn parse_lease(body: &Value) -> Result<LeaseUpdate, ValidationErrors> {
    let map = as_object(body)?;
    let mut fields = Fields::new(map);

    let ip = fields.address("ip", true, false);
    let netmask = fields.address("netmask", true, true);
    let gateway = fields.address("gateway", true, false);
    let dns = fields.string_list("dns", true);
    let subnet = fields.address("subnet", false, false);

    if !fields.errors.is_empty() {
        return Err(fields.errors);
    }

    match (ip, netmask, gateway, dns) {
        (Some(ip), Some(netmask), Some(gateway), Some(dns)) => Ok(LeaseUpdate {
            ip,
            netmask,
            gateway,
            dns,
            subnet,
        }),
        _ => Err(ValidationErrors::single("data", "incomplete lease")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_update_minimal() {
        let update = parse_update(&json!({"id": 2, "enable": false})).unwrap();
        assert_eq!(update, InterfaceUpdate::new(2, false));
    }

    #[test]
    fn test_parse_update_accepts_numeric_booleans() {
        let update = parse_update(&json!({"id": 1, "enable": 1, "enableDhcp": 0})).unwrap();
        assert!(update.enable);
        assert_eq!(update.enable_dhcp, Some(false));
    }

    #[test]
    fn test_parse_update_drops_unknown_fields() {
        let update = parse_update(&json!({
            "id": 1,
            "enable": true,
            "enableDefaultGW": 1,
            "ip": "192.168.31.39"
        }))
        .unwrap();
        assert_eq!(update.ip.as_deref(), Some("192.168.31.39"));
    }

    #[test]
    fn test_parse_update_collects_all_errors() {
        let err = parse_update(&json!({
            "id": 0,
            "ip": "192.168.31",
            "netmask": "255.0.255.0",
            "dns": "8.8.8.8"
        }))
        .unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "enable", "ip", "netmask", "dns"]);
    }

    #[test]
    fn test_parse_update_rejects_non_object() {
        assert!(parse_update(&json!([])).is_err());
        assert!(parse_update(&Value::Null).is_err());
    }

    #[test]
    fn test_parse_updates_requires_items() {
        assert!(parse_updates(&json!({})).is_err());
        assert!(parse_updates(&json!([])).is_err());

        let err = parse_updates(&json!([{"id": 1, "enable": 1}, {"id": 0, "enable": 1}]))
            .unwrap_err();
        assert_eq!(err.errors[0].field, "data[1].id");
    }

    #[test]
    fn test_parse_lease() {
        let lease = parse_lease(&json!({
            "name": "eth0",
            "ip": "192.168.41.3",
            "netmask": "255.255.255.0",
            "gateway": "192.168.41.254",
            "dns": ["8.8.8.8"]
        }))
        .unwrap();
        assert_eq!(lease.ip, "192.168.41.3");
        assert!(lease.subnet.is_none());

        let err = parse_lease(&json!({"ip": "192.168.41.3"})).unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }

    #[test]
    fn test_display_joins_errors() {
        let mut errors = ValidationErrors::new();
        errors.add("id", "required field is missing");
        errors.add("enable", "expected a boolean");
        assert_eq!(
            errors.to_string(),
            "id: required field is missing; enable: expected a boolean"
        );
    }
}
