// Ethernet Bundle - Interface Records
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Interface record data model.
//!
//! An [`InterfaceRecord`] is the persisted configuration of one Ethernet
//! interface. Record `id` N always addresses the interface named
//! `<prefix>{N-1}` (`eth0` for id 1). The `status` and `mac` fields are
//! overlaid from the live system on every read and are never written to disk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::merge::{merge_field, merge_optional, ChangeSet, Merge};

/// Event `type` tag for Ethernet interfaces.
pub const EVENT_TYPE: &str = "eth";

/// Key used by older revisions for the link state.
const LEGACY_STATUS_KEY: &str = "currentStatus";

/// Persisted configuration of one Ethernet interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceRecord {
    /// Stable 1-based identifier. Zero marks the factory template.
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: u32,

    /// Interface name (e.g. "eth0").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the link should be up.
    #[serde(default)]
    pub enable: bool,

    /// Obtain the address from a DHCP server instead of `ip`/`netmask`.
    #[serde(default)]
    pub enable_dhcp: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wan: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(default)]
    pub dns: Vec<String>,

    /// Live link state (derived).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,

    /// Hardware address (derived).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Transient restart request from the last update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,

    /// Keys this version does not know about, preserved across saves.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_unassigned(id: &u32) -> bool {
    *id == 0
}

impl InterfaceRecord {
    /// Whether this is the factory template rather than a real interface.
    pub fn is_template(&self) -> bool {
        self.id == 0
    }

    /// Addressing mode tag ("dhcp" or "static").
    pub fn mode(&self) -> &'static str {
        if self.enable_dhcp {
            "dhcp"
        } else {
            "static"
        }
    }

    /// Copy of the record with derived and transient fields removed.
    pub fn persisted(&self) -> Self {
        let mut record = self.clone();
        record.status = None;
        record.mac = None;
        record.restart = None;
        record.extra.remove(LEGACY_STATUS_KEY);
        record
    }

    /// Change-event payload: the record plus `type` and `mode` tags.
    pub fn to_event(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("restart");
            map.insert("type".to_string(), Value::from(EVENT_TYPE));
            map.insert("mode".to_string(), Value::from(self.mode()));
        }
        value
    }
}

/// Interface name for a record id (`eth0` for id 1).
pub fn interface_name(prefix: &str, id: u32) -> String {
    format!("{}{}", prefix, id.saturating_sub(1))
}

/// Record id for an interface name (1 for `eth0`).
pub fn id_from_interface(prefix: &str, name: &str) -> Option<u32> {
    let index = name.strip_prefix(prefix)?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    index.parse::<u32>().ok()?.checked_add(1)
}

/// Validated partial update for one interface (PUT body).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceUpdate {
    pub id: u32,
    pub enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dhcp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
}

impl InterfaceUpdate {
    pub fn new(id: u32, enable: bool) -> Self {
        Self {
            id,
            enable,
            ..Default::default()
        }
    }

    /// Whether the caller asked to be told about a disruptive change.
    pub fn wants_restart(&self) -> bool {
        self.restart.unwrap_or(false)
    }
}

impl Merge<InterfaceUpdate> for InterfaceRecord {
    fn merge(&mut self, patch: &InterfaceUpdate) -> Vec<&'static str> {
        let mut changes = ChangeSet::new();
        changes
            .track("enable", merge_field(&mut self.enable, Some(&patch.enable)))
            .track(
                "enableDhcp",
                merge_field(&mut self.enable_dhcp, patch.enable_dhcp.as_ref()),
            )
            .track("wan", merge_optional(&mut self.wan, patch.wan.as_ref()))
            .track("ip", merge_optional(&mut self.ip, patch.ip.as_ref()))
            .track(
                "netmask",
                merge_optional(&mut self.netmask, patch.netmask.as_ref()),
            )
            .track(
                "gateway",
                merge_optional(&mut self.gateway, patch.gateway.as_ref()),
            )
            .track("dns", merge_field(&mut self.dns, patch.dns.as_ref()))
            .track(
                "restart",
                merge_optional(&mut self.restart, patch.restart.as_ref()),
            );
        changes.into_fields()
    }
}

/// Address information reported by the DHCP client hook for one interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaseUpdate {
    pub ip: String,
    pub netmask: String,
    pub gateway: String,
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

impl Merge<LeaseUpdate> for InterfaceRecord {
    fn merge(&mut self, patch: &LeaseUpdate) -> Vec<&'static str> {
        let mut changes = ChangeSet::new();
        changes
            .track("ip", merge_optional(&mut self.ip, Some(&patch.ip)))
            .track(
                "netmask",
                merge_optional(&mut self.netmask, Some(&patch.netmask)),
            )
            .track(
                "gateway",
                merge_optional(&mut self.gateway, Some(&patch.gateway)),
            )
            .track("dns", merge_field(&mut self.dns, Some(&patch.dns)))
            .track(
                "subnet",
                merge_optional(&mut self.subnet, patch.subnet.as_ref()),
            );
        changes.into_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> InterfaceRecord {
        serde_json::from_value(json!({
            "id": 1,
            "name": "eth0",
            "enable": true,
            "enableDhcp": false,
            "ip": "192.168.31.127",
            "netmask": "255.255.255.0",
            "gateway": "192.168.31.254",
            "dns": ["8.8.8.8"],
            "vendorTag": {"slot": 2}
        }))
        .expect("record should deserialize")
    }

    #[test]
    fn test_interface_name_mapping() {
        assert_eq!(interface_name("eth", 1), "eth0");
        assert_eq!(interface_name("eth", 12), "eth11");
        assert_eq!(id_from_interface("eth", "eth0"), Some(1));
        assert_eq!(id_from_interface("eth", "eth11"), Some(12));
        assert_eq!(id_from_interface("eth", "wlan0"), None);
        assert_eq!(id_from_interface("eth", "eth"), None);
        assert_eq!(id_from_interface("eth", "eth0.100"), None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut update = InterfaceUpdate::new(1, false);
        update.ip = Some("192.168.31.40".into());
        update.dns = Some(vec!["1.1.1.1".into()]);

        let mut once = record();
        let changed = once.merge(&update);
        assert_eq!(changed, vec!["enable", "ip", "dns"]);

        let mut twice = once.clone();
        assert!(twice.merge(&update).is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_keeps_fields_not_in_update() {
        let mut merged = record();
        merged.merge(&InterfaceUpdate::new(1, true));
        assert_eq!(merged.netmask.as_deref(), Some("255.255.255.0"));
        assert_eq!(merged.gateway.as_deref(), Some("192.168.31.254"));
        assert_eq!(merged.dns, vec!["8.8.8.8".to_string()]);
        assert!(merged.extra.contains_key("vendorTag"));
    }

    #[test]
    fn test_lease_merge_sets_addressing() {
        let mut merged = record();
        let lease = LeaseUpdate {
            ip: "192.168.41.3".into(),
            netmask: "255.255.255.0".into(),
            gateway: "192.168.41.254".into(),
            dns: vec!["8.8.8.8".into()],
            subnet: None,
        };
        let changed = merged.merge(&lease);
        assert_eq!(changed, vec!["ip", "gateway"]);
        assert_eq!(merged.ip.as_deref(), Some("192.168.41.3"));
    }

    #[test]
    fn test_persisted_strips_derived_fields() {
        let mut live = record();
        live.status = Some(true);
        live.mac = Some("78:ac:c0:c1:a8:fe".into());
        live.restart = Some(true);
        live.extra.insert("currentStatus".into(), json!(1));

        let stored = live.persisted();
        assert!(stored.status.is_none());
        assert!(stored.mac.is_none());
        assert!(stored.restart.is_none());
        assert!(!stored.extra.contains_key("currentStatus"));
        assert!(stored.extra.contains_key("vendorTag"));
    }

    #[test]
    fn test_event_payload_tags() {
        let mut live = record();
        live.restart = Some(true);
        let event = live.to_event();
        assert_eq!(event["type"], "eth");
        assert_eq!(event["mode"], "static");
        assert_eq!(event["id"], 1);
        assert!(event.get("restart").is_none());
    }

    #[test]
    fn test_template_has_no_id() {
        let template: InterfaceRecord =
            serde_json::from_value(json!({"enable": true, "ip": "192.168.30.127"})).unwrap();
        assert!(template.is_template());
        let out = serde_json::to_value(&template).unwrap();
        assert!(out.get("id").is_none());
    }
}
