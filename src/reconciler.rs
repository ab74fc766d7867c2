// Ethernet Bundle - Interface Record Reconciler
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Merge, apply and persist interface configuration.
//!
//! The reconciler exclusively owns the record store. Every update follows
//! the same sequence: merge the partial update into a copy of the stored
//! record, derive subnet/broadcast, apply the result to the host, and only
//! then replace the stored record, save it and publish a change event. A
//! failed apply leaves both the in-memory and the on-disk store untouched.

use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn};

use crate::bus::Notifier;
use crate::models::addressing::{compute_network, parse_ipv4, with_third_octet};
use crate::models::record::{id_from_interface, interface_name};
use crate::models::{
    AppConfig, Error, InterfaceRecord, InterfaceUpdate, LeaseUpdate, Merge, Result,
    INTERFACES_RESOURCE,
};
use crate::network_utils::{filter_interfaces, Addressing, NetworkAdapter};
use crate::storage::RecordStore;

/// Netmask used for seeding when the factory template has none.
const SEED_NETMASK: &str = "255.255.255.0";

/// Last octet of seeded gateways.
const SEED_GATEWAY_HOST: u8 = 254;

/// A merged record that has not been applied yet.
#[derive(Debug, Clone)]
struct PendingUpdate {
    record: InterfaceRecord,
    changed: Vec<&'static str>,
    /// Response snapshot taken before any side effect.
    response: InterfaceRecord,
    /// The update changes the address the caller is connected through.
    restart_required: bool,
}

/// Result of a single-interface update.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub record: InterfaceRecord,
    pub restart_required: bool,
}

/// Per-element result of a bulk update.
#[derive(Debug)]
pub struct BulkItem {
    pub id: u32,
    pub result: Result<PutOutcome>,
}

/// Owner of the interface records.
pub struct Reconciler<A, N> {
    adapter: A,
    notifier: N,
    store: RecordStore,
    prefix: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl<A, N> Reconciler<A, N>
where
    A: NetworkAdapter,
    N: Notifier,
{
    pub fn new(adapter: A, notifier: N, store: RecordStore, prefix: impl Into<String>) -> Self {
        Self {
            adapter,
            notifier,
            store,
            prefix: prefix.into(),
        }
    }

    /// Discover interfaces, load the store, seed it on first run and
    /// optionally apply every record.
    pub fn bootstrap(config: &AppConfig, adapter: A, notifier: N) -> Result<Self> {
        let ifaces = filter_interfaces(adapter.list_interfaces()?, &config.interface_prefix);
        if ifaces.is_empty() {
            info!("No interfaces to be configured.");
            return Err(Error::NoInterfaces);
        }
        info!("Found interfaces: {}", ifaces.join(", "));

        let store = RecordStore::load_or_fail(&config.data_dir, &config.store_name)?;
        let mut reconciler = Self::new(adapter, notifier, store, &config.interface_prefix);

        if reconciler.store.needs_seeding() {
            reconciler.seed(&ifaces)?;
        }
        if config.apply_on_start {
            reconciler.apply_all();
        }
        Ok(reconciler)
    }

    /// Interface name addressed by a record id.
    pub fn interface_name(&self, id: u32) -> String {
        interface_name(&self.prefix, id)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Replace the factory template with one record per interface.
    ///
    /// Interface `ethN` gets id N+1 and the template's address with the
    /// third octet advanced by the id.
    pub fn seed(&mut self, ifaces: &[String]) -> Result<()> {
        let template = self
            .store
            .records()
            .first()
            .cloned()
            .ok_or_else(|| Error::ConfigParseFailed("no factory template".to_string()))?;
        info!(
            "Factory install: seeding {} interface(s) (template from {:?})",
            ifaces.len(),
            self.store.factory_file()
        );

        let base = parse_ipv4(template.ip.as_deref().unwrap_or_default())?;
        let netmask = non_empty(&template.netmask)
            .unwrap_or(SEED_NETMASK)
            .to_string();

        let mut records = Vec::with_capacity(ifaces.len());
        for iface in ifaces {
            let Some(id) = id_from_interface(&self.prefix, iface) else {
                warn!("Skipping interface with unexpected name {}", iface);
                continue;
            };
            let octet = u8::try_from(u32::from(base.octets()[2]) + id)
                .map_err(|_| Error::InvalidAddress(format!("{} + {}", base, id)))?;

            let ip = with_third_octet(base, octet);
            let net = compute_network(&ip.to_string(), &netmask)?;
            let [a, b, _, _] = base.octets();

            let mut record = template.clone();
            record.id = id;
            record.name = Some(iface.clone());
            record.ip = Some(ip.to_string());
            record.netmask = Some(netmask.clone());
            record.subnet = Some(net.subnet.to_string());
            record.broadcast = Some(net.broadcast.to_string());
            record.gateway = Some(Ipv4Addr::new(a, b, octet, SEED_GATEWAY_HOST).to_string());
            records.push(record);
        }

        self.store.replace_all(records);
        self.store.save_and_backup()
    }

    /// Apply every stored record; failures are logged and skipped.
    pub fn apply_all(&self) {
        for record in self.store.records() {
            if let Err(e) = self.apply_to_system(record) {
                warn!("Cannot apply {}: {}", self.interface_name(record.id), e);
            }
        }
    }

    /// Stored record overlaid with live state.
    ///
    /// `status` and `mac` always come from the system, as do `subnet` and
    /// `broadcast` for DHCP records or when none are stored. With
    /// `live_values` false, all addressing fields come from the system. The
    /// transient `restart` flag is dropped unless `include_restart` is set.
    pub fn read(&self, id: u32, include_restart: bool, live_values: bool) -> Result<InterfaceRecord> {
        let mut record = self.store.get(id).cloned().ok_or(Error::NotFound(id))?;
        let name = self.interface_name(id);

        let info = match self.adapter.address_info(&name) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("No live state for {}: {}", name, e);
                None
            }
        };

        record.status = Some(info.as_ref().map(|i| i.link).unwrap_or(false));
        record.mac = info.as_ref().and_then(|i| i.mac.clone());
        if record.name.is_none() {
            record.name = Some(name);
        }

        let inet = info.as_ref().and_then(|i| i.inet.first());
        if !live_values {
            record.ip = inet.map(|a| a.ip.clone());
            record.netmask = inet.map(|a| a.netmask.clone());
            record.subnet = inet.map(|a| a.subnet.clone());
            record.broadcast = inet.map(|a| a.broadcast.clone());
        } else if record.enable_dhcp {
            // Stored values may belong to an earlier static address.
            record.subnet = inet.map(|a| a.subnet.clone());
            record.broadcast = inet.map(|a| a.broadcast.clone());
        } else {
            if record.subnet.is_none() {
                record.subnet = inet.map(|a| a.subnet.clone());
            }
            if record.broadcast.is_none() {
                record.broadcast = inet.map(|a| a.broadcast.clone());
            }
        }

        if !include_restart {
            record.restart = None;
        }
        Ok(record)
    }

    /// All records with live state, sorted by id, optionally filtered.
    pub fn list(&self, ids: Option<&[u32]>) -> Vec<InterfaceRecord> {
        let mut wanted: Vec<u32> = self
            .store
            .records()
            .iter()
            .map(|r| r.id)
            .filter(|id| ids.map(|ids| ids.contains(id)).unwrap_or(true))
            .collect();
        wanted.sort_unstable();

        wanted
            .into_iter()
            .filter_map(|id| self.read(id, false, true).ok())
            .collect()
    }

    /// Push a record's configuration to the host.
    pub fn apply_to_system(&self, record: &InterfaceRecord) -> Result<()> {
        let name = self.interface_name(record.id);
        if !self.adapter.exists(&name) {
            return Err(Error::UnknownDevice(name));
        }

        self.adapter.set_link(&name, record.enable)?;
        if !record.enable {
            return Ok(());
        }

        let addressing = if record.enable_dhcp {
            Addressing::Dhcp
        } else {
            Addressing::Static {
                ip: record.ip.clone(),
                netmask: record.netmask.clone(),
                gateway: record.gateway.clone(),
            }
        };
        self.adapter.configure(&name, &addressing)
    }

    /// Merge a partial update into the stored record in place.
    pub fn merge_update<P>(&mut self, id: u32, patch: &P) -> Result<InterfaceRecord>
    where
        InterfaceRecord: Merge<P>,
    {
        let record = self.store.get_mut(id).ok_or(Error::NotFound(id))?;
        let changed = record.merge(patch);
        if !changed.is_empty() {
            debug!("Merged into record {}: {}", id, changed.join(", "));
        }
        Ok(record.clone())
    }

    /// Merge and derive without side effects.
    fn prepare(&self, update: &InterfaceUpdate) -> Result<PendingUpdate> {
        let current = self.store.get(update.id).ok_or(Error::NotFound(update.id))?;
        let live = self.read(update.id, true, false)?;

        let mut record = current.clone();
        let changed = record.merge(update);

        if !record.enable_dhcp {
            if let (Some(ip), Some(netmask)) = (non_empty(&record.ip), non_empty(&record.netmask)) {
                let net = compute_network(ip, netmask)?;
                record.subnet = Some(net.subnet.to_string());
                record.broadcast = Some(net.broadcast.to_string());
            }
        }

        let restart_required = update.wants_restart() && live.ip != record.ip;
        record.restart = None;

        let mut response = record.clone();
        response.status = live.status;
        response.mac = live.mac;
        response.name = live.name;
        response.restart = update.restart.map(|_| restart_required);

        Ok(PendingUpdate {
            record,
            changed,
            response,
            restart_required,
        })
    }

    /// Apply a prepared update, store it and publish the change.
    ///
    /// The backup copy is only written when `backup` is set, so bulk updates
    /// can write it once at the end.
    fn commit(&mut self, pending: PendingUpdate, backup: bool) -> Result<InterfaceRecord> {
        let id = pending.record.id;
        self.apply_to_system(&pending.record)?;

        if !self.store.replace(pending.record) {
            return Err(Error::NotFound(id));
        }
        self.store.save()?;
        if backup {
            self.store.backup()?;
        }

        info!(
            "Updated {}: {}",
            self.interface_name(id),
            if pending.changed.is_empty() {
                "no changes".to_string()
            } else {
                pending.changed.join(", ")
            }
        );
        let record = self.read(id, false, true)?;
        self.publish(&record);
        Ok(record)
    }

    /// Merge, apply and persist one update.
    ///
    /// When the update requires a restart, `before_apply` receives the
    /// outcome before the host is touched, since the caller may lose
    /// connectivity once the new address is applied. It is not called
    /// otherwise.
    pub fn put_one<F>(&mut self, update: &InterfaceUpdate, before_apply: F) -> Result<PutOutcome>
    where
        F: FnOnce(&PutOutcome),
    {
        let pending = self.prepare(update)?;
        let outcome = PutOutcome {
            record: pending.response.clone(),
            restart_required: pending.restart_required,
        };
        if outcome.restart_required {
            before_apply(&outcome);
        }
        self.commit(pending, true)?;
        Ok(outcome)
    }

    /// Apply updates one by one; a failing element does not stop the rest.
    /// The backup is written once after the whole batch.
    pub fn put_bulk(&mut self, updates: &[InterfaceUpdate]) -> Vec<BulkItem> {
        let mut items = Vec::with_capacity(updates.len());

        for update in updates {
            let result = self.prepare(update).and_then(|pending| {
                let outcome = PutOutcome {
                    record: pending.response.clone(),
                    restart_required: pending.restart_required,
                };
                self.commit(pending, false).map(|_| outcome)
            });
            if let Err(e) = &result {
                warn!("Bulk update of record {} failed: {}", update.id, e);
            }
            items.push(BulkItem {
                id: update.id,
                result,
            });
        }

        if let Err(e) = self.store.backup() {
            error!("Failed to back up records after bulk update: {}", e);
        }
        items
    }

    /// Merge a DHCP lease reported for interface `iface` and persist it.
    pub fn apply_lease(&mut self, iface: &str, lease: &LeaseUpdate) -> Result<InterfaceRecord> {
        let id = id_from_interface(&self.prefix, iface)
            .ok_or_else(|| Error::UnknownDevice(iface.to_string()))?;
        let net = compute_network(&lease.ip, &lease.netmask)?;

        let mut lease = lease.clone();
        if lease.subnet.is_none() {
            lease.subnet = Some(net.subnet.to_string());
        }

        let mut merged = self.merge_update(id, &lease)?;
        merged.broadcast = Some(net.broadcast.to_string());
        self.store.replace(merged);
        self.store.save_and_backup()?;

        info!("Recorded DHCP lease {} on {}", lease.ip, iface);
        let record = self.read(id, false, true)?;
        self.publish(&record);
        Ok(record)
    }

    fn publish(&self, record: &InterfaceRecord) {
        let resource = format!(
            "{}/{}",
            INTERFACES_RESOURCE,
            self.interface_name(record.id)
        );
        self.notifier.publish(&resource, record.to_event());
    }
}
