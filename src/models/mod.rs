// Ethernet Bundle - Shared Models
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Ethernet Bundle Models
//!
//! Shared types used by the reconciler, the store and the request handlers:
//!
//! - **Record**: persisted per-interface configuration and partial updates
//! - **Merge**: field-wise merge of partial updates into records
//! - **Addressing**: subnet/broadcast arithmetic for IPv4
//! - **Validation**: request body schema checks
//! - **Config**: application configuration
//! - **Error**: shared error types

pub mod addressing;
pub mod config;
pub mod error;
pub mod merge;
pub mod record;
pub mod validation;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use merge::Merge;
pub use record::{InterfaceRecord, InterfaceUpdate, LeaseUpdate};

/// Configuration directory name (under XDG_CONFIG_HOME).
pub const CONFIG_DIR_NAME: &str = "ethernet-bundle";

/// Resource serving the interface records.
pub const ETHERNETS_RESOURCE: &str = "/network/ethernets";

/// Resource receiving DHCP lease updates and carrying change events.
pub const INTERFACES_RESOURCE: &str = "/network/interfaces";
