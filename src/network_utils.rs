// Ethernet Bundle - Network Utilities
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Network interface detection and configuration.
//!
//! [`NetworkAdapter`] is the boundary between the reconciler and the host's
//! network stack. [`SystemAdapter`] implements it with the Linux sysfs
//! interface, the `ip` command and a DHCP client program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::models::addressing::{compute_network, prefix_to_netmask};
use crate::models::{Error, Result};

/// Netmask assumed when a static address has none configured.
const DEFAULT_NETMASK: &str = "255.255.255.0";

/// One IPv4 address assigned to an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InetAddress {
    pub ip: String,
    pub netmask: String,
    pub subnet: String,
    pub broadcast: String,
}

/// Live state of an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInfo {
    pub mac: Option<String>,
    /// Link is up and has carrier.
    pub link: bool,
    pub inet: Vec<InetAddress>,
}

/// How an enabled interface obtains its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    Dhcp,
    Static {
        ip: Option<String>,
        netmask: Option<String>,
        gateway: Option<String>,
    },
}

/// Operations the reconciler needs from the host network stack.
pub trait NetworkAdapter {
    /// Names of all non-loopback interfaces.
    fn list_interfaces(&self) -> Result<Vec<String>>;

    /// Link state, hardware address and IPv4 addresses of `name`.
    fn address_info(&self, name: &str) -> Result<AddressInfo>;

    /// Bring the link of `name` up or down.
    fn set_link(&self, name: &str, up: bool) -> Result<()>;

    /// Replace the IPv4 configuration of `name`.
    fn configure(&self, name: &str, addressing: &Addressing) -> Result<()>;

    /// Whether `name` exists on the host.
    fn exists(&self, name: &str) -> bool {
        self.list_interfaces()
            .map(|ifaces| ifaces.iter().any(|i| i == name))
            .unwrap_or(false)
    }
}

/// Keep interfaces named `<prefix><digits>` and sort them naturally.
pub fn filter_interfaces(ifaces: Vec<String>, prefix: &str) -> Vec<String> {
    let mut matched: Vec<String> = ifaces
        .into_iter()
        .filter(|name| {
            name.strip_prefix(prefix)
                .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false)
        })
        .collect();
    matched.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));
    matched
}

/// Generate a sort key that sorts numbers naturally.
fn natural_sort_key(s: &str) -> (String, u32) {
    let mut prefix = String::new();
    let mut num_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            num_str.push(c);
        } else if num_str.is_empty() {
            prefix.push(c);
        }
    }

    let num: u32 = num_str.parse().unwrap_or(0);
    (prefix, num)
}

/// Parse `ip -4 -o addr show` output into addresses.
pub fn parse_inet_output(output: &str) -> Vec<InetAddress> {
    let mut addresses = Vec::new();

    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.by_ref().find(|t| *t == "inet").is_none() {
            continue;
        }
        let Some(cidr) = tokens.next() else {
            continue;
        };
        let (ip, prefix) = match cidr.split_once('/') {
            Some((ip, prefix)) => (ip, prefix.parse::<u8>().unwrap_or(32)),
            None => (cidr, 32),
        };
        let netmask = prefix_to_netmask(prefix).to_string();
        match compute_network(ip, &netmask) {
            Ok(net) => addresses.push(InetAddress {
                ip: ip.to_string(),
                netmask,
                subnet: net.subnet.to_string(),
                broadcast: net.broadcast.to_string(),
            }),
            Err(e) => warn!("Skipping unparsable address {}: {}", cidr, e),
        }
    }

    addresses
}

/// Adapter backed by sysfs, `ip` and a DHCP client.
#[derive(Debug, Clone)]
pub struct SystemAdapter {
    sysfs_root: PathBuf,
    dhcp_client: String,
}

impl SystemAdapter {
    pub fn new(dhcp_client: impl Into<String>) -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/net"),
            dhcp_client: dhcp_client.into(),
        }
    }

    fn iface_path(&self, name: &str) -> PathBuf {
        self.sysfs_root.join(name)
    }

    fn read_attr(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn ensure_exists(&self, name: &str) -> Result<()> {
        if self.iface_path(name).exists() {
            Ok(())
        } else {
            Err(Error::UnknownDevice(name.to_string()))
        }
    }

    /// Run a command to completion, failing on non-zero exit.
    fn run(program: &str, args: &[&str]) -> Result<String> {
        let command = format!("{} {}", program, args.join(" "));
        debug!("Running: {}", command);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::command_failed(&command, e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(Error::command_failed(
                command,
                if stderr.is_empty() {
                    format!("exit status {}", output.status.code().unwrap_or(-1))
                } else {
                    stderr
                },
            ))
        }
    }

    /// Stop any DHCP client serving `name`. Nothing running is not an error.
    fn stop_dhcp_client(&self, name: &str) {
        let pattern = format!("{} {}", self.dhcp_client, name);
        if let Err(e) = Self::run("pkill", &["-f", &pattern]) {
            debug!("No DHCP client stopped for {}: {}", name, e);
        }
    }
}

impl NetworkAdapter for SystemAdapter {
    fn list_interfaces(&self) -> Result<Vec<String>> {
        let mut ifaces = Vec::new();
        for entry in fs::read_dir(&self.sysfs_root)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name != "lo" {
                ifaces.push(name);
            }
        }
        Ok(ifaces)
    }

    fn address_info(&self, name: &str) -> Result<AddressInfo> {
        self.ensure_exists(name)?;
        let base = self.iface_path(name);

        let mac = Self::read_attr(&base.join("address")).filter(|m| !m.is_empty());
        let link = match Self::read_attr(&base.join("operstate")).as_deref() {
            Some("down") | None => false,
            Some(_) => Self::read_attr(&base.join("carrier")).as_deref() == Some("1"),
        };

        let output = Self::run("ip", &["-4", "-o", "addr", "show", "dev", name])
            .map_err(|_| Error::UnknownDevice(name.to_string()))?;

        Ok(AddressInfo {
            mac,
            link,
            inet: parse_inet_output(&output),
        })
    }

    fn set_link(&self, name: &str, up: bool) -> Result<()> {
        self.ensure_exists(name)?;
        if !up {
            self.stop_dhcp_client(name);
        }
        Self::run("ip", &["link", "set", name, if up { "up" } else { "down" }])?;
        Ok(())
    }

    fn configure(&self, name: &str, addressing: &Addressing) -> Result<()> {
        self.ensure_exists(name)?;
        self.stop_dhcp_client(name);
        Self::run("ip", &["-4", "addr", "flush", "dev", name])?;

        match addressing {
            Addressing::Dhcp => {
                Self::run(&self.dhcp_client, &[name])?;
            }
            Addressing::Static {
                ip,
                netmask,
                gateway,
            } => {
                let Some(ip) = ip.as_deref().filter(|s| !s.is_empty()) else {
                    return Ok(());
                };
                let netmask = netmask
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_NETMASK);
                let net = compute_network(ip, netmask)?;
                let cidr = format!("{}/{}", ip, net.prefix);
                let broadcast = net.broadcast.to_string();
                Self::run(
                    "ip",
                    &["addr", "add", &cidr, "broadcast", &broadcast, "dev", name],
                )?;

                if let Some(gw) = gateway.as_deref().filter(|s| !s.is_empty()) {
                    Self::run(
                        "ip",
                        &["route", "replace", "default", "via", gw, "dev", name],
                    )?;
                }
            }
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.iface_path(name).exists()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_sort_key() {
        assert_eq!(natural_sort_key("eth0"), ("eth".to_string(), 0));
        assert_eq!(natural_sort_key("eth10"), ("eth".to_string(), 10));
    }

    #[test]
    fn test_filter_interfaces() {
        let ifaces = vec![
            "eth10".to_string(),
            "wlan0".to_string(),
            "eth2".to_string(),
            "eth0.100".to_string(),
            "eth0".to_string(),
            "ethernet".to_string(),
        ];
        assert_eq!(filter_interfaces(ifaces, "eth"), vec!["eth0", "eth2", "eth10"]);
    }

    #[test]
    fn test_parse_inet_output() {
        let output = "2: eth0    inet 192.168.31.36/24 brd 192.168.31.255 scope global eth0\\       valid_lft forever preferred_lft forever\n\
                      2: eth0    inet 10.1.2.3/16 scope global secondary eth0\n";
        let addrs = parse_inet_output(output);
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].ip, "192.168.31.36");
        assert_eq!(addrs[0].netmask, "255.255.255.0");
        assert_eq!(addrs[0].subnet, "192.168.31.0");
        assert_eq!(addrs[1].broadcast, "10.1.255.255");
    }

    #[test]
    fn test_parse_inet_output_ignores_noise() {
        assert!(parse_inet_output("").is_empty());
        assert!(parse_inet_output("3: eth1    inet6 fe80::1/64 scope link").is_empty());
    }

    #[test]
    fn test_system_adapter_unknown_device() {
        let adapter = SystemAdapter::new("dhclient");
        assert!(matches!(
            adapter.address_info("eth-does-not-exist"),
            Err(Error::UnknownDevice(_))
        ));
        assert!(!adapter.exists("eth-does-not-exist"));
    }
}
