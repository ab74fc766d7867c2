// Ethernet Bundle - IPv4 Address Arithmetic
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Derived-field computation for IPv4 interface records.
//!
//! Everything here is pure: subnet and broadcast are derived from an
//! address and netmask without touching the system.

use std::net::Ipv4Addr;
use std::str::FromStr;

use super::error::{Error, Result};

/// Network and broadcast addresses derived from an address/netmask pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Network {
    pub subnet: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub prefix: u8,
}

/// Parse a dotted-quad IPv4 literal.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(s.trim()).map_err(|_| Error::InvalidAddress(s.to_string()))
}

/// Parse a dotted-quad netmask and check that its bits are contiguous.
pub fn parse_netmask(s: &str) -> Result<Ipv4Addr> {
    let mask = parse_ipv4(s)?;
    let bits = u32::from(mask);
    // A valid mask is a run of ones followed by a run of zeros.
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return Err(Error::InvalidAddress(s.to_string()));
    }
    Ok(mask)
}

/// Prefix length of a netmask (e.g. 24 for 255.255.255.0).
pub fn netmask_to_prefix(mask: Ipv4Addr) -> u8 {
    u32::from(mask).count_ones() as u8
}

/// Netmask for a prefix length.
pub fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    match prefix {
        0 => Ipv4Addr::UNSPECIFIED,
        p if p >= 32 => Ipv4Addr::BROADCAST,
        p => Ipv4Addr::from(u32::MAX << (32 - p)),
    }
}

/// Compute the network (subnet) and broadcast addresses for `ip`/`netmask`.
///
/// network = ip AND netmask; broadcast = network OR NOT netmask.
pub fn compute_network(ip: &str, netmask: &str) -> Result<Ipv4Network> {
    let ip = u32::from(parse_ipv4(ip)?);
    let mask = parse_netmask(netmask)?;
    let mask_bits = u32::from(mask);

    let network = ip & mask_bits;
    let broadcast = network | !mask_bits;

    Ok(Ipv4Network {
        subnet: Ipv4Addr::from(network),
        broadcast: Ipv4Addr::from(broadcast),
        prefix: netmask_to_prefix(mask),
    })
}

/// Replace the third octet of `base`, keeping the rest of the address.
pub fn with_third_octet(base: Ipv4Addr, octet: u8) -> Ipv4Addr {
    let [a, b, _, d] = base.octets();
    Ipv4Addr::new(a, b, octet, d)
}
