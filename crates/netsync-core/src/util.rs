// ── Naming and addressing helpers ──

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::IpNetwork;

use crate::error::CoreError;

/// Normalise a display name into a destination slug.
///
/// Lowercases, trims, turns inner spaces into `_` and drops every other
/// character that is not ASCII alphanumeric or `_`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Prefix length for a netmask given as a dotted quad (`255.255.255.0`)
/// or as a bit count (`24`). Non-contiguous masks yield `None`.
pub fn prefix_len_from_mask(mask: &str) -> Option<u8> {
    let mask = mask.trim();
    if let Ok(bits) = mask.parse::<u8>() {
        return (bits <= 32).then_some(bits);
    }
    let raw = u32::from(mask.parse::<Ipv4Addr>().ok()?);
    let ones = raw.leading_ones();
    if raw.count_ones() != ones {
        return None;
    }
    u8::try_from(ones).ok()
}

/// Host-route length for the address family (32 or 128).
pub fn host_prefix_len(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// The enclosing network of an interface address, unless the address is
/// a host route (`/32`, `/128`) which never yields a prefix.
pub fn network_of(address: IpNetwork) -> Option<IpNetwork> {
    if address.prefix() == host_prefix_len(address.ip()) {
        return None;
    }
    IpNetwork::new(address.network(), address.prefix()).ok()
}

/// Whether an address may be synced.
///
/// Ignored subnets take precedence; an empty permitted list admits nothing.
pub fn is_permitted_address(addr: IpAddr, permitted: &[IpNetwork], ignored: &[IpNetwork]) -> bool {
    if ignored.iter().any(|net| net.contains(addr)) {
        return false;
    }
    permitted.iter().any(|net| net.contains(addr))
}

/// Parse a list of CIDR strings, failing on the first malformed entry.
pub fn parse_subnets<S: AsRef<str>>(subnets: &[S]) -> Result<Vec<IpNetwork>, CoreError> {
    subnets
        .iter()
        .map(|raw| {
            let raw = raw.as_ref().trim();
            raw.parse::<IpNetwork>().map_err(|e| CoreError::InvalidSubnet {
                subnet: raw.to_owned(),
                reason: e.to_string(),
            })
        })
        .collect()
}
