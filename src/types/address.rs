//! Validated IP address value type

use crate::error::ValidationError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// IP protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn number(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// A syntactically valid IPv4 or IPv6 address.
///
/// The textual form given by the caller is kept for display; every derived
/// flag is computed from the parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpAddress {
    text: String,
    addr: IpAddr,
}

/// IPv6 blocks reserved by the IETF, as (prefix, prefix length) pairs
const IPV6_RESERVED: [(u16, u32); 15] = [
    (0x0000, 8),
    (0x0100, 8),
    (0x0200, 7),
    (0x0400, 6),
    (0x0800, 5),
    (0x1000, 4),
    (0x4000, 3),
    (0x6000, 3),
    (0x8000, 3),
    (0xa000, 3),
    (0xc000, 3),
    (0xe000, 4),
    (0xf000, 5),
    (0xf800, 6),
    (0xfe00, 9),
];

/// IPv4 special-purpose blocks counted as private, as (network, prefix length)
const IPV4_PRIVATE: [(Ipv4Addr, u32); 14] = [
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 29),
    (Ipv4Addr::new(192, 0, 0, 170), 31),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 255, 255, 255), 32),
];

/// IPv6 special-purpose blocks counted as private. IPv4-mapped addresses
/// are judged by their IPv4 form instead.
const IPV6_PRIVATE: [(Ipv6Addr, u32); 9] = [
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1), 128),
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0), 128),
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    (Ipv6Addr::new(0x2001, 2, 0, 0, 0, 0, 0, 0), 48),
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0x2001, 0x10, 0, 0, 0, 0, 0, 0), 28),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
];

impl IpAddress {
    /// Parse an address, sniffing its version from the text
    pub fn parse(address: &str) -> Result<Self, ValidationError> {
        let text = address.trim();
        let addr = IpAddr::from_str(text)
            .map_err(|_| ValidationError::InvalidIpAddress(address.to_string()))?;
        Ok(Self {
            text: text.to_string(),
            addr,
        })
    }

    /// Parse an address that must be IPv4
    pub fn v4(address: &str) -> Result<Self, ValidationError> {
        let parsed = Self::parse(address)?;
        if parsed.version() != IpVersion::V4 {
            return Err(ValidationError::InvalidIpAddress(format!(
                "expected IPv4 address, got: {}",
                address
            )));
        }
        Ok(parsed)
    }

    /// Parse an address that must be IPv6
    pub fn v6(address: &str) -> Result<Self, ValidationError> {
        let parsed = Self::parse(address)?;
        if parsed.version() != IpVersion::V6 {
            return Err(ValidationError::InvalidIpAddress(format!(
                "expected IPv6 address, got: {}",
                address
            )));
        }
        Ok(parsed)
    }

    pub fn version(&self) -> IpVersion {
        match self.addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_loopback(&self) -> bool {
        self.addr.is_loopback()
    }

    pub fn is_multicast(&self) -> bool {
        self.addr.is_multicast()
    }

    /// Not globally reachable: private-use, loopback, link-local,
    /// documentation, benchmarking and other special-purpose space
    pub fn is_private(&self) -> bool {
        match self.addr {
            IpAddr::V4(v4) => is_private_v4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => is_private_v4(v4),
                None => IPV6_PRIVATE
                    .iter()
                    .any(|&(network, len)| in_network_v6(v6, network, len)),
            },
        }
    }

    pub fn is_reserved(&self) -> bool {
        match self.addr {
            IpAddr::V4(v4) => is_reserved_v4(v4),
            IpAddr::V6(v6) => is_reserved_v6(v6),
        }
    }
}

fn in_network_v4(addr: Ipv4Addr, network: Ipv4Addr, len: u32) -> bool {
    let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
    u32::from(addr) & mask == u32::from(network)
}

fn in_network_v6(addr: Ipv6Addr, network: Ipv6Addr, len: u32) -> bool {
    let mask = u128::MAX.checked_shl(128 - len).unwrap_or(0);
    u128::from(addr) & mask == u128::from(network)
}

fn is_private_v4(addr: Ipv4Addr) -> bool {
    IPV4_PRIVATE
        .iter()
        .any(|&(network, len)| in_network_v4(addr, network, len))
}

fn is_reserved_v4(addr: Ipv4Addr) -> bool {
    // 240.0.0.0/4, broadcast included
    addr.octets()[0] & 0xf0 == 0xf0
}

fn is_reserved_v6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    IPV6_RESERVED.iter().any(|&(prefix, len)| {
        let mask = !0u16 << (16 - len);
        first & mask == prefix
    })
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for IpAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        Self {
            text: addr.to_string(),
            addr,
        }
    }
}

impl Serialize for IpAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for IpAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        IpAddress::parse(&text).map_err(de::Error::custom)
    }
}
