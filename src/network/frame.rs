//! Receive-side frame layout of ICMP sockets
//!
//! Whether a datagram read from an ICMP socket starts with the IP header
//! depends on the operating system and on the socket mode. The layout is
//! resolved once, when the socket is created, from a small lookup table.

use crate::types::IpVersion;
use pnet::packet::ipv4::Ipv4Packet;
use serde::{Deserialize, Serialize};

/// Operating system family, as far as ICMP framing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    Linux,
    Macos,
    Windows,
    OtherUnix,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            OsFamily::Linux
        } else if cfg!(any(target_os = "macos", target_os = "ios")) {
            OsFamily::Macos
        } else if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::OtherUnix
        }
    }
}

/// How the ICMP socket was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketMode {
    /// `SOCK_RAW`, needs elevated privileges
    Raw,
    /// `SOCK_DGRAM` with `IPPROTO_ICMP`, the unprivileged ping socket
    Datagram,
}

/// Position of the ICMP message inside a received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameLayout {
    /// The ICMP header is the first byte
    Bare,
    /// An IPv4 header of variable length precedes the ICMP header
    Ipv4Header,
}

impl FrameLayout {
    pub fn resolve(os: OsFamily, mode: SocketMode, version: IpVersion) -> Self {
        match (version, mode, os) {
            // RFC 3542: raw ICMPv6 sockets never deliver the IPv6 header
            (IpVersion::V6, _, _) => FrameLayout::Bare,
            (IpVersion::V4, SocketMode::Raw, _) => FrameLayout::Ipv4Header,
            (IpVersion::V4, SocketMode::Datagram, OsFamily::Linux) => FrameLayout::Bare,
            (IpVersion::V4, SocketMode::Datagram, _) => FrameLayout::Ipv4Header,
        }
    }

    /// Offset of the ICMP header in `data`, or `None` when the datagram is
    /// too short to hold one.
    ///
    /// For [`FrameLayout::Ipv4Header`] the header length is read from the
    /// packet. A first nibble other than 4 means the kernel handed over a
    /// bare message after all, and offset 0 is used.
    pub fn icmp_offset(&self, data: &[u8]) -> Option<usize> {
        let offset = match self {
            FrameLayout::Bare => 0,
            FrameLayout::Ipv4Header => match Ipv4Packet::new(data) {
                Some(ip) if ip.get_version() == 4 => {
                    let header_len = usize::from(ip.get_header_length()) * 4;
                    if header_len < 20 {
                        return None;
                    }
                    header_len
                }
                _ => 0,
            },
        };
        if data.len() < offset + super::packet::ICMP_HEADER_LEN {
            return None;
        }
        Some(offset)
    }
}
