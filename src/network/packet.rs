//! ICMP echo packet crafting and reply parsing
//!
//! Wire format of an echo request:
//!
//! ```text
//! type(1) code(1) checksum(2) identifier(2) sequence(2) | timestamp(8, f64 BE) filler...
//! ```
//!
//! The payload is exactly `packet_size` bytes; its first eight bytes carry the
//! send time in seconds since the Unix epoch, used to compute the round trip.

use crate::network::frame::FrameLayout;
use crate::types::IpVersion;
use pnet::packet::icmp::IcmpTypes;
use pnet::packet::icmpv6::Icmpv6Types;
use std::net::Ipv6Addr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const ICMP_HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 8;
const FILLER: u8 = b'Q';
const IPV6_HEADER_LEN: usize = 40;
const ICMPV6_NEXT_HEADER: u8 = 58;

/// Message type numbers of one ICMP flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpKind {
    pub echo_request: u8,
    pub echo_reply: u8,
    pub time_exceeded: u8,
    pub unreachable: u8,
}

impl IcmpKind {
    pub fn for_version(version: IpVersion) -> Self {
        match version {
            IpVersion::V4 => Self {
                echo_request: IcmpTypes::EchoRequest.0,
                echo_reply: IcmpTypes::EchoReply.0,
                time_exceeded: IcmpTypes::TimeExceeded.0,
                unreachable: IcmpTypes::DestinationUnreachable.0,
            },
            IpVersion::V6 => Self {
                echo_request: Icmpv6Types::EchoRequest.0,
                echo_reply: Icmpv6Types::EchoReply.0,
                time_exceeded: Icmpv6Types::TimeExceeded.0,
                unreachable: Icmpv6Types::DestinationUnreachable.0,
            },
        }
    }
}

/// RFC 1071 Internet checksum.
///
/// Sums big-endian 16-bit words (an odd trailing byte is the high byte of a
/// zero-padded word), folds the carries back in and returns the one's
/// complement.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// RFC 4443 pseudo-header prepended to an ICMPv6 message for checksumming only
pub fn icmpv6_pseudo_header(source: Ipv6Addr, destination: Ipv6Addr, upper_len: u32) -> [u8; 40] {
    let mut header = [0u8; 40];
    header[0..16].copy_from_slice(&source.octets());
    header[16..32].copy_from_slice(&destination.octets());
    header[32..36].copy_from_slice(&upper_len.to_be_bytes());
    header[39] = ICMPV6_NEXT_HEADER;
    header
}

/// Current wall-clock time in seconds since the Unix epoch
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Builder for ICMP(v6) echo requests
#[derive(Debug, Clone)]
pub struct EchoRequestBuilder {
    version: IpVersion,
    identifier: u16,
    sequence: u16,
    payload_size: usize,
    timestamp: Option<f64>,
    route: Option<(Ipv6Addr, Ipv6Addr)>,
}

impl EchoRequestBuilder {
    pub fn new(version: IpVersion, identifier: u16, payload_size: usize) -> Self {
        Self {
            version,
            identifier,
            sequence: 0,
            payload_size: payload_size.max(TIMESTAMP_LEN),
            timestamp: None,
            route: None,
        }
    }

    pub fn sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    /// Send time to embed; defaults to the time of `build`
    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Source and destination used for the ICMPv6 pseudo-header
    pub fn ipv6_route(mut self, source: Ipv6Addr, destination: Ipv6Addr) -> Self {
        self.route = Some((source, destination));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let kind = IcmpKind::for_version(self.version);
        let mut packet = Vec::with_capacity(ICMP_HEADER_LEN + self.payload_size);

        packet.push(kind.echo_request);
        packet.push(0); // code
        packet.extend_from_slice(&[0, 0]); // checksum, zero while summing
        packet.extend_from_slice(&self.identifier.to_be_bytes());
        packet.extend_from_slice(&self.sequence.to_be_bytes());

        let timestamp = self.timestamp.unwrap_or_else(unix_timestamp);
        packet.extend_from_slice(&timestamp.to_be_bytes());
        packet.resize(ICMP_HEADER_LEN + self.payload_size, FILLER);

        let checksum = match (self.version, self.route) {
            (IpVersion::V6, Some((source, destination))) => {
                let pseudo = icmpv6_pseudo_header(source, destination, packet.len() as u32);
                let mut summed = Vec::with_capacity(pseudo.len() + packet.len());
                summed.extend_from_slice(&pseudo);
                summed.extend_from_slice(&packet);
                internet_checksum(&summed)
            }
            _ => internet_checksum(&packet),
        };
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());
        packet
    }
}

/// A parsed ICMP message borrowed from a received frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcmpMessage<'a> {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub body: &'a [u8],
}

impl<'a> IcmpMessage<'a> {
    pub fn parse(frame: &'a [u8], layout: FrameLayout) -> Option<Self> {
        let offset = layout.icmp_offset(frame)?;
        let icmp = &frame[offset..];
        Some(Self {
            icmp_type: icmp[0],
            code: icmp[1],
            checksum: u16::from_be_bytes([icmp[2], icmp[3]]),
            identifier: u16::from_be_bytes([icmp[4], icmp[5]]),
            sequence: u16::from_be_bytes([icmp[6], icmp[7]]),
            body: &icmp[ICMP_HEADER_LEN..],
        })
    }

    /// Send time embedded in an echo payload
    pub fn timestamp(&self) -> Option<f64> {
        let bytes: [u8; TIMESTAMP_LEN] = self.body.get(..TIMESTAMP_LEN)?.try_into().ok()?;
        Some(f64::from_be_bytes(bytes))
    }

    /// Identifier and sequence of the echo request quoted inside an error
    /// message, when enough of it was returned
    pub fn quoted_echo(&self, version: IpVersion) -> Option<(u16, u16)> {
        let start = match version {
            IpVersion::V4 => {
                let first = *self.body.first()?;
                if first >> 4 != 4 {
                    return None;
                }
                usize::from(first & 0x0f) * 4
            }
            IpVersion::V6 => IPV6_HEADER_LEN,
        };
        let quoted = self.body.get(start..start + ICMP_HEADER_LEN)?;
        if quoted[0] != IcmpKind::for_version(version).echo_request {
            return None;
        }
        Some((
            u16::from_be_bytes([quoted[4], quoted[5]]),
            u16::from_be_bytes([quoted[6], quoted[7]]),
        ))
    }
}

/// What a received frame means for one outstanding probe
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyClass {
    /// Our echo reply; carries the send time from the payload
    EchoReply { sent_at: f64 },
    TimeExceeded,
    Unreachable { code: u8 },
    /// Anything else; the wait continues
    Unrelated,
}

/// Matches received frames against one outstanding echo request
#[derive(Debug, Clone)]
pub struct ReplyMatcher {
    version: IpVersion,
    kind: IcmpKind,
    layout: FrameLayout,
    identifier: u16,
    alternate_identifier: Option<u16>,
    sequence: u16,
}

impl ReplyMatcher {
    pub fn new(version: IpVersion, layout: FrameLayout, identifier: u16, sequence: u16) -> Self {
        Self {
            version,
            kind: IcmpKind::for_version(version),
            layout,
            identifier,
            alternate_identifier: None,
            sequence,
        }
    }

    /// Also accept replies carrying `identifier`.
    ///
    /// Linux datagram ICMP sockets replace the echo identifier with the
    /// socket's local port.
    pub fn also_accept(mut self, identifier: u16) -> Self {
        if identifier != self.identifier {
            self.alternate_identifier = Some(identifier);
        }
        self
    }

    fn is_ours(&self, identifier: u16, sequence: u16) -> bool {
        sequence == self.sequence
            && (identifier == self.identifier || Some(identifier) == self.alternate_identifier)
    }

    pub fn classify(&self, frame: &[u8]) -> ReplyClass {
        let message = match IcmpMessage::parse(frame, self.layout) {
            Some(message) => message,
            None => return ReplyClass::Unrelated,
        };

        if message.icmp_type == self.kind.echo_reply {
            if !self.is_ours(message.identifier, message.sequence) {
                return ReplyClass::Unrelated;
            }
            return match message.timestamp() {
                Some(sent_at) => ReplyClass::EchoReply { sent_at },
                None => ReplyClass::Unrelated,
            };
        }

        let is_error = message.icmp_type == self.kind.time_exceeded
            || message.icmp_type == self.kind.unreachable;
        if !is_error {
            return ReplyClass::Unrelated;
        }
        // Errors quoting somebody else's request are ignored; short quotes
        // are attributed to us
        if let Some((identifier, sequence)) = message.quoted_echo(self.version) {
            if !self.is_ours(identifier, sequence) {
                return ReplyClass::Unrelated;
            }
        }
        if message.icmp_type == self.kind.time_exceeded {
            ReplyClass::TimeExceeded
        } else {
            ReplyClass::Unreachable { code: message.code }
        }
    }
}
