//! netprobe - ICMP echo and TCP connect probing
//!
//! Raw-socket ping with hand-built ICMP/ICMPv6 packets and a bounded
//! concurrency TCP connect scanner, behind a façade that takes plain
//! primitives.

pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod scanner;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use crate::core::{PingService, PortScanService};
pub use config::ProbeConfig;
pub use error::{ConfigError, PingError, ScanError, ValidationError};
pub use network::IcmpPinger;
pub use scanner::{Connector, TcpConnectScanner, TokioConnector};
pub use service::ProbeService;
pub use types::{
    IpAddress, IpVersion, PacketSize, PingResult, Port, PortRange, PortScanResult,
    PortScanSummary, PortStatus, TimeToLive, Timeout,
};
