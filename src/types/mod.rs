//! Immutable, self-validating value types shared by both engines

pub mod address;
pub mod limits;
pub mod ping;
pub mod port;
pub mod scan;

pub use address::{IpAddress, IpVersion};
pub use limits::{PacketSize, TimeToLive, Timeout};
pub use ping::PingResult;
pub use port::{Port, PortCategory, PortRange, ALL_PORTS, COMMON_PORTS, DYNAMIC_PORTS, REGISTERED_PORTS};
pub use scan::{PortScanResult, PortScanSummary, PortStatus};
