//! Error handling for the probing engine
//!
//! Value types fail with [`ValidationError`]. The ICMP engine reports
//! [`PingError`] and the TCP engine reports [`ScanError`]. Raw OS error codes
//! never reach callers: every `std::io::Error` is mapped onto one of the typed
//! kinds below, with the original message kept as text.

use std::io;
use thiserror::Error;

/// Failure to construct a value type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Port number must be between 1 and 65535, got {0}")]
    BadPort(u32),

    #[error("Start port {start} cannot be greater than end port {end}")]
    BadPortRange { start: u16, end: u16 },

    #[error("Timeout must be in (0, 300] seconds, got {0}")]
    BadTimeout(f64),

    #[error("Packet size must be between 8 and 1500 bytes, got {0}")]
    BadPacketSize(u32),

    #[error("TTL must be between 1 and 255, got {0}")]
    BadTimeToLive(u32),

    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid ping result: {0}")]
    InvalidPingResult(String),

    #[error("Max concurrent connections must be at least 1, got {0}")]
    BadConcurrency(usize),
}

/// Error kinds reported by the ICMP echo engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PingError {
    #[error("Ping timeout after {0} seconds")]
    Timeout(f64),

    #[error("Destination unreachable: {0}")]
    DestinationUnreachable(String),

    #[error("Time exceeded (TTL expired)")]
    TimeExceeded,

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid IP address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid ping parameters: {0}")]
    InvalidInput(ValidationError),

    #[error("Ping cancelled")]
    Cancelled,
}

impl PingError {
    /// Errors that abort a whole `ping_multiple` call instead of becoming a
    /// failed result for one destination
    pub fn is_call_fatal(&self) -> bool {
        matches!(
            self,
            PingError::Permission(_)
                | PingError::InvalidAddress(_)
                | PingError::InvalidInput(_)
                | PingError::Cancelled
        )
    }
}

impl From<ValidationError> for PingError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidIpAddress(address) => PingError::InvalidAddress(address),
            other => PingError::InvalidInput(other),
        }
    }
}

/// Error kinds reported by the TCP connect-scan engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("Port scan timed out for {target}:{port}")]
    Timeout { target: String, port: u16 },

    #[error("Permission denied for port scan: {0}")]
    Permission(String),

    #[error("Network error during port scan: {0}")]
    Network(String),

    #[error("Connection to target failed: {0}")]
    Connection(String),

    #[error("Invalid port range: {0}")]
    InvalidPortRange(String),

    #[error("Invalid IP address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid scan parameters: {0}")]
    InvalidInput(ValidationError),

    #[error("Port scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Outcomes that describe one port rather than the whole call.
    ///
    /// Inside a multi-port scan these become a FILTERED result for that port
    /// and never abort sibling attempts.
    pub fn is_per_port_outcome(&self) -> bool {
        matches!(self, ScanError::Timeout { .. } | ScanError::Network(_))
    }
}

impl From<ValidationError> for ScanError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::BadPortRange { .. } => ScanError::InvalidPortRange(e.to_string()),
            ValidationError::InvalidIpAddress(address) => ScanError::InvalidAddress(address),
            other => ScanError::InvalidInput(other),
        }
    }
}

/// Errors raised while loading a [`crate::config::ProbeConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Convert common errors to the typed kinds
impl From<std::net::AddrParseError> for PingError {
    fn from(e: std::net::AddrParseError) -> Self {
        PingError::InvalidAddress(e.to_string())
    }
}

impl From<std::net::AddrParseError> for ScanError {
    fn from(e: std::net::AddrParseError) -> Self {
        ScanError::InvalidAddress(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PingError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            PingError::Cancelled
        } else {
            PingError::Network(format!("probe worker failed: {}", e))
        }
    }
}

fn is_permission_denied(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
        || matches!(e.raw_os_error(), Some(libc::EPERM) | Some(libc::EACCES))
}

fn is_unreachable(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EHOSTUNREACH) | Some(libc::ENETUNREACH)
    )
}

/// Map a socket error raised while opening, configuring or sending on an
/// ICMP socket
pub fn ping_error_from_io(context: &str, e: &io::Error) -> PingError {
    if is_permission_denied(e) {
        PingError::Permission(format!("{}: {}", context, e))
    } else if is_unreachable(e) {
        PingError::DestinationUnreachable(format!("{}: {}", context, e))
    } else {
        PingError::Network(format!("{}: {}", context, e))
    }
}

/// Map a failed TCP connect attempt that is not a refusal.
///
/// Refusal is a CLOSED classification and is decided by the caller before
/// reaching this function.
pub fn scan_error_from_io(target: &str, port: u16, e: &io::Error) -> ScanError {
    if e.kind() == io::ErrorKind::TimedOut {
        return ScanError::Timeout {
            target: target.to_string(),
            port,
        };
    }
    if is_permission_denied(e) {
        return ScanError::Permission(e.to_string());
    }
    match e.kind() {
        io::ErrorKind::AddrNotAvailable | io::ErrorKind::AddrInUse => {
            ScanError::Connection(e.to_string())
        }
        _ => ScanError::Network(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_onto_ping_kinds() {
        let e: PingError = ValidationError::InvalidIpAddress("999.1.1.1".into()).into();
        assert_eq!(e, PingError::InvalidAddress("999.1.1.1".into()));

        let e: PingError = ValidationError::BadTimeout(0.0).into();
        assert!(matches!(e, PingError::InvalidInput(ValidationError::BadTimeout(_))));
    }

    #[test]
    fn test_validation_maps_onto_scan_kinds() {
        let e: ScanError = ValidationError::BadPortRange { start: 443, end: 80 }.into();
        assert!(matches!(e, ScanError::InvalidPortRange(_)));

        let e: ScanError = ValidationError::BadPort(0).into();
        assert!(matches!(e, ScanError::InvalidInput(ValidationError::BadPort(0))));
    }

    #[test]
    fn test_io_mapping_for_ping() {
        let denied = io::Error::from_raw_os_error(libc::EPERM);
        assert!(matches!(ping_error_from_io("socket", &denied), PingError::Permission(_)));

        let unreachable = io::Error::from_raw_os_error(libc::EHOSTUNREACH);
        assert!(matches!(
            ping_error_from_io("send", &unreachable),
            PingError::DestinationUnreachable(_)
        ));

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert!(matches!(ping_error_from_io("send", &other), PingError::Network(_)));
    }

    #[test]
    fn test_io_mapping_for_scan() {
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        let e = scan_error_from_io("127.0.0.1", 80, &timed_out);
        assert!(matches!(e, ScanError::Timeout { port: 80, .. }));
        assert!(e.is_per_port_outcome());

        let addr = io::Error::from(io::ErrorKind::AddrNotAvailable);
        let e = scan_error_from_io("127.0.0.1", 80, &addr);
        assert!(matches!(e, ScanError::Connection(_)));
        assert!(!e.is_per_port_outcome());

        let denied = io::Error::from_raw_os_error(libc::EACCES);
        assert!(matches!(
            scan_error_from_io("127.0.0.1", 80, &denied),
            ScanError::Permission(_)
        ));
    }

    #[test]
    fn test_call_fatal_ping_errors() {
        assert!(PingError::Permission("raw".into()).is_call_fatal());
        assert!(!PingError::Timeout(1.0).is_call_fatal());
        assert!(!PingError::TimeExceeded.is_call_fatal());
    }
}
