// Probe service traits
// The seams between the façade and the two probing engines

use crate::error::{PingError, ScanError};
use crate::types::{
    IpAddress, PacketSize, PingResult, Port, PortRange, PortScanResult, PortScanSummary,
    TimeToLive, Timeout,
};
use async_trait::async_trait;

/// ICMP echo engine
#[async_trait]
pub trait PingService: Send + Sync {
    /// Send one echo request and wait for the matching reply.
    ///
    /// Protocol failures (timeout, unreachable, TTL expired) are returned as
    /// the matching [`PingError`] kind.
    async fn ping(
        &self,
        destination: &IpAddress,
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<PingResult, PingError>;

    /// Ping every destination concurrently, output in input order.
    ///
    /// Per-destination failures become failed results; only call-fatal
    /// errors (see [`PingError::is_call_fatal`]) abort the call.
    async fn ping_multiple(
        &self,
        destinations: &[IpAddress],
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<Vec<PingResult>, PingError>;
}

/// TCP connect-scan engine
#[async_trait]
pub trait PortScanService: Send + Sync {
    async fn scan_port(
        &self,
        target: &IpAddress,
        port: Port,
        timeout: Timeout,
    ) -> Result<PortScanResult, ScanError>;

    async fn scan_ports(
        &self,
        target: &IpAddress,
        ports: &[Port],
        timeout: Timeout,
        max_concurrent: usize,
    ) -> Result<Vec<PortScanResult>, ScanError>;

    async fn scan_port_range(
        &self,
        target: &IpAddress,
        range: PortRange,
        timeout: Timeout,
        max_concurrent: usize,
    ) -> Result<PortScanSummary, ScanError>;

    /// Scan the well-known range 1-1023
    async fn scan_common_ports(
        &self,
        target: &IpAddress,
        timeout: Timeout,
        max_concurrent: usize,
    ) -> Result<PortScanSummary, ScanError> {
        self.scan_port_range(target, crate::types::COMMON_PORTS, timeout, max_concurrent)
            .await
    }
}
