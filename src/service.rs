//! Probing façade
//!
//! Accepts plain primitives, builds the typed values (so malformed input
//! fails before any socket is opened) and forwards to the two engines.

use crate::config::ProbeConfig;
use crate::core::{PingService, PortScanService};
use crate::error::{PingError, ScanError};
use crate::network::IcmpPinger;
use crate::scanner::TcpConnectScanner;
use crate::types::{
    IpAddress, PacketSize, PingResult, Port, PortRange, PortScanResult, PortScanSummary,
    TimeToLive, Timeout,
};

/// Single entry point for ping and port-scan requests
#[derive(Debug, Clone, Default)]
pub struct ProbeService<P = IcmpPinger, S = TcpConnectScanner> {
    pinger: P,
    scanner: S,
    config: ProbeConfig,
}

impl ProbeService {
    /// Service with the OS-backed engines and built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with the OS-backed engines and `~/.netprobe.toml` defaults
    pub fn create() -> Self {
        Self::default().with_config(ProbeConfig::load_default_config())
    }
}

impl<P: PingService, S: PortScanService> ProbeService<P, S> {
    pub fn with_engines(pinger: P, scanner: S) -> Self {
        Self {
            pinger,
            scanner,
            config: ProbeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProbeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn pinger(&self) -> &P {
        &self.pinger
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub async fn ping(
        &self,
        address: &str,
        timeout: f64,
        packet_size: u32,
        ttl: Option<u32>,
    ) -> Result<PingResult, PingError> {
        let destination = IpAddress::parse(address)?;
        let timeout = Timeout::new(timeout)?;
        let packet_size = PacketSize::new(packet_size)?;
        let ttl = ttl.map(TimeToLive::new).transpose()?;

        self.pinger.ping(&destination, timeout, packet_size, ttl).await
    }

    /// Every address is validated before the first probe is sent
    pub async fn ping_multiple<A: AsRef<str>>(
        &self,
        addresses: &[A],
        timeout: f64,
        packet_size: u32,
        ttl: Option<u32>,
    ) -> Result<Vec<PingResult>, PingError> {
        let destinations = addresses
            .iter()
            .map(|address| IpAddress::parse(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let timeout = Timeout::new(timeout)?;
        let packet_size = PacketSize::new(packet_size)?;
        let ttl = ttl.map(TimeToLive::new).transpose()?;

        self.pinger
            .ping_multiple(&destinations, timeout, packet_size, ttl)
            .await
    }

    pub async fn scan_port(
        &self,
        target: &str,
        port: u32,
        timeout: f64,
    ) -> Result<PortScanResult, ScanError> {
        let target = IpAddress::parse(target)?;
        let port = Port::new(port)?;
        let timeout = Timeout::new(timeout)?;

        self.scanner.scan_port(&target, port, timeout).await
    }

    pub async fn scan_ports(
        &self,
        target: &str,
        ports: &[u32],
        timeout: f64,
        max_concurrent: usize,
    ) -> Result<Vec<PortScanResult>, ScanError> {
        let target = IpAddress::parse(target)?;
        let ports = ports
            .iter()
            .map(|&port| Port::new(port))
            .collect::<Result<Vec<_>, _>>()?;
        let timeout = Timeout::new(timeout)?;

        self.scanner
            .scan_ports(&target, &ports, timeout, max_concurrent)
            .await
    }

    pub async fn scan_port_range(
        &self,
        target: &str,
        start: u32,
        end: u32,
        timeout: f64,
        max_concurrent: usize,
    ) -> Result<PortScanSummary, ScanError> {
        let target = IpAddress::parse(target)?;
        let range = PortRange::from_numbers(start, end)?;
        let timeout = Timeout::new(timeout)?;

        self.scanner
            .scan_port_range(&target, range, timeout, max_concurrent)
            .await
    }

    pub async fn scan_common_ports(
        &self,
        target: &str,
        timeout: f64,
        max_concurrent: usize,
    ) -> Result<PortScanSummary, ScanError> {
        let target = IpAddress::parse(target)?;
        let timeout = Timeout::new(timeout)?;

        self.scanner
            .scan_common_ports(&target, timeout, max_concurrent)
            .await
    }

    /// Ping with the configured defaults
    pub async fn ping_host(&self, address: &str) -> Result<PingResult, PingError> {
        let ping = &self.config.ping;
        self.ping(address, ping.timeout, ping.packet_size, ping.ttl)
            .await
    }

    /// Scan ports 1-1023 with the configured defaults
    pub async fn scan_host_common_ports(&self, target: &str) -> Result<PortScanSummary, ScanError> {
        let scan = &self.config.scan;
        self.scan_common_ports(target, scan.timeout, scan.max_concurrent)
            .await
    }
}
