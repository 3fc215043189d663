//! TCP connect-scan engine

use crate::core::PortScanService;
use crate::error::{scan_error_from_io, ScanError, ValidationError};
use crate::scanner::connector::{Connector, TokioConnector};
use crate::scanner::services::service_name;
use crate::types::{
    IpAddress, Port, PortRange, PortScanResult, PortScanSummary, PortStatus, Timeout,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Connect scanner; the connect primitive is pluggable for testing
#[derive(Debug, Clone, Default)]
pub struct TcpConnectScanner<C = TokioConnector> {
    connector: C,
}

impl TcpConnectScanner<TokioConnector> {
    pub fn new() -> Self {
        Self {
            connector: TokioConnector,
        }
    }
}

impl<C: Connector> TcpConnectScanner<C> {
    pub fn with_connector(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Scan one port of a multi-port scan, turning per-port failures into a
    /// FILTERED result
    async fn scan_port_in_batch(
        &self,
        target: &IpAddress,
        port: Port,
        timeout: Timeout,
    ) -> Result<PortScanResult, ScanError> {
        let scanned_at = Utc::now();
        let start = Instant::now();
        match self.scan_port(target, port, timeout).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_per_port_outcome() => {
                log::debug!("{}:{} filtered: {}", target, port, e);
                Ok(PortScanResult::new(port, PortStatus::Filtered, scanned_at)
                    .with_response_time(start.elapsed())
                    .with_error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

fn is_refusal(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
    )
}

#[async_trait]
impl<C: Connector> PortScanService for TcpConnectScanner<C> {
    async fn scan_port(
        &self,
        target: &IpAddress,
        port: Port,
        timeout: Timeout,
    ) -> Result<PortScanResult, ScanError> {
        let address = SocketAddr::new(target.addr(), port.value());
        // stamped when the attempt starts
        let scanned_at = Utc::now();
        let start = Instant::now();
        let outcome = self.connector.connect(address, timeout.as_duration()).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(()) => {
                log::debug!("{} open", address);
                Ok(PortScanResult::new(port, PortStatus::Open, scanned_at)
                    .with_response_time(elapsed)
                    .with_service(service_name(port).map(String::from)))
            }
            Err(e) if is_refusal(&e) => {
                log::debug!("{} closed", address);
                Ok(PortScanResult::new(port, PortStatus::Closed, scanned_at).with_response_time(elapsed))
            }
            Err(e) => Err(scan_error_from_io(target.as_str(), port.value(), &e)),
        }
    }

    async fn scan_ports(
        &self,
        target: &IpAddress,
        ports: &[Port],
        timeout: Timeout,
        max_concurrent: usize,
    ) -> Result<Vec<PortScanResult>, ScanError> {
        if max_concurrent == 0 {
            return Err(ValidationError::BadConcurrency(max_concurrent).into());
        }

        // The gate admits at most `max_concurrent` connects at once. More
        // permits than ports buys nothing, and tokio caps the permit count.
        let permits = max_concurrent
            .min(ports.len().max(1))
            .min(Semaphore::MAX_PERMITS);
        let semaphore = Semaphore::new(permits);
        let attempts = ports.iter().map(|&port| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.map_err(|_| ScanError::Cancelled)?;
                self.scan_port_in_batch(target, port, timeout).await
            }
        });

        try_join_all(attempts).await
    }

    async fn scan_port_range(
        &self,
        target: &IpAddress,
        range: PortRange,
        timeout: Timeout,
        max_concurrent: usize,
    ) -> Result<PortScanSummary, ScanError> {
        if range.start() > range.end() {
            return Err(ScanError::InvalidPortRange(format!(
                "start port {} is greater than end port {}",
                range.start(),
                range.end()
            )));
        }

        log::info!(
            "Scanning {} ports ({}) on {} with {} concurrent attempts",
            range.count(),
            range,
            target,
            max_concurrent
        );
        let started_at = Utc::now();
        let start = Instant::now();

        let results = self
            .scan_ports(target, &range.ports(), timeout, max_concurrent)
            .await?;

        let summary = PortScanSummary::from_results(
            target.to_string(),
            range.to_string(),
            started_at,
            Utc::now(),
            start.elapsed(),
            results,
        );
        log::info!("{}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Answers per port from a fixed table; unlisted ports are refused
    struct TableConnector {
        answers: HashMap<u16, io::ErrorKind>,
        open: Vec<u16>,
    }

    #[async_trait]
    impl Connector for TableConnector {
        async fn connect(&self, address: SocketAddr, _timeout: Duration) -> io::Result<()> {
            if self.open.contains(&address.port()) {
                return Ok(());
            }
            let kind = self
                .answers
                .get(&address.port())
                .copied()
                .unwrap_or(io::ErrorKind::ConnectionRefused);
            Err(io::Error::from(kind))
        }
    }

    /// Accepts every connect after a fixed delay
    struct SlowConnector(Duration);

    #[async_trait]
    impl Connector for SlowConnector {
        async fn connect(&self, _address: SocketAddr, _timeout: Duration) -> io::Result<()> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn scanner(open: &[u16], answers: &[(u16, io::ErrorKind)]) -> TcpConnectScanner<TableConnector> {
        TcpConnectScanner::with_connector(TableConnector {
            answers: answers.iter().copied().collect(),
            open: open.to_vec(),
        })
    }

    fn target() -> IpAddress {
        IpAddress::parse("192.0.2.10").unwrap()
    }

    fn port(n: u32) -> Port {
        Port::new(n).unwrap()
    }

    fn timeout() -> Timeout {
        Timeout::new(1.0).unwrap()
    }

    #[tokio::test]
    async fn test_open_port_gets_service_name() {
        let result = scanner(&[22], &[])
            .scan_port(&target(), port(22), timeout())
            .await
            .unwrap();
        assert_eq!(result.status, PortStatus::Open);
        assert_eq!(result.service.as_deref(), Some("SSH"));
        assert!(result.response_time.is_some());
    }

    #[tokio::test]
    async fn test_refused_is_closed_without_service() {
        let result = scanner(&[], &[])
            .scan_port(&target(), port(22), timeout())
            .await
            .unwrap();
        assert_eq!(result.status, PortStatus::Closed);
        assert_eq!(result.service, None);
    }

    #[tokio::test]
    async fn test_single_port_timeout_is_an_error() {
        let err = scanner(&[], &[(80, io::ErrorKind::TimedOut)])
            .scan_port(&target(), port(80), timeout())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Timeout { port: 80, .. }));
    }

    #[tokio::test]
    async fn test_batch_turns_timeout_into_filtered() {
        let results = scanner(&[443], &[(80, io::ErrorKind::TimedOut)])
            .scan_ports(&target(), &[port(443), port(80), port(81)], timeout(), 2)
            .await
            .unwrap();

        let states: Vec<PortStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            states,
            vec![PortStatus::Open, PortStatus::Filtered, PortStatus::Closed]
        );
        assert!(results[1].error_message.is_some());
    }

    #[tokio::test]
    async fn test_batch_aborts_on_call_fatal_error() {
        let err = scanner(&[], &[(81, io::ErrorKind::AddrNotAvailable)])
            .scan_ports(&target(), &[port(80), port(81)], timeout(), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Connection(_)));
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let err = scanner(&[], &[])
            .scan_ports(&target(), &[port(80)], timeout(), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidInput(ValidationError::BadConcurrency(0))
        ));
    }

    #[tokio::test]
    async fn test_unbounded_concurrency_is_clamped() {
        let results = scanner(&[80], &[])
            .scan_ports(&target(), &[port(80), port(81)], timeout(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, PortStatus::Open);
        assert_eq!(results[1].status, PortStatus::Closed);

        let results = scanner(&[], &[])
            .scan_ports(&target(), &[], timeout(), usize::MAX)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_scanned_at_marks_attempt_start() {
        let delay = Duration::from_millis(200);
        let scanner = TcpConnectScanner::with_connector(SlowConnector(delay));

        let before = Utc::now();
        let result = scanner.scan_port(&target(), port(80), timeout()).await.unwrap();
        let after = Utc::now();

        assert!(result.scanned_at >= before);
        assert!(result.scanned_at <= after - chrono::Duration::milliseconds(150));
    }

    #[tokio::test]
    async fn test_filtered_scanned_at_marks_attempt_start() {
        struct SlowTimeout;

        #[async_trait]
        impl Connector for SlowTimeout {
            async fn connect(&self, _address: SocketAddr, _timeout: Duration) -> io::Result<()> {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err(io::Error::from(io::ErrorKind::TimedOut))
            }
        }

        let before = Utc::now();
        let results = TcpConnectScanner::with_connector(SlowTimeout)
            .scan_ports(&target(), &[port(80)], timeout(), 1)
            .await
            .unwrap();
        let after = Utc::now();

        assert_eq!(results[0].status, PortStatus::Filtered);
        assert!(results[0].scanned_at >= before);
        assert!(results[0].scanned_at <= after - chrono::Duration::milliseconds(150));
    }

    #[tokio::test]
    async fn test_range_summary() {
        let range = PortRange::from_numbers(20, 25).unwrap();
        let summary = scanner(&[22, 25], &[(23, io::ErrorKind::TimedOut)])
            .scan_port_range(&target(), range, timeout(), 3)
            .await
            .unwrap();

        assert_eq!(summary.port_range, "20-25");
        assert_eq!(summary.target, "192.0.2.10");
        assert_eq!(summary.total_ports, 6);
        assert_eq!(summary.open_ports, 2);
        assert_eq!(summary.filtered_ports, 1);
        assert_eq!(summary.closed_ports, 3);
        let ports: Vec<u16> = summary.results.iter().map(|r| r.port.value()).collect();
        assert_eq!(ports, vec![20, 21, 22, 23, 24, 25]);
    }

    #[tokio::test]
    async fn test_common_ports_covers_well_known_range() {
        let summary = scanner(&[80], &[])
            .scan_common_ports(&target(), timeout(), 64)
            .await
            .unwrap();
        assert_eq!(summary.port_range, "1-1023");
        assert_eq!(summary.total_ports, 1023);
        assert_eq!(summary.open_ports_list()[0].service.as_deref(), Some("HTTP"));
    }
}
