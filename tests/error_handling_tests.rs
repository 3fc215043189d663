//! Error taxonomy and recovery tests

use async_trait::async_trait;
use netprobe::{
    Connector, PingError, PingResult, PortRange, PortScanResult, PortStatus, ProbeService,
    ScanError, TcpConnectScanner, ValidationError,
};
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Fails every connect with a fixed OS error
struct FailingConnector(io::ErrorKind);

#[async_trait]
impl Connector for FailingConnector {
    async fn connect(&self, _address: SocketAddr, _timeout: Duration) -> io::Result<()> {
        Err(io::Error::from(self.0))
    }
}

/// Never answers; only the connect deadline ends the attempt
struct BlackHoleConnector;

#[async_trait]
impl Connector for BlackHoleConnector {
    async fn connect(&self, address: SocketAddr, timeout: Duration) -> io::Result<()> {
        tokio::time::sleep(timeout).await;
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect to {} timed out", address),
        ))
    }
}

fn failing(kind: io::ErrorKind) -> ProbeService<netprobe::IcmpPinger, TcpConnectScanner<FailingConnector>> {
    ProbeService::with_engines(
        netprobe::IcmpPinger::new(),
        TcpConnectScanner::with_connector(FailingConnector(kind)),
    )
}

#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_on_single_port_is_raised() {
        let service = ProbeService::with_engines(
            netprobe::IcmpPinger::new(),
            TcpConnectScanner::with_connector(BlackHoleConnector),
        );
        let start = Instant::now();
        let err = service.scan_port("10.1.1.1", 8080, 0.1).await.unwrap_err();

        assert_eq!(
            err,
            ScanError::Timeout {
                target: "10.1.1.1".into(),
                port: 8080
            }
        );
        assert_eq!(err.to_string(), "Port scan timed out for 10.1.1.1:8080");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_timeouts_in_batch_become_filtered() {
        let service = ProbeService::with_engines(
            netprobe::IcmpPinger::new(),
            TcpConnectScanner::with_connector(BlackHoleConnector),
        );
        let start = Instant::now();
        let summary = service
            .scan_port_range("10.1.1.1", 1000, 1009, 0.1, 10)
            .await
            .unwrap();

        // ten attempts share one timeout window
        assert!(start.elapsed() < Duration::from_millis(900));
        assert_eq!(summary.filtered_ports, 10);
        assert_eq!(summary.success_rate(), 0.0);
        assert!(summary
            .filtered_ports_list()
            .iter()
            .all(|r| r.error_message.is_some()));
    }

    #[tokio::test]
    async fn test_network_errors_do_not_abort_batch() {
        let results = failing(io::ErrorKind::Other)
            .scan_ports("10.1.1.1", &[1, 2, 3], 1.0, 2)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.status == PortStatus::Filtered));
    }

    #[tokio::test]
    async fn test_call_fatal_errors_abort_batch() {
        let err = failing(io::ErrorKind::PermissionDenied)
            .scan_ports("10.1.1.1", &[1, 2, 3], 1.0, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Permission(_)));

        let err = failing(io::ErrorKind::AddrNotAvailable)
            .scan_common_ports("10.1.1.1", 1.0, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Connection(_)));
    }

    #[tokio::test]
    async fn test_huge_concurrency_limit_is_accepted() {
        let results = failing(io::ErrorKind::ConnectionRefused)
            .scan_ports("127.0.0.1", &[80, 443], 1.0, usize::MAX)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.status == PortStatus::Closed));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_reset_counts_as_closed() {
        let service = failing(io::ErrorKind::ConnectionReset);
        let result = tokio_test::block_on(service.scan_port("10.1.1.1", 22, 1.0)).unwrap();
        assert_eq!(result.status, PortStatus::Closed);
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let service = ProbeService::new();

        let err = service.scan_port_range("127.0.0.1", 10, 5, 1.0, 1).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid port range: Start port 10 cannot be greater than end port 5"
        );

        let err = service.ping("127.0.0.1", 1.0, 4000, None).await.unwrap_err();
        assert_eq!(
            err,
            PingError::InvalidInput(ValidationError::BadPacketSize(4000))
        );

        let err = service.scan_ports("127.0.0.1", &[80], 1.0, 0).await.unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidInput(ValidationError::BadConcurrency(0))
        ));
    }

    #[test]
    fn test_ping_result_json_round_trip() -> anyhow::Result<()> {
        let ok = PingResult::succeeded(3.25, Some(64), Some(56))?;
        let json = serde_json::to_string(&ok)?;
        let back: PingResult = serde_json::from_str(&json)?;
        assert_eq!(back, ok);
        Ok(())
    }

    #[test]
    fn test_inconsistent_ping_result_rejected_on_deserialize() {
        let json = r#"{"success":true,"response_time_ms":null,"error_message":null,"ttl":null,"packet_size":null}"#;
        assert!(serde_json::from_str::<PingResult>(json).is_err());

        let json = r#"{"success":false,"response_time_ms":2.0,"error_message":"x","ttl":null,"packet_size":null}"#;
        assert!(serde_json::from_str::<PingResult>(json).is_err());
    }

    #[test]
    fn test_out_of_range_values_rejected_on_deserialize() {
        assert!(serde_json::from_str::<PortRange>(r#"{"start":443,"end":80}"#).is_err());
        assert!(serde_json::from_str::<netprobe::Port>("0").is_err());

        let result: anyhow::Result<PortScanResult> = serde_json::from_str(
            r#"{"port":70000,"status":"open","response_time":null,"service":null,"error_message":null,"scanned_at":"2024-01-01T00:00:00Z"}"#,
        )
        .map_err(Into::into);
        assert!(result.is_err());
    }
}
