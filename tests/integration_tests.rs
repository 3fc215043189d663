//! Integration tests for the probing façade

use async_trait::async_trait;
use netprobe::{
    Connector, IpAddress, PacketSize, PingError, PingResult, PingService, PortStatus,
    ProbeConfig, ProbeService, TcpConnectScanner, TimeToLive, Timeout,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

/// Completes each connect after a per-port delay, so completion order
/// differs from request order
struct DelayedConnector;

#[async_trait]
impl Connector for DelayedConnector {
    async fn connect(&self, address: SocketAddr, _timeout: Duration) -> io::Result<()> {
        let delay = match address.port() {
            443 => 30,
            22 => 10,
            80 => 20,
            _ => 0,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        match address.port() {
            22 | 443 => Ok(()),
            _ => Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
        }
    }
}

/// Answers every ping and records the parameters it was called with
#[derive(Default)]
struct RecordingPinger {
    calls: Mutex<Vec<(String, f64, u16, Option<u8>)>>,
}

#[async_trait]
impl PingService for RecordingPinger {
    async fn ping(
        &self,
        destination: &IpAddress,
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<PingResult, PingError> {
        self.calls.lock().unwrap().push((
            destination.to_string(),
            timeout.seconds(),
            packet_size.value(),
            ttl.map(|t| t.value()),
        ));
        if destination.is_loopback() {
            Ok(PingResult::succeeded(0.5, ttl.map(|t| t.value()), Some(packet_size.value())).unwrap())
        } else {
            Err(PingError::Timeout(timeout.seconds()))
        }
    }

    async fn ping_multiple(
        &self,
        destinations: &[IpAddress],
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<Vec<PingResult>, PingError> {
        let mut results = Vec::new();
        for destination in destinations {
            results.push(match self.ping(destination, timeout, packet_size, ttl).await {
                Ok(result) => result,
                Err(e) => PingResult::from_error(&e, None, Some(packet_size.value())),
            });
        }
        Ok(results)
    }
}

fn service() -> ProbeService<RecordingPinger, TcpConnectScanner<DelayedConnector>> {
    ProbeService::with_engines(
        RecordingPinger::default(),
        TcpConnectScanner::with_connector(DelayedConnector),
    )
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_results_follow_input_order() {
        let results = service()
            .scan_ports("10.0.0.5", &[443, 22, 80], 1.0, 3)
            .await
            .unwrap();

        let ports: Vec<u16> = results.iter().map(|r| r.port.value()).collect();
        assert_eq!(ports, vec![443, 22, 80]);
        assert_eq!(results[0].status, PortStatus::Open);
        assert_eq!(results[0].service.as_deref(), Some("HTTPS"));
        assert_eq!(results[1].service.as_deref(), Some("SSH"));
        assert_eq!(results[2].status, PortStatus::Closed);
    }

    #[tokio::test]
    async fn test_range_summary_through_facade() {
        let summary = service()
            .scan_port_range("10.0.0.5", 20, 25, 1.0, 2)
            .await
            .unwrap();

        assert_eq!(summary.port_range, "20-25");
        assert_eq!(summary.open_ports, 1);
        assert_eq!(summary.closed_ports, 5);
        assert!(summary.to_string().contains("1 open"));
    }

    #[tokio::test]
    async fn test_ping_passes_typed_values() {
        let service = service();
        let result = service.ping("  127.0.0.1 ", 1.5, 64, Some(12)).await.unwrap();

        assert!(result.success());
        assert_eq!(result.ttl(), Some(12));
        let calls = service_calls(&service);
        assert_eq!(calls, vec![("127.0.0.1".to_string(), 1.5, 64, Some(12))]);
    }

    #[tokio::test]
    async fn test_ping_host_uses_config_defaults() {
        let service = service().with_config(ProbeConfig::default().with_ttl(Some(30)));
        service.ping_host("::1").await.unwrap();

        let calls = service_calls(&service);
        assert_eq!(calls, vec![("::1".to_string(), 4.0, 56, Some(30))]);
    }

    #[tokio::test]
    async fn test_ping_multiple_reports_failures_in_place() {
        let results = service()
            .ping_multiple(&["127.0.0.1", "192.0.2.1", "::1"], 1.0, 56, None)
            .await
            .unwrap();

        let successes: Vec<bool> = results.iter().map(|r| r.success()).collect();
        assert_eq!(successes, vec![true, false, true]);
        assert_eq!(
            results[1].error_message(),
            Some("Ping timeout after 1 seconds")
        );
    }

    #[tokio::test]
    async fn test_scan_host_common_ports_uses_config() {
        let service = service().with_config(ProbeConfig::default().with_max_concurrent(16));
        let summary = service.scan_host_common_ports("10.0.0.5").await.unwrap();

        assert_eq!(summary.total_ports, 1023);
        let open: Vec<u16> = summary.open_ports_list().iter().map(|r| r.port.value()).collect();
        assert_eq!(open, vec![22, 443]);
    }

    fn service_calls(
        service: &ProbeService<RecordingPinger, TcpConnectScanner<DelayedConnector>>,
    ) -> Vec<(String, f64, u16, Option<u8>)> {
        service.pinger().calls.lock().unwrap().clone()
    }
}
