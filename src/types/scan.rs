//! Port scan results and summaries

use crate::types::port::Port;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Port state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
    Unfiltered,
    OpenFiltered,
    ClosedFiltered,
}

impl PortStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortStatus::Open => "open",
            PortStatus::Closed => "closed",
            PortStatus::Filtered => "filtered",
            PortStatus::Unfiltered => "unfiltered",
            PortStatus::OpenFiltered => "open_filtered",
            PortStatus::ClosedFiltered => "closed_filtered",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PortStatus::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PortStatus::Closed)
    }

    /// Every state that is neither a definite open nor a definite closed
    pub fn is_filtered(&self) -> bool {
        !self.is_open() && !self.is_closed()
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan result for a single port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortScanResult {
    pub port: Port,
    pub status: PortStatus,
    pub response_time: Option<Duration>,
    pub service: Option<String>,
    pub error_message: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl PortScanResult {
    pub fn new(port: Port, status: PortStatus, scanned_at: DateTime<Utc>) -> Self {
        Self {
            port,
            status,
            response_time: None,
            service: None,
            error_message: None,
            scanned_at,
        }
    }

    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = Some(response_time);
        self
    }

    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.service = service;
        self
    }

    pub fn with_error(mut self, message: String) -> Self {
        self.error_message = Some(message);
        self
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    pub fn is_filtered(&self) -> bool {
        self.status.is_filtered()
    }
}

impl fmt::Display for PortScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.status)?;
        if let Some(ref service) = self.service {
            write!(f, " ({})", service)?;
        }
        if let Some(rt) = self.response_time {
            write!(f, " {:.3}s", rt.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Aggregate of a multi-port scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortScanSummary {
    pub target: String,
    pub port_range: String,
    pub total_ports: usize,
    pub open_ports: usize,
    pub closed_ports: usize,
    pub filtered_ports: usize,
    pub scan_duration: Duration,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<PortScanResult>,
}

impl PortScanSummary {
    /// Build a summary whose counts are derived from `results`
    pub fn from_results(
        target: String,
        port_range: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        scan_duration: Duration,
        results: Vec<PortScanResult>,
    ) -> Self {
        let open_ports = results.iter().filter(|r| r.is_open()).count();
        let closed_ports = results.iter().filter(|r| r.is_closed()).count();
        let filtered_ports = results.iter().filter(|r| r.is_filtered()).count();

        Self {
            target,
            port_range,
            total_ports: results.len(),
            open_ports,
            closed_ports,
            filtered_ports,
            scan_duration,
            started_at,
            completed_at,
            results,
        }
    }

    pub fn open_ports_list(&self) -> Vec<&PortScanResult> {
        self.results.iter().filter(|r| r.is_open()).collect()
    }

    pub fn closed_ports_list(&self) -> Vec<&PortScanResult> {
        self.results.iter().filter(|r| r.is_closed()).collect()
    }

    pub fn filtered_ports_list(&self) -> Vec<&PortScanResult> {
        self.results.iter().filter(|r| r.is_filtered()).collect()
    }

    /// Share of ports with a definite open or closed answer
    pub fn success_rate(&self) -> f64 {
        if self.total_ports == 0 {
            return 0.0;
        }
        (self.open_ports + self.closed_ports) as f64 / self.total_ports as f64
    }
}

impl fmt::Display for PortScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Port scan of {} ({}): {} open, {} closed, {} filtered in {:.2}s",
            self.target,
            self.port_range,
            self.open_ports,
            self.closed_ports,
            self.filtered_ports,
            self.scan_duration.as_secs_f64()
        )
    }
}
