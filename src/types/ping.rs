//! Outcome of one ICMP echo probe

use crate::error::{PingError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a ping.
///
/// A successful result always carries a non-negative response time and no
/// error message; a failed one carries no response time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPingResult")]
pub struct PingResult {
    success: bool,
    response_time_ms: Option<f64>,
    error_message: Option<String>,
    ttl: Option<u8>,
    packet_size: Option<u16>,
}

#[derive(Deserialize)]
struct RawPingResult {
    success: bool,
    response_time_ms: Option<f64>,
    error_message: Option<String>,
    ttl: Option<u8>,
    packet_size: Option<u16>,
}

impl TryFrom<RawPingResult> for PingResult {
    type Error = ValidationError;

    fn try_from(raw: RawPingResult) -> Result<Self, Self::Error> {
        PingResult::new(
            raw.success,
            raw.response_time_ms,
            raw.error_message,
            raw.ttl,
            raw.packet_size,
        )
    }
}

impl PingResult {
    pub fn new(
        success: bool,
        response_time_ms: Option<f64>,
        error_message: Option<String>,
        ttl: Option<u8>,
        packet_size: Option<u16>,
    ) -> Result<Self, ValidationError> {
        match (success, response_time_ms) {
            (true, None) => {
                return Err(ValidationError::InvalidPingResult(
                    "successful ping must have response time".to_string(),
                ))
            }
            (false, Some(_)) => {
                return Err(ValidationError::InvalidPingResult(
                    "cannot have response time for failed ping".to_string(),
                ))
            }
            _ => {}
        }
        if let Some(rtt) = response_time_ms {
            if !rtt.is_finite() || rtt < 0.0 {
                return Err(ValidationError::InvalidPingResult(format!(
                    "response time must be a non-negative number, got {}",
                    rtt
                )));
            }
        }
        if success && error_message.is_some() {
            return Err(ValidationError::InvalidPingResult(
                "successful ping cannot carry an error message".to_string(),
            ));
        }

        Ok(Self {
            success,
            response_time_ms,
            error_message,
            ttl,
            packet_size,
        })
    }

    pub fn succeeded(
        response_time_ms: f64,
        ttl: Option<u8>,
        packet_size: Option<u16>,
    ) -> Result<Self, ValidationError> {
        Self::new(true, Some(response_time_ms), None, ttl, packet_size)
    }

    pub fn failed(message: impl Into<String>, ttl: Option<u8>, packet_size: Option<u16>) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            error_message: Some(message.into()),
            ttl,
            packet_size,
        }
    }

    /// Failed result describing a per-destination error
    pub fn from_error(error: &PingError, ttl: Option<u8>, packet_size: Option<u16>) -> Self {
        Self::failed(error.to_string(), ttl, packet_size)
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn response_time_ms(&self) -> Option<f64> {
        self.response_time_ms
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn ttl(&self) -> Option<u8> {
        self.ttl
    }

    pub fn packet_size(&self) -> Option<u16> {
        self.packet_size
    }
}

impl fmt::Display for PingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.success, self.response_time_ms) {
            (true, Some(rtt)) => write!(f, "Ping successful: {:.2}ms", rtt),
            _ => write!(
                f,
                "Ping failed: {}",
                self.error_message.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}
