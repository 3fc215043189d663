//! Per-probe limits: timeout, packet size and time to live

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const MAX_TIMEOUT_SECS: f64 = 300.0;
const MIN_PACKET_SIZE: u32 = 8;
const MAX_PACKET_SIZE: u32 = 1500;

/// Time budget of a single probe, in seconds, within (0, 300]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Timeout(f64);

impl Timeout {
    pub fn new(seconds: f64) -> Result<Self, ValidationError> {
        // NaN fails both comparisons
        if !(seconds > 0.0 && seconds <= MAX_TIMEOUT_SECS) {
            return Err(ValidationError::BadTimeout(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.0)
    }
}

impl TryFrom<f64> for Timeout {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Timeout::new(value)
    }
}

impl From<Timeout> for f64 {
    fn from(t: Timeout) -> Self {
        t.0
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.0)
    }
}

/// ICMP payload size in bytes, within [8, 1500].
///
/// Eight bytes is the room needed for the send timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PacketSize(u16);

impl PacketSize {
    pub fn new(bytes: u32) -> Result<Self, ValidationError> {
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&bytes) {
            return Err(ValidationError::BadPacketSize(bytes));
        }
        Ok(Self(bytes as u16))
    }

    pub fn bytes(&self) -> usize {
        usize::from(self.0)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u32> for PacketSize {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PacketSize::new(value)
    }
}

impl From<PacketSize> for u32 {
    fn from(p: PacketSize) -> Self {
        u32::from(p.0)
    }
}

impl fmt::Display for PacketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// IP hop limit, within [1, 255]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeToLive(u8);

impl TimeToLive {
    pub fn new(hops: u32) -> Result<Self, ValidationError> {
        match u8::try_from(hops) {
            Ok(ttl) if ttl >= 1 => Ok(Self(ttl)),
            _ => Err(ValidationError::BadTimeToLive(hops)),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for TimeToLive {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        TimeToLive::new(value)
    }
}

impl From<TimeToLive> for u32 {
    fn from(t: TimeToLive) -> Self {
        u32::from(t.0)
    }
}

impl fmt::Display for TimeToLive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hops", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_bounds() {
        assert!(Timeout::new(0.0).is_err());
        assert!(Timeout::new(-1.0).is_err());
        assert!(Timeout::new(300.5).is_err());
        assert!(Timeout::new(f64::NAN).is_err());
        assert_eq!(Timeout::new(300.0).unwrap().seconds(), 300.0);
        assert_eq!(
            Timeout::new(0.25).unwrap().as_duration(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_packet_size_bounds() {
        assert!(PacketSize::new(7).is_err());
        assert!(PacketSize::new(1501).is_err());
        assert_eq!(PacketSize::new(8).unwrap().bytes(), 8);
        assert_eq!(PacketSize::new(1500).unwrap().bytes(), 1500);
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(TimeToLive::new(0).is_err());
        assert!(TimeToLive::new(256).is_err());
        assert_eq!(TimeToLive::new(1).unwrap().value(), 1);
        assert_eq!(TimeToLive::new(255).unwrap().value(), 255);
    }
}
