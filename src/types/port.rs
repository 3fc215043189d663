//! Port and port range value types

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A TCP/UDP port number in 1..=65535
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u16")]
pub struct Port(u16);

/// IANA port number category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortCategory {
    WellKnown,
    Registered,
    Dynamic,
}

impl PortCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortCategory::WellKnown => "well-known",
            PortCategory::Registered => "registered",
            PortCategory::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for PortCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Port {
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        match u16::try_from(value) {
            Ok(port) if port >= 1 => Ok(Self(port)),
            _ => Err(ValidationError::BadPort(value)),
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// 1-1023
    pub fn is_well_known(&self) -> bool {
        (1..=1023).contains(&self.0)
    }

    /// 1024-49151
    pub fn is_registered(&self) -> bool {
        (1024..=49151).contains(&self.0)
    }

    /// 49152-65535
    pub fn is_dynamic(&self) -> bool {
        self.0 >= 49152
    }

    pub fn category(&self) -> PortCategory {
        if self.is_well_known() {
            PortCategory::WellKnown
        } else if self.is_registered() {
            PortCategory::Registered
        } else {
            PortCategory::Dynamic
        }
    }
}

impl TryFrom<u32> for Port {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Port::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inclusive range of ports, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

/// Well-known ports, the range behind `scan_common_ports`
pub const COMMON_PORTS: PortRange = PortRange {
    start: Port(1),
    end: Port(1023),
};

pub const REGISTERED_PORTS: PortRange = PortRange {
    start: Port(1024),
    end: Port(49151),
};

pub const DYNAMIC_PORTS: PortRange = PortRange {
    start: Port(49152),
    end: Port(65535),
};

pub const ALL_PORTS: PortRange = PortRange {
    start: Port(1),
    end: Port(65535),
};

impl PortRange {
    pub fn new(start: Port, end: Port) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::BadPortRange {
                start: start.value(),
                end: end.value(),
            });
        }
        Ok(Self { start, end })
    }

    /// Build a range straight from raw numbers, validating both ends
    pub fn from_numbers(start: u32, end: u32) -> Result<Self, ValidationError> {
        Self::new(Port::new(start)?, Port::new(end)?)
    }

    pub fn start(&self) -> Port {
        self.start
    }

    pub fn end(&self) -> Port {
        self.end
    }

    pub fn count(&self) -> usize {
        usize::from(self.end.0) - usize::from(self.start.0) + 1
    }

    pub fn contains(&self, port: Port) -> bool {
        self.start <= port && port <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }

    pub fn ports(&self) -> Vec<Port> {
        self.iter().collect()
    }
}

impl IntoIterator for PortRange {
    type Item = Port;
    type IntoIter = std::iter::Map<std::ops::RangeInclusive<u16>, fn(u16) -> Port>;

    fn into_iter(self) -> Self::IntoIter {
        (self.start.0..=self.end.0).map(Port as fn(u16) -> Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl<'de> Deserialize<'de> for PortRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            start: Port,
            end: Port,
        }
        let raw = Raw::deserialize(deserializer)?;
        PortRange::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}
