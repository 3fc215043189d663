// Core module - Fundamental traits
pub mod probe_trait;

pub use probe_trait::{PingService, PortScanService};
