//! Scanner module containing the TCP connect-scan engine

pub mod connector;
pub mod engine;
pub mod services;

pub use connector::{Connector, TokioConnector};
pub use engine::TcpConnectScanner;
pub use services::service_name;
