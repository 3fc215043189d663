//! Well-known TCP service names

use crate::types::Port;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static TCP_SERVICES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut services = HashMap::new();
    services.insert(21, "FTP");
    services.insert(22, "SSH");
    services.insert(23, "Telnet");
    services.insert(25, "SMTP");
    services.insert(53, "DNS");
    services.insert(80, "HTTP");
    services.insert(110, "POP3");
    services.insert(143, "IMAP");
    services.insert(443, "HTTPS");
    services.insert(993, "IMAPS");
    services.insert(995, "POP3S");
    services.insert(3306, "MySQL");
    services.insert(3389, "RDP");
    services.insert(5432, "PostgreSQL");
    services.insert(6379, "Redis");
    services.insert(27017, "MongoDB");
    services
});

/// Service name for an open TCP port, if the port is in the table
pub fn service_name(port: Port) -> Option<&'static str> {
    TCP_SERVICES.get(&port.value()).copied()
}
