//! ICMP socket management and operations

use crate::error::{ping_error_from_io, PingError};
use crate::network::frame::{FrameLayout, OsFamily, SocketMode};
use crate::types::IpVersion;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, UdpSocket};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

/// Non-blocking ICMP or ICMPv6 socket owned by a single probe
pub struct IcmpSocket {
    socket: Socket,
    version: IpVersion,
    mode: SocketMode,
    layout: FrameLayout,
}

impl IcmpSocket {
    /// Open a raw socket, falling back to an unprivileged datagram ICMP
    /// socket when raw access is refused.
    ///
    /// Linux datagram ICMP sockets only queue echo replies. Time-exceeded
    /// and unreachable messages go to the `IP_RECVERR` error queue, which is
    /// not read, so an unprivileged probe reports those cases as a timeout.
    pub fn open(version: IpVersion) -> Result<Self, PingError> {
        let (domain, protocol) = match version {
            IpVersion::V4 => (Domain::IPV4, Protocol::ICMPV4),
            IpVersion::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };

        let (socket, mode) = match Socket::new(domain, Type::from(libc::SOCK_RAW), Some(protocol)) {
            Ok(socket) => (socket, SocketMode::Raw),
            Err(raw_err) if is_refused(&raw_err) => {
                log::warn!(
                    "Raw ICMPv{} socket refused ({}), trying datagram ICMP socket",
                    version.number(),
                    raw_err
                );
                match Socket::new(domain, Type::DGRAM, Some(protocol)) {
                    Ok(socket) => (socket, SocketMode::Datagram),
                    Err(dgram_err) => {
                        return Err(PingError::Permission(format!(
                            "raw socket: {}; datagram socket: {}",
                            raw_err, dgram_err
                        )))
                    }
                }
            }
            Err(e) => return Err(ping_error_from_io("Failed to create ICMP socket", &e)),
        };

        socket
            .set_nonblocking(true)
            .map_err(|e| ping_error_from_io("Failed to set non-blocking mode", &e))?;

        let layout = FrameLayout::resolve(OsFamily::current(), mode, version);
        log::debug!("Opened ICMPv{} {:?} socket, layout {:?}", version.number(), mode, layout);

        Ok(Self {
            socket,
            version,
            mode,
            layout,
        })
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn mode(&self) -> SocketMode {
        self.mode
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Set the IPv4 TTL or the IPv6 unicast hop limit
    pub fn set_ttl(&self, ttl: u8) -> io::Result<()> {
        match self.version {
            IpVersion::V4 => self.socket.set_ttl(u32::from(ttl)),
            IpVersion::V6 => self.socket.set_unicast_hops_v6(u32::from(ttl)),
        }
    }

    pub fn send_to(&self, packet: &[u8], destination: IpAddr) -> io::Result<usize> {
        let address = SockAddr::from(SocketAddr::new(destination, 0));
        self.socket.send_to(packet, &address)
    }

    /// Wait up to `wait` for the socket to become readable.
    ///
    /// Returns `Ok(false)` on timeout or when interrupted by a signal.
    pub fn wait_readable(&self, wait: Duration) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // round up so a sub-millisecond remainder still waits
        let millis = ((wait.as_micros() + 999) / 1000).min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `fds` is a valid pollfd for the duration of the call and
        // the count passed is 1.
        let rc = unsafe { libc::poll(&mut fds, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(rc > 0 && (fds.revents & libc::POLLIN) != 0)
    }

    /// Receive one datagram; `Ok(None)` when nothing is queued
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, Option<IpAddr>)>> {
        // SAFETY: `MaybeUninit<u8>` has the same layout as `u8` and the
        // kernel only ever writes initialised bytes into the buffer.
        let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };

        match self.socket.recv_from(uninit) {
            Ok((size, from)) => Ok(Some((size, from.as_socket().map(|a| a.ip())))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Local port of the socket, which Linux datagram ICMP sockets use as the
    /// echo identifier once bound
    pub fn local_port(&self) -> Option<u16> {
        self.socket
            .local_addr()
            .ok()?
            .as_socket()
            .map(|address| address.port())
            .filter(|port| *port != 0)
    }
}

fn is_refused(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
        || matches!(e.raw_os_error(), Some(libc::EPERM) | Some(libc::EACCES))
}

/// Source address the kernel would pick to reach `destination`, for the
/// ICMPv6 pseudo-header. Falls back to `::1`.
pub fn ipv6_source_for(destination: Ipv6Addr) -> Ipv6Addr {
    let probe = || -> io::Result<Ipv6Addr> {
        let udp = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))?;
        udp.connect((destination, 9))?;
        match udp.local_addr()? {
            SocketAddr::V6(local) => Ok(*local.ip()),
            SocketAddr::V4(_) => Err(io::Error::from(io::ErrorKind::AddrNotAvailable)),
        }
    };
    match probe() {
        Ok(source) => source,
        Err(e) => {
            log::debug!("No IPv6 route to {} ({}), using ::1 as source", destination, e);
            Ipv6Addr::LOCALHOST
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_detection() {
        assert!(is_refused(&io::Error::from_raw_os_error(libc::EPERM)));
        assert!(is_refused(&io::Error::from_raw_os_error(libc::EACCES)));
        assert!(!is_refused(&io::Error::from_raw_os_error(libc::EINVAL)));
    }

    #[test]
    fn test_loopback_source_for_loopback() {
        // hosts without IPv6 fall back to ::1 as well
        assert_eq!(ipv6_source_for(Ipv6Addr::LOCALHOST), Ipv6Addr::LOCALHOST);
    }

    #[test]
    fn test_open_and_wait() {
        let socket = match IcmpSocket::open(IpVersion::V4) {
            Ok(socket) => socket,
            Err(e) => {
                println!("Skipping ICMP socket test: {}", e);
                return;
            }
        };
        assert_eq!(socket.version(), IpVersion::V4);
        // raw sockets see all ICMP traffic, so a datagram may be queued
        let mut buf = [0u8; 64];
        assert!(matches!(socket.recv_from(&mut buf), Ok(None) | Ok(Some(_))));
        assert!(socket.wait_readable(Duration::from_millis(1)).is_ok());
    }
}
