//! ICMP echo engine
//!
//! Every probe owns its socket and runs on tokio's blocking pool. The wait
//! for a reply is a loop of short readiness waits, so both the probe's own
//! timeout and caller cancellation are honoured within one slice.

use crate::core::PingService;
use crate::error::{ping_error_from_io, PingError};
use crate::network::frame::SocketMode;
use crate::network::packet::{unix_timestamp, EchoRequestBuilder, ReplyClass, ReplyMatcher};
use crate::network::socket::{ipv6_source_for, IcmpSocket};
use crate::types::{IpAddress, IpVersion, PacketSize, PingResult, TimeToLive, Timeout};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Upper bound on a single readiness wait
const POLL_SLICE: Duration = Duration::from_millis(50);
/// Large enough for an IPv4 header, a quoted header and a 1500 byte payload
const RECV_BUFFER_LEN: usize = 4096;

/// Derive a 16-bit echo identifier from the process id, the calling thread
/// and the current time. No state is shared between calls.
pub fn generate_identifier() -> u16 {
    let mut hasher = DefaultHasher::new();
    std::process::id().hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
        .hash(&mut hasher);

    let h = hasher.finish();
    (h ^ (h >> 16) ^ (h >> 32) ^ (h >> 48)) as u16
}

/// One outstanding echo request
struct EchoProbe {
    destination: IpAddr,
    version: IpVersion,
    timeout: Timeout,
    payload_size: usize,
    ttl: Option<u8>,
}

impl EchoProbe {
    /// Blocking send and wait; returns the round trip in milliseconds
    fn run(self, cancel: &CancellationToken) -> Result<f64, PingError> {
        let socket = IcmpSocket::open(self.version)?;

        if let Some(ttl) = self.ttl {
            if let Err(e) = socket.set_ttl(ttl) {
                log::warn!("TTL option unsupported ({}), probing without it", e);
            }
        }

        let identifier = generate_identifier();
        let mut builder = EchoRequestBuilder::new(self.version, identifier, self.payload_size);
        if let IpAddr::V6(destination) = self.destination {
            builder = builder.ipv6_route(ipv6_source_for(destination), destination);
        }
        let request = builder.build();

        let started = Instant::now();
        socket
            .send_to(&request, self.destination)
            .map_err(|e| ping_error_from_io("Failed to send echo request", &e))?;
        log::debug!(
            "Sent echo request to {} (id {:#06x}, {} bytes)",
            self.destination,
            identifier,
            request.len()
        );

        let mut matcher = ReplyMatcher::new(self.version, socket.layout(), identifier, 0);
        if socket.mode() == SocketMode::Datagram {
            if let Some(port) = socket.local_port() {
                matcher = matcher.also_accept(port);
            }
        }

        await_reply(&socket, &matcher, self.destination, self.timeout, started, cancel)
    }
}

/// Where a probe's replies come from
trait ReplySource {
    /// Wait up to `wait` for a datagram; `Ok(false)` when none arrived
    fn wait_readable(&self, wait: Duration) -> io::Result<bool>;

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, Option<IpAddr>)>>;
}

impl ReplySource for IcmpSocket {
    fn wait_readable(&self, wait: Duration) -> io::Result<bool> {
        IcmpSocket::wait_readable(self, wait)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, Option<IpAddr>)>> {
        IcmpSocket::recv_from(self, buf)
    }
}

/// Read from `source` until `matcher` recognises an answer to the request
/// sent at `started`, the timeout budget runs out or `cancel` fires
fn await_reply<R: ReplySource>(
    source: &R,
    matcher: &ReplyMatcher,
    destination: IpAddr,
    timeout: Timeout,
    started: Instant,
    cancel: &CancellationToken,
) -> Result<f64, PingError> {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    loop {
        if cancel.is_cancelled() {
            return Err(PingError::Cancelled);
        }
        let remaining = match timeout.as_duration().checked_sub(started.elapsed()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => return Err(PingError::Timeout(timeout.seconds())),
        };

        let readable = source
            .wait_readable(remaining.min(POLL_SLICE))
            .map_err(|e| ping_error_from_io("Failed waiting for echo reply", &e))?;
        if !readable {
            continue;
        }

        let (len, from) = match source
            .recv_from(&mut buf)
            .map_err(|e| ping_error_from_io("Failed to receive echo reply", &e))?
        {
            Some(received) => received,
            None => continue,
        };
        let received_at = unix_timestamp();
        let from = from.unwrap_or(destination);

        match matcher.classify(&buf[..len]) {
            ReplyClass::EchoReply { sent_at } => {
                let rtt_ms = ((received_at - sent_at) * 1000.0).max(0.0);
                log::debug!("Echo reply from {} in {:.3}ms", from, rtt_ms);
                return Ok(rtt_ms);
            }
            ReplyClass::TimeExceeded => {
                log::debug!("Time exceeded reported by {}", from);
                return Err(PingError::TimeExceeded);
            }
            ReplyClass::Unreachable { code } => {
                log::debug!("Destination unreachable reported by {} (code {})", from, code);
                return Err(PingError::DestinationUnreachable(format!(
                    "{} reported code {}",
                    from, code
                )));
            }
            ReplyClass::Unrelated => {
                log::debug!("Ignoring unrelated {} byte ICMP packet from {}", len, from);
            }
        }
    }
}

/// ICMP pinger using one short-lived socket per probe
#[derive(Debug, Clone, Default)]
pub struct IcmpPinger;

impl IcmpPinger {
    pub fn new() -> Self {
        Self
    }

    /// Ping `destination`, giving up with [`PingError::Cancelled`] once
    /// `cancel` fires.
    ///
    /// Dropping the returned future cancels the probe as well.
    pub async fn ping_with_cancel(
        &self,
        destination: &IpAddress,
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
        cancel: &CancellationToken,
    ) -> Result<PingResult, PingError> {
        let probe = EchoProbe {
            destination: destination.addr(),
            version: destination.version(),
            timeout,
            payload_size: packet_size.bytes(),
            ttl: ttl.map(|t| t.value()),
        };

        let worker_token = cancel.child_token();
        let _guard = worker_token.clone().drop_guard();
        let rtt_ms = tokio::task::spawn_blocking(move || probe.run(&worker_token)).await??;

        PingResult::succeeded(rtt_ms, ttl.map(|t| t.value()), Some(packet_size.value()))
            .map_err(|e| PingError::Network(e.to_string()))
    }
}

#[async_trait]
impl PingService for IcmpPinger {
    async fn ping(
        &self,
        destination: &IpAddress,
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<PingResult, PingError> {
        self.ping_with_cancel(destination, timeout, packet_size, ttl, &CancellationToken::new())
            .await
    }

    async fn ping_multiple(
        &self,
        destinations: &[IpAddress],
        timeout: Timeout,
        packet_size: PacketSize,
        ttl: Option<TimeToLive>,
    ) -> Result<Vec<PingResult>, PingError> {
        log::info!("Pinging {} destinations", destinations.len());

        let probes = destinations.iter().map(|destination| async move {
            match self.ping(destination, timeout, packet_size, ttl).await {
                Ok(result) => Ok(result),
                Err(e) if e.is_call_fatal() => Err(e),
                Err(e) => {
                    log::debug!("Ping to {} failed: {}", destination, e);
                    Ok(PingResult::from_error(
                        &e,
                        ttl.map(|t| t.value()),
                        Some(packet_size.value()),
                    ))
                }
            }
        });

        try_join_all(probes).await
    }
}
