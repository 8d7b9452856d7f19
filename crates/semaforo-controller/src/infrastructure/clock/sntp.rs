//! Periodic SNTP clock synchronisation.
//!
//! Sends a single 48-byte SNTP v3 client request over UDP and reads the
//! server's transmit timestamp from the reply:
//!
//! ```text
//! byte 0        LI (2 bits) | VN (3 bits) | Mode (3 bits)   0x1B = v3, client
//! byte 1        stratum (0 = kiss-of-death)
//! bytes 40..44  transmit timestamp, seconds since 1900-01-01 (BE)
//! bytes 44..48  transmit timestamp, fraction of a second (BE)
//! ```
//!
//! A failed sync is logged and retried on the next interval; it never stops
//! the controller.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::WallClock;
use crate::application::state::SharedState;

/// Well-known SNTP port.
pub const NTP_PORT: u16 = 123;
/// How long one query waits for the server's reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const PACKET_LEN: usize = 48;
const CLIENT_REQUEST: u8 = 0x1B;
const MODE_SERVER: u8 = 4;
/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01 (Unix epoch).
const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// The server to query and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SntpServer {
    pub host: String,
    pub port: u16,
    pub reply_timeout: Duration,
}

impl SntpServer {
    /// `host` on [`NTP_PORT`] with the default [`REPLY_TIMEOUT`].
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: NTP_PORT,
            reply_timeout: REPLY_TIMEOUT,
        }
    }
}

/// Errors that can occur during one sync attempt.
#[derive(Debug, Error)]
pub enum ClockSyncError {
    #[error("network error: {0}")]
    Io(#[from] io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("reply too short: {0} bytes")]
    ShortReply(usize),

    #[error("unexpected reply mode {0}")]
    BadMode(u8),

    #[error("server sent kiss-of-death (stratum 0)")]
    KissOfDeath,

    #[error("server time is before the Unix epoch")]
    BeforeUnixEpoch,
}

/// Builds a client request packet.
pub fn build_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_REQUEST;
    packet
}

/// Extracts the server's transmit time from a reply.
pub fn parse_reply(reply: &[u8]) -> Result<SystemTime, ClockSyncError> {
    if reply.len() < PACKET_LEN {
        return Err(ClockSyncError::ShortReply(reply.len()));
    }
    let mode = reply[0] & 0x07;
    if mode != MODE_SERVER {
        return Err(ClockSyncError::BadMode(mode));
    }
    if reply[1] == 0 {
        return Err(ClockSyncError::KissOfDeath);
    }

    let secs = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]) as u64;
    let fraction = u32::from_be_bytes([reply[44], reply[45], reply[46], reply[47]]) as u64;
    let unix_secs = secs
        .checked_sub(NTP_UNIX_OFFSET_SECS)
        .ok_or(ClockSyncError::BeforeUnixEpoch)?;
    let nanos = (fraction * 1_000_000_000) >> 32;

    Ok(UNIX_EPOCH + Duration::from_secs(unix_secs) + Duration::from_nanos(nanos))
}

/// Milliseconds to add to the local clock to match `server_time`.
pub fn offset_ms(server_time: SystemTime, local_time: SystemTime) -> i64 {
    match server_time.duration_since(local_time) {
        Ok(ahead) => ahead.as_millis() as i64,
        Err(behind) => -(behind.duration().as_millis() as i64),
    }
}

/// Queries `server` once and returns the offset to apply, in milliseconds.
pub async fn query_offset(server: &SntpServer) -> Result<i64, ClockSyncError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
    socket.connect((server.host.as_str(), server.port)).await?;
    socket.send(&build_request()).await?;

    let mut reply = [0u8; PACKET_LEN];
    let n = timeout(server.reply_timeout, socket.recv(&mut reply))
        .await
        .map_err(|_| ClockSyncError::Timeout(server.reply_timeout))??;
    let server_time = parse_reply(&reply[..n])?;
    Ok(offset_ms(server_time, SystemTime::now()))
}

/// Syncs `clock` against `server` every `interval` until `running` is cleared.
///
/// The first sync happens immediately.  A failed attempt is logged and the
/// loop waits for the next tick.
pub async fn run_clock_sync(
    server: SntpServer,
    interval: Duration,
    clock: Arc<WallClock>,
    state: Arc<SharedState>,
    running: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        debug!("NTP: querying {}:{}", server.host, server.port);
        match query_offset(&server).await {
            Ok(offset) => {
                clock.set_offset_ms(offset);
                state.log(format!("NTP: clock updated (offset {offset} ms)"));
            }
            Err(e) => {
                warn!("NTP sync against {} failed: {e}", server.host);
                state.log(format!("NTP error: {e}"));
            }
        }
    }
}
