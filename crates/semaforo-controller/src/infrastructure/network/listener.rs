//! Broker listener: accept loop and per-connection handling.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured broker address.
//! 2. Accepting client connections and registering each one in the shared
//!    connection registry.
//! 3. Running one supervised task per connection that reads frames, hands
//!    each read to the [`FrameDispatcher`] and writes back any reply.
//! 4. Closing idle connections after the configured read deadline.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! When the peer closes, resets, fails with an I/O error or goes idle, the
//! task logs how it ended followed by `MQTT disconnected`.  A panic inside
//! the task skips that logging; the registry entry is still removed because
//! it is owned by a drop guard.

use std::io;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use semaforo_core::ConnectionId;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::application::dispatch::{Action, FrameDispatcher};
use crate::application::state::SharedState;
use crate::application::supervisor::TaskSupervisor;

/// Bytes requested from the socket per read.  Each read is parsed as one frame.
pub const READ_BUFFER_SIZE: usize = 1024;

/// How often the accept loop wakes up to check the `running` flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Why a connection ended abnormally.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer reset or aborted the connection.
    #[error("connection reset by peer")]
    Reset,

    /// No bytes arrived within the read deadline.
    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),

    /// Any other socket failure.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Reset,
            _ => Self::Io(e),
        }
    }
}

/// Everything a connection task needs.  Cheap to clone.
#[derive(Clone)]
pub struct ConnectionContext {
    pub dispatcher: FrameDispatcher,
    pub state: Arc<SharedState>,
    pub read_timeout: Duration,
}

/// A bound broker listener that has not started accepting yet.
pub struct BrokerListener {
    listener: TcpListener,
}

// ── Public API ────────────────────────────────────────────────────────────────

impl BrokerListener {
    /// Binds the listener.  Use port 0 to let the OS pick a free port.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until `running` is set to `false`.
    ///
    /// Each accepted connection is handed to `supervisor` as its own task so
    /// one slow or failing client never blocks the others.
    pub async fn run(
        self,
        ctx: ConnectionContext,
        supervisor: TaskSupervisor,
        running: Arc<AtomicBool>,
    ) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("MQTT broker listening on {addr}");
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping broker accept loop");
                break;
            }

            // The timeout lets the loop re-check `running` while idle.
            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("could not set TCP_NODELAY for {peer}: {e}");
                    }
                    let ctx = ctx.clone();
                    supervisor.spawn(format!("connection {peer}"), async move {
                        serve_connection(stream, peer, ctx).await;
                        Ok(())
                    });
                }
                Ok(Err(e)) => {
                    // Transient (e.g. out of file descriptors); keep accepting.
                    error!("accept error: {e}");
                }
                Err(_) => {}
            }
        }
    }
}

/// Serves one client connection from accept to close.
///
/// Registers the connection, runs the read loop, logs how it ended and shuts
/// the stream down.  Generic over the stream type so tests can drive it with
/// scripted I/O.
pub async fn serve_connection<S>(mut stream: S, peer: SocketAddr, ctx: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ip = peer.ip();
    let id = ctx.state.register_connection(peer);
    let _registration = Registration {
        state: Arc::clone(&ctx.state),
        id,
    };
    ctx.state.log(format!("MQTT connected: {ip}"));

    match handle_connection(&mut stream, peer, &ctx).await {
        Ok(()) => debug!("connection {id} from {peer} closed normally"),
        Err(ConnectionError::Reset) => {
            ctx.state.log(format!("Connection reset by client: {ip}"));
        }
        Err(ConnectionError::IdleTimeout(after)) => {
            let secs = after.as_secs();
            ctx.state
                .log(format!("Closing idle connection from {ip} after {secs}s"));
        }
        Err(ConnectionError::Io(e)) => {
            ctx.state.log(format!("MQTT client error {ip}: {e}"));
        }
    }

    // The peer may already be gone; nothing useful to do with a failure here.
    let _ = stream.shutdown().await;
    ctx.state.log(format!("MQTT disconnected: {ip}"));
}

// ── Per-connection read loop ──────────────────────────────────────────────────

/// Reads until the peer closes or an error occurs.
async fn handle_connection<S>(
    stream: &mut S,
    peer: SocketAddr,
    ctx: &ConnectionContext,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = match timeout(ctx.read_timeout, stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => return Err(ConnectionError::IdleTimeout(ctx.read_timeout)),
        };
        if n == 0 {
            return Ok(());
        }

        match ctx.dispatcher.dispatch(&buf[..n], peer) {
            Action::Continue => {}
            Action::Reply(bytes) => {
                stream.write_all(bytes).await?;
                stream.flush().await?;
            }
        }
    }
}

/// Removes the connection from the registry when dropped.
struct Registration {
    state: Arc<SharedState>,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.state.remove_connection(self.id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_kinds_map_to_reset() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ] {
            let err = ConnectionError::from(io::Error::new(kind, "gone"));
            assert!(matches!(err, ConnectionError::Reset), "{kind:?}");
        }
    }

    #[test]
    fn test_other_kinds_map_to_io() {
        let err = ConnectionError::from(io::Error::new(io::ErrorKind::Other, "weird"));
        match err {
            ConnectionError::Io(e) => assert_eq!(e.to_string(), "weird"),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_idle_timeout_display() {
        let err = ConnectionError::IdleTimeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "no data received for 300s");
    }
}
