//! Decides what to do with one read's worth of bytes from a client.
//!
//! The listener calls [`FrameDispatcher::dispatch`] for every read, including
//! the first one after accept, so a connection is handled the same way no
//! matter how many frames it has already sent.

use std::net::SocketAddr;
use std::sync::Arc;

use semaforo_core::protocol::{is_trigger_topic, CONNACK, PINGRESP};
use semaforo_core::{parse_frame, Frame};
use tracing::{debug, warn};

use crate::application::sequence::SequenceController;
use crate::application::state::SharedState;

/// What the listener should do after a frame has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading.
    Continue,
    /// Write these bytes back to the client, then keep reading.
    Reply(&'static [u8]),
}

/// Routes parsed frames to the trigger gate and the sequence controller.
#[derive(Clone)]
pub struct FrameDispatcher {
    state: Arc<SharedState>,
    sequence: Arc<SequenceController>,
}

impl FrameDispatcher {
    pub fn new(state: Arc<SharedState>, sequence: Arc<SequenceController>) -> Self {
        Self { state, sequence }
    }

    /// Handles one buffer read from `peer`.
    ///
    /// No frame ends the connection; only the peer closing the socket, an
    /// I/O error or the idle deadline does.
    pub fn dispatch(&self, bytes: &[u8], peer: SocketAddr) -> Action {
        let ip = peer.ip();
        let frame = match parse_frame(bytes) {
            Ok(frame) => frame,
            Err(e) if e.is_malformed() => {
                warn!("malformed frame from {peer}: {e}");
                self.state.log(format!("Malformed frame from {ip}: {e}"));
                return Action::Continue;
            }
            Err(e) => {
                debug!("ignoring frame from {peer}: {e}");
                return Action::Continue;
            }
        };
        debug!("{} from {peer}", frame.kind());

        match frame {
            Frame::Connect => Action::Reply(&CONNACK),
            Frame::PingRequest => Action::Reply(&PINGRESP),
            Frame::Publish { topic, payload } => {
                self.state.log(format!(
                    "Topic received: '{topic}' with payload '{}' (IP: {ip})",
                    String::from_utf8_lossy(&payload)
                ));
                if is_trigger_topic(&topic) {
                    self.on_trigger(peer);
                }
                Action::Continue
            }
            Frame::Unknown { packet_type } => {
                self.state
                    .log(format!("Unsupported packet type 0x{packet_type:02X} from {ip}"));
                Action::Continue
            }
        }
    }

    fn on_trigger(&self, peer: SocketAddr) {
        let ip = peer.ip();
        let now = tokio::time::Instant::now().into_std();
        if self.state.try_accept_trigger(now) {
            self.state
                .log(format!("Trigger received via MQTT from {ip}"));
            self.sequence.trigger();
        } else {
            self.state
                .log(format!("Ignoring duplicate command from {ip}"));
        }
    }
}
