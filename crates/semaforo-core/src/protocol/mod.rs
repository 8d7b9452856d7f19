//! Protocol module containing the broker frame parser and the trigger topics.

pub mod frame;
pub mod topics;

pub use frame::{
    encode_connect, encode_disconnect, encode_ping_request, encode_publish, parse_frame, Frame,
    ProtocolError, CONNACK, PINGRESP,
};
pub use topics::{is_trigger_topic, TRIGGER_TOPICS};
