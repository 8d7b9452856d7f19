//! Records of live broker connections.

use std::net::SocketAddr;

use uuid::Uuid;

/// Identifies one accepted connection.
///
/// The peer address alone is not unique: a client that reconnects quickly can
/// reuse the same address while its previous handler is still shutting down.
pub type ConnectionId = Uuid;

/// A live connection.  Created on accept, removed when its handler exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub peer_address: SocketAddr,
}

impl ConnectionRecord {
    /// Creates a record with a fresh random id.
    pub fn new(peer_address: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_for_same_peer_get_distinct_ids() {
        let peer: SocketAddr = "192.168.0.20:51000".parse().unwrap();
        let a = ConnectionRecord::new(peer);
        let b = ConnectionRecord::new(peer);
        assert_ne!(a.id, b.id);
        assert_eq!(a.peer_address, b.peer_address);
    }
}
