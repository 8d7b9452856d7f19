//! End-to-end test over real sockets.
//!
//! Binds the broker listener on `127.0.0.1:0`, connects a client the way
//! `semaforo-trigger` does, and watches a full (shortened) cycle run.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use semaforo_controller::infrastructure::network::listener::BrokerListener;
use semaforo_core::protocol::{
    encode_connect, encode_disconnect, encode_ping_request, encode_publish, CONNACK, PINGRESP,
};
use semaforo_core::{CycleTimes, SignalState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn short_cycle() -> CycleTimes {
    CycleTimes {
        green: Duration::from_millis(100),
        yellow: Duration::from_millis(100),
        red: Duration::from_millis(200),
    }
}

/// Polls `check` every 10 ms until it holds or two seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn test_trigger_over_tcp_runs_full_cycle() {
    // Arrange: start the listener.
    let harness = Harness::new(short_cycle());
    let listener = BrokerListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(listener.run(
        harness.connection_context(Duration::from_secs(30)),
        harness.supervisor.clone(),
        Arc::clone(&running),
    ));

    // Act: CONNECT, PINGREQ, PUBLISH, DISCONNECT, close.
    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(&encode_connect("e2e", 60).unwrap())
        .await
        .unwrap();
    let mut ack = [0u8; 4];
    timeout(Duration::from_secs(2), client.read_exact(&mut ack))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ack, CONNACK);

    client.write_all(&encode_ping_request()).await.unwrap();
    let mut pong = [0u8; 2];
    timeout(Duration::from_secs(2), client.read_exact(&mut pong))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pong, PINGRESP);

    assert!(eventually(|| harness.state.connection_count() == 1).await);

    client
        .write_all(&encode_publish("semaforo/acao", b"e2e").unwrap())
        .await
        .unwrap();

    // Assert: the run starts and completes.
    assert!(eventually(|| harness.state.is_run_in_progress()).await);
    assert!(eventually(|| !harness.state.is_run_in_progress()).await);
    assert_eq!(
        harness.panel.states(),
        vec![
            SignalState::Green,
            SignalState::Yellow,
            SignalState::Red,
            SignalState::Green
        ]
    );
    assert_eq!(harness.state.signal(), SignalState::Green);

    // DISCONNECT alone does not end the session; closing the socket does.
    client.write_all(&encode_disconnect()).await.unwrap();
    assert!(eventually(|| harness.count_messages("Unsupported packet type 0xE0") == 1).await);
    client.write_all(&encode_ping_request()).await.unwrap();
    timeout(Duration::from_secs(2), client.read_exact(&mut pong))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pong, PINGRESP);
    assert_eq!(harness.state.connection_count(), 1);

    drop(client);
    assert!(eventually(|| harness.state.connection_count() == 0).await);
    assert_eq!(harness.count_messages("MQTT disconnected: 127.0.0.1"), 1);

    // Shutdown: the accept loop notices the flag within one poll interval.
    running.store(false, Ordering::Relaxed);
    timeout(Duration::from_secs(2), server)
        .await
        .expect("accept loop must stop")
        .unwrap();
}

#[tokio::test]
async fn test_abrupt_client_drop_is_cleaned_up() {
    let harness = Harness::new(short_cycle());
    let listener = BrokerListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(listener.run(
        harness.connection_context(Duration::from_secs(30)),
        harness.supervisor.clone(),
        Arc::clone(&running),
    ));

    let clients = connect_clients(addr, 3).await;
    assert!(eventually(|| harness.state.connection_count() == 3).await);

    drop(clients);

    assert!(eventually(|| harness.state.connection_count() == 0).await);
    assert_eq!(harness.count_messages("MQTT disconnected"), 3);

    running.store(false, Ordering::Relaxed);
    timeout(Duration::from_secs(2), server)
        .await
        .unwrap()
        .unwrap();
}

async fn connect_clients(addr: std::net::SocketAddr, n: usize) -> Vec<TcpStream> {
    let mut clients = Vec::with_capacity(n);
    for _ in 0..n {
        clients.push(TcpStream::connect(addr).await.unwrap());
    }
    clients
}
