//! semaforo-trigger: sends one trigger to a running controller.
//!
//! ```text
//! semaforo-trigger --host 192.168.0.20 --topic semaforo/acao --payload go
//! ```
//!
//! Connects, sends CONNECT, waits for the CONNACK, publishes once, sends
//! DISCONNECT and exits.  Exits non-zero if the controller does not answer
//! with a valid CONNACK.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use semaforo_core::protocol::{encode_connect, encode_disconnect, encode_publish, CONNACK};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const KEEP_ALIVE_SECS: u16 = 60;

/// Publish a single trigger message to a semaforo controller.
#[derive(Debug, Parser)]
#[command(name = "semaforo-trigger", version)]
struct Args {
    /// Controller hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "SEMAFORO_HOST")]
    host: String,

    /// Controller broker port.
    #[arg(long, default_value_t = 1883, env = "SEMAFORO_BROKER_PORT")]
    port: u16,

    /// Topic to publish on.
    #[arg(long, default_value = "semaforo/acao")]
    topic: String,

    /// Message payload.
    #[arg(long, default_value = "")]
    payload: String,

    /// Seconds to wait for the connection and the CONNACK.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

/// Client id sent in CONNECT, unique per invocation.
fn client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("semaforo-trigger-{}", &id[..8])
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let deadline = Duration::from_secs(args.timeout_secs);
    let target = format!("{}:{}", args.host, args.port);

    let mut stream = timeout(deadline, TcpStream::connect(&target))
        .await
        .with_context(|| format!("timed out connecting to {target}"))?
        .with_context(|| format!("failed to connect to {target}"))?;

    let connect = encode_connect(&client_id(), KEEP_ALIVE_SECS)?;
    stream
        .write_all(&connect)
        .await
        .context("failed to send CONNECT")?;

    let mut ack = [0u8; CONNACK.len()];
    timeout(deadline, stream.read_exact(&mut ack))
        .await
        .context("timed out waiting for CONNACK")?
        .context("connection closed before CONNACK")?;
    if ack != CONNACK {
        bail!("unexpected CONNACK from {target}: {ack:02X?}");
    }

    let publish = encode_publish(&args.topic, args.payload.as_bytes())?;
    stream
        .write_all(&publish)
        .await
        .context("failed to send PUBLISH")?;
    stream
        .write_all(&encode_disconnect())
        .await
        .context("failed to send DISCONNECT")?;
    stream.shutdown().await.ok();

    info!("published to '{}' on {target}", args.topic);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_args_defaults() {
        // Only arguments without an env fallback are checked by parsing.
        let args = Args::parse_from(["semaforo-trigger"]);
        assert_eq!(args.topic, "semaforo/acao");
        assert_eq!(args.payload, "");
        assert_eq!(args.timeout_secs, 5);
    }

    #[test]
    fn test_connection_args_default_to_local_broker() {
        let command = Args::command();
        for (id, default, env) in [
            ("host", "127.0.0.1", "SEMAFORO_HOST"),
            ("port", "1883", "SEMAFORO_BROKER_PORT"),
        ] {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == id)
                .unwrap_or_else(|| panic!("no argument '{id}'"));
            let defaults: Vec<_> = arg
                .get_default_values()
                .iter()
                .map(|v| v.to_str())
                .collect();
            assert_eq!(defaults, [Some(default)], "{id}");
            assert_eq!(arg.get_env(), Some(OsStr::new(env)), "{id}");
        }
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "semaforo-trigger",
            "--host",
            "10.0.0.9",
            "--port",
            "2883",
            "--topic",
            "acao/semaforo",
            "--payload",
            "go",
        ]);
        assert_eq!(args.host, "10.0.0.9");
        assert_eq!(args.port, 2883);
        assert_eq!(args.topic, "acao/semaforo");
        assert_eq!(args.payload, "go");
    }

    #[test]
    fn test_client_id_is_short_and_unique() {
        let a = client_id();
        let b = client_id();
        assert!(a.starts_with("semaforo-trigger-"));
        assert_eq!(a.len(), "semaforo-trigger-".len() + 8);
        assert_ne!(a, b);
    }
}
