//! Shared end-to-end test fixture: stands up a real Name Node and one or more
//! Storage Nodes on ephemeral TCP ports, each serving the production dispatch
//! code over the real wire framing, and exposes a tiny request helper.
//!
//! Registration is wired directly through [`scriptorium::nn::NnState::register_storage_node`]
//! rather than by driving the `RegisterSs`/`Heartbeat` wire path, since that
//! handshake is already covered by `src/nn/server.rs` and `src/nn/state/tests.rs`.

use std::sync::Arc;

use scriptorium::config::{NnConfig, SnConfig};
use scriptorium::nn::{self, NnState};
use scriptorium::sn::backend::FsBackend;
use scriptorium::sn::{self, SnState};
use scriptorium::wire::{self, Command, Frame, Kind};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};

pub struct Fixture {
    _tempdir: TempDir,
    pub nn: Arc<NnState>,
    pub nn_addr: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let tempdir = TempDir::new().expect("tempdir");
        let nn = Arc::new(NnState::new(NnConfig::default()));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind nn");
        let nn_addr = listener.local_addr().expect("nn local_addr").to_string();
        let nn_for_loop = Arc::clone(&nn);
        tokio::spawn(async move { accept_nn_sessions(listener, nn_for_loop).await });

        Self { _tempdir: tempdir, nn, nn_addr }
    }

    /// Starts a Storage Node backed by its own scratch content directory and
    /// registers it with the fixture's Name Node.
    pub async fn spawn_storage_node(&self, name: &str) -> StorageNode {
        let content_dir = self._tempdir.path().join(name);
        let backend = Arc::new(FsBackend::new(content_dir));
        let sn = Arc::new(SnState::new(backend, SnConfig::default()));

        let client_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind sn client");
        let client_addr = client_listener.local_addr().expect("client local_addr");
        let control_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind sn control");
        let control_addr = control_listener.local_addr().expect("control local_addr");

        let sn_for_client = Arc::clone(&sn);
        tokio::spawn(async move { accept_sn_requests(client_listener, sn_for_client).await });
        let sn_for_control = Arc::clone(&sn);
        tokio::spawn(async move { accept_sn_requests(control_listener, sn_for_control).await });

        let id = self.nn.register_storage_node(
            client_addr.ip().to_string(),
            control_addr.port(),
            client_addr.port(),
        );

        StorageNode { id, client_addr: client_addr.to_string(), state: sn }
    }
}

pub struct StorageNode {
    pub id: u64,
    pub client_addr: String,
    pub state: Arc<SnState>,
}

async fn accept_nn_sessions(listener: TcpListener, state: Arc<NnState>) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else { return };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok(frame) = wire::read_frame(&mut socket).await else { return };
                let reply = nn::dispatch::handle(frame, &state).await;
                if wire::write_frame(&mut socket, &reply).await.is_err() {
                    return;
                }
            }
        });
    }
}

async fn accept_sn_requests(listener: TcpListener, state: Arc<SnState>) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else { return };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let Ok(frame) = wire::read_frame(&mut socket).await else { return };
            let reply = sn::dispatch::handle(frame, &state).await;
            let _ = wire::write_frame(&mut socket, &reply).await;
        });
    }
}

/// Sends one request frame to `addr` and returns the response, panicking on any
/// transport failure (tests only care about protocol-level errors).
pub async fn send(addr: &str, command: Command, identity: &str, filename: &str, data: Vec<u8>) -> Frame {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let request = Frame::request(Kind::Command as i32, command as i32, identity, filename, data);
    wire::write_frame(&mut stream, &request).await.expect("write request");
    wire::read_frame(&mut stream).await.expect("read response")
}

pub async fn expect_ok(addr: &str, command: Command, identity: &str, filename: &str, data: Vec<u8>) -> Frame {
    let frame = send(addr, command, identity, filename, data).await;
    assert_eq!(frame.error, 0, "expected success for {command:?}, got error {}", frame.error);
    frame
}

pub async fn expect_err(addr: &str, command: Command, identity: &str, filename: &str, data: Vec<u8>) -> i32 {
    let frame = send(addr, command, identity, filename, data).await;
    assert_ne!(frame.error, 0, "expected an error for {command:?}");
    frame.error
}
