//! The Storage Node's TCP front: connection-per-request client and control ports
//! (§4.1), plus the heartbeat session to the Name Node (§4.5).

use std::sync::Arc;
use std::time::Duration;

use tokio::io;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::SnConfig;
use crate::sn::dispatch;
use crate::sn::state::SnState;
use crate::wire::{self, Command, Frame, Kind};

/// Runs the client port, the control port and the heartbeat session until the
/// process exits; returns only on a listener bind failure.
pub async fn run(state: Arc<SnState>) -> io::Result<()> {
    let client_listener = TcpListener::bind(format!("{}:{}", state.config.bind_addr, state.config.client_port)).await?;
    let control_listener = TcpListener::bind(format!("{}:{}", state.config.bind_addr, state.config.control_port)).await?;
    info!(client_port = state.config.client_port, control_port = state.config.control_port, "storage node listening");

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move { heartbeat_loop(state).await });
    }

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move { accept_loop(control_listener, state).await });
    }

    accept_loop(client_listener, state).await;
    Ok(())
}

async fn accept_loop(listener: TcpListener, state: Arc<SnState>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = serve_one_request(socket, &state).await {
                debug!(%peer, error = %e, "connection closed");
            }
        });
    }
}

/// One request per connection (§4.1): read exactly one frame, respond, done.
async fn serve_one_request(mut socket: TcpStream, state: &SnState) -> io::Result<()> {
    let frame = wire::read_frame(&mut socket).await?;
    let reply = dispatch::handle(frame, state).await;
    wire::write_frame(&mut socket, &reply).await
}

/// Registers with the NN, then sends a heartbeat every `heartbeat_interval_secs`.
/// On any I/O failure, re-registers after a back-off (§4.5, §7).
async fn heartbeat_loop(state: Arc<SnState>) {
    loop {
        match register_and_heartbeat(&state).await {
            Ok(()) => unreachable!("register_and_heartbeat only returns on error"),
            Err(e) => {
                warn!(error = %e, "heartbeat session to name node failed, reconnecting");
                tokio::time::sleep(Duration::from_secs(crate::config::HEARTBEAT_RECONNECT_BACKOFF_SECS)).await;
            }
        }
    }
}

async fn register_and_heartbeat(state: &SnState) -> io::Result<()> {
    let cfg = &state.config;
    let mut stream = TcpStream::connect(&cfg.nn_addr).await?;

    let address = cfg.bind_addr.clone();
    let payload = format!("{address}|{}|{}", cfg.control_port, cfg.client_port);
    let register = Frame::request(Kind::RegisterSs as i32, Command::View as i32, "", "", payload.into_bytes());
    wire::write_frame(&mut stream, &register).await?;
    let reply = wire::read_frame(&mut stream).await?;
    if reply.error != 0 {
        return Err(io::Error::new(io::ErrorKind::Other, "name node refused registration"));
    }
    let node_id = reply.data_str().to_owned();
    info!(node_id = %node_id, nn_addr = %cfg.nn_addr, "registered with name node");

    loop {
        tokio::time::sleep(Duration::from_secs(cfg.heartbeat_interval_secs)).await;
        let heartbeat = Frame::request(Kind::Heartbeat as i32, Command::View as i32, &node_id, "", Vec::new());
        wire::write_frame(&mut stream, &heartbeat).await?;
        let ack = wire::read_frame(&mut stream).await?;
        if ack.error != 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "heartbeat rejected"));
        }
    }
}
