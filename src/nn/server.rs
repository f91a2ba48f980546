//! The Name Node's TCP front: a long-lived per-client session loop (§4.1, §5) plus
//! the background failure-detection scan (§4.5).

use std::sync::Arc;
use std::time::Duration;

use num_traits::FromPrimitive;
use tokio::io;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::nn::dispatch;
use crate::nn::state::NnState;
use crate::wire::{self, Frame, Kind};

/// Binds the NN's client-facing port and serves connections until the process exits.
pub async fn run(state: Arc<NnState>) -> io::Result<()> {
    let addr = format!("{}:{}", state.config.bind_addr, state.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "name node listening");

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move { failure_scan_loop(state).await });
    }

    loop {
        let (socket, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            debug!(%peer, "client session opened");
            if let Err(e) = serve_session(socket, &state).await {
                debug!(%peer, error = %e, "client session ended");
            }
        });
    }
}

/// Serves one long-lived session: read a frame, dispatch it, write the response,
/// repeat until the peer closes the connection (§4.1: one outstanding request per
/// connection; requests within a session are handled in arrival order, §5).
async fn serve_session(mut socket: TcpStream, state: &NnState) -> io::Result<()> {
    loop {
        let frame = match wire::read_frame(&mut socket).await {
            Ok(frame) => frame,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };

        let Some(kind) = Kind::from_i32(frame.kind) else {
            let reply = Frame::err(Kind::Response as i32, frame.command, crate::error::Error::InvalidCommand);
            wire::write_frame(&mut socket, &reply).await?;
            continue;
        };

        let reply = match kind {
            Kind::Command => dispatch::handle(frame, state).await,
            Kind::RegisterSs => handle_register_ss(&frame, state),
            Kind::RegisterUser => handle_register_user(&frame, state),
            Kind::Heartbeat => handle_heartbeat(&frame, state),
            _ => Frame::err(Kind::Response as i32, frame.command, crate::error::Error::InvalidCommand),
        };
        wire::write_frame(&mut socket, &reply).await?;
    }
}

fn handle_register_ss(frame: &Frame, state: &NnState) -> Frame {
    let fields = wire::decode_fields(frame.data_str());
    let (Some(address), Some(control_port), Some(client_port)) =
        (fields.first(), fields.get(1), fields.get(2))
    else {
        return Frame::err(Kind::Ack as i32, frame.command, crate::error::Error::InvalidParameters);
    };
    let (Ok(control_port), Ok(client_port)) = (control_port.parse::<u16>(), client_port.parse::<u16>()) else {
        return Frame::err(Kind::Ack as i32, frame.command, crate::error::Error::InvalidParameters);
    };

    let id = state.register_storage_node((*address).to_owned(), control_port, client_port);
    info!(node_id = id, %address, "storage node registered");
    Frame::ok(Kind::Ack as i32, frame.command, id.to_string().into_bytes())
}

fn handle_register_user(frame: &Frame, state: &NnState) -> Frame {
    state.register_user(&frame.identity, frame.data_str());
    Frame::ok(Kind::Ack as i32, frame.command, Vec::new())
}

fn handle_heartbeat(frame: &Frame, state: &NnState) -> Frame {
    let Ok(node_id) = frame.identity.trim().parse::<u64>() else {
        return Frame::err(Kind::Ack as i32, frame.command, crate::error::Error::InvalidParameters);
    };
    if state.record_heartbeat(node_id) {
        Frame::ok(Kind::Ack as i32, frame.command, Vec::new())
    } else {
        Frame::err(Kind::Ack as i32, frame.command, crate::error::Error::StorageServerDown)
    }
}

/// §4.5: scans every `failure_scan_secs`, marking nodes stale past
/// `heartbeat_failure_secs` as disconnected and logging the failover candidate.
async fn failure_scan_loop(state: Arc<NnState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.failure_scan_secs));
    loop {
        ticker.tick().await;
        for (node_id, replica_peer) in state.scan_for_failures(state.config.heartbeat_failure_secs) {
            match replica_peer {
                Some(peer) => warn!(node_id, failover_candidate = peer, "storage node marked disconnected"),
                None => warn!(node_id, "storage node marked disconnected, no failover candidate"),
            }
        }
    }
}
