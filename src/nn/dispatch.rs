//! Maps an incoming client-session [`Frame`] to a [`NnState`] operation and builds
//! the response frame, including the redirection replies (§4.2) and the
//! ApproveRequest ACL push to the file's home Storage Node (§4.6).

use num_traits::FromPrimitive;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::error::Error;
use crate::nn::state::{NnState, StorageNodeRecord};
use crate::wire::{self, Command, Frame, Kind};

/// Handles one `Kind::Command` frame from a client session.
pub async fn handle(frame: Frame, state: &NnState) -> Frame {
    let Some(command) = Command::from_i32(frame.command) else {
        return Frame::err(Kind::Response as i32, frame.command, Error::InvalidCommand);
    };

    match dispatch(command, &frame, state).await {
        Ok(data) => {
            info!(?command, file = %frame.filename, "handled");
            Frame::ok(Kind::Response as i32, frame.command, data)
        }
        Err(e) => {
            warn!(?command, file = %frame.filename, error = %e, "rejected");
            Frame::err(Kind::Response as i32, frame.command, e)
        }
    }
}

/// Commands that the NN serves purely by redirection: resolve the filename to its
/// home Storage Node and hand the client that address (§4.2 table).
fn is_redirect_command(command: Command) -> bool {
    matches!(
        command,
        Command::Read
            | Command::Write
            | Command::WriteCommit
            | Command::Info
            | Command::FileInfo
            | Command::Stream
            | Command::AddAccess
            | Command::RemAccess
            | Command::Undo
            | Command::Checkpoint
            | Command::ViewCheckpoint
            | Command::Revert
            | Command::ListCheckpoints
    )
}

fn address_reply(node: &StorageNodeRecord) -> Vec<u8> {
    format!("{}|{}", node.address, node.client_port).into_bytes()
}

async fn dispatch(command: Command, frame: &Frame, state: &NnState) -> Result<Vec<u8>, Error> {
    if is_redirect_command(command) {
        let home = state.resolve(&frame.filename)?;
        return Ok(address_reply(&home));
    }

    match command {
        Command::View => {
            let mut out = String::new();
            for record in state.view() {
                out.push_str(&wire::encode_fields(&[
                    record.filename,
                    record.owner,
                    record.word_count.to_string(),
                    record.char_count.to_string(),
                ]));
            }
            Ok(out.into_bytes())
        }

        Command::List => {
            let mut out = String::new();
            for user in state.list_users() {
                out.push_str(&wire::encode_fields(&[user.identity, user.address]));
            }
            Ok(out.into_bytes())
        }

        Command::Create | Command::CreateFolder => {
            let home = state.create_file(&frame.filename, &frame.identity)?;
            Ok(address_reply(&home))
        }

        Command::Move => {
            let dst = frame.data_str().to_owned();
            let home = state.rename_file(&frame.filename, &dst, &frame.identity)?;
            Ok(address_reply(&home))
        }

        Command::ViewFolder => {
            let mut out = String::new();
            for record in state.view_folder(&frame.filename) {
                out.push_str(&wire::encode_fields(&[record.filename]));
            }
            Ok(out.into_bytes())
        }

        Command::Copy => {
            let dst = frame.data_str().to_owned();
            let home = state.copy_file(&frame.filename, &dst, &frame.identity)?;
            Ok(address_reply(&home))
        }

        Command::Delete => {
            state.delete_file(&frame.filename, &frame.identity)?;
            Ok(Vec::new())
        }

        Command::Exec => {
            // §9 "Exec removal": a remote-code-execution surface with no
            // legitimate use in this rewrite. Always refused.
            Err(Error::ExecFailed)
        }

        Command::LockAcquire => {
            let idx: u32 = frame.data_str().trim().parse().map_err(|_| Error::InvalidParameters)?;
            let home = state.lock_acquire(&frame.filename, idx, &frame.identity)?;
            Ok(address_reply(&home))
        }

        Command::LockRelease => {
            // Payload is `<sentence-idx>` or, after a WriteCommit, the richer
            // `<sentence-idx>|<word-count>|<char-count>` so the NN's cached
            // FileRecord can be refreshed before the lock is let go (§8
            // invariant 4: cached counts must track the current body).
            let fields = wire::decode_fields(frame.data_str());
            let idx: u32 = fields.first().ok_or(Error::InvalidParameters)?.trim().parse().map_err(|_| Error::InvalidParameters)?;
            if let (Some(words), Some(chars)) = (fields.get(1), fields.get(2)) {
                if let (Ok(words), Ok(chars)) = (words.parse(), chars.parse()) {
                    state.touch(&frame.filename, &frame.identity, words, chars);
                }
            }
            state.lock_release(&frame.filename, idx, &frame.identity)?;
            Ok(Vec::new())
        }

        Command::RequestAccess => {
            state.request_access(&frame.filename, &frame.identity)?;
            Ok(Vec::new())
        }

        Command::ViewRequests => {
            let mut out = String::new();
            for req in state.view_requests(&frame.identity) {
                out.push_str(&wire::encode_fields(&[req.filename, req.requester]));
            }
            Ok(out.into_bytes())
        }

        Command::ApproveRequest => {
            let requester = frame.data_str().to_owned();
            let home = state.approve_request(&frame.filename, &requester, &frame.identity)?;
            push_acl_grant(&home, &frame.filename, &requester).await?;
            Ok(Vec::new())
        }

        Command::DenyRequest => {
            let requester = frame.data_str().to_owned();
            state.deny_request(&frame.filename, &requester, &frame.identity)?;
            Ok(Vec::new())
        }

        _ => unreachable!("redirect commands are handled above"),
    }
}

/// Opens a short-lived control session to `node` and pushes an AddAccess command
/// granting `target` read permission on `filename` (§4.6 ApproveRequest).
async fn push_acl_grant(node: &StorageNodeRecord, filename: &str, target: &str) -> Result<(), Error> {
    let addr = format!("{}:{}", node.address, node.control_port);
    let mut stream = TcpStream::connect(&addr).await.map_err(|_| Error::StorageServerDown)?;
    let data = format!("{target}|R").into_bytes();
    let request = Frame::request(Kind::SsCommand as i32, Command::AddAccess as i32, "nn", filename, data);
    wire::write_frame(&mut stream, &request).await.map_err(|_| Error::StorageServerDown)?;
    let reply = wire::read_frame(&mut stream).await.map_err(|_| Error::StorageServerDown)?;
    stream.shutdown().await.ok();
    if reply.error != 0 {
        // AddAccess may legitimately fail with file-exists-on-ACL on a repeated
        // approval; §4.6 requires that to stay idempotent rather than surface.
        if reply.error == Error::FileExists.code() {
            return Ok(());
        }
        return Err(Error::from_code(reply.error).unwrap_or(Error::Internal));
    }
    Ok(())
}
