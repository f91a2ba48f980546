//! Maps an incoming [`Frame`] to an [`SnState`] content operation (§4.7). The same
//! dispatcher serves both the client-facing port and the NN control port — the
//! latter only ever sends `AddAccess` today (§4.6 ApproveRequest), but nothing
//! here assumes that.

use num_traits::FromPrimitive;
use tracing::{info, warn};

use crate::error::Error;
use crate::sn::state::SnState;
use crate::wire::{self, Command, Frame, Kind};

pub async fn handle(frame: Frame, state: &SnState) -> Frame {
    let Some(command) = Command::from_i32(frame.command) else {
        return Frame::err(Kind::Response as i32, frame.command, Error::InvalidCommand);
    };

    match execute(command, &frame, state).await {
        Ok(data) => {
            info!(?command, file = %frame.filename, user = %frame.identity, "handled");
            Frame::ok(Kind::Response as i32, frame.command, data)
        }
        Err(e) => {
            warn!(?command, file = %frame.filename, user = %frame.identity, error = %e, "rejected");
            Frame::err(Kind::Response as i32, frame.command, e)
        }
    }
}

async fn execute(command: Command, frame: &Frame, state: &SnState) -> Result<Vec<u8>, Error> {
    match command {
        Command::Create => {
            state.create(&frame.filename, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::Read => Ok(state.read(&frame.filename, &frame.identity).await?.into_bytes()),

        Command::WriteCommit => {
            let stats = state.write_commit(&frame.filename, &frame.identity, frame.data_str()).await?;
            Ok(wire::encode_fields(&[stats.word_count.to_string(), stats.char_count.to_string()]).into_bytes())
        }

        Command::Delete => {
            state.delete(&frame.filename, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::Undo => {
            state.undo(&frame.filename, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::Info | Command::FileInfo => {
            let info = state.info(&frame.filename, &frame.identity).await?;
            let mut acl: Vec<_> = info.acl.iter().map(|(u, p)| format!("{u}:{}", p.as_str())).collect();
            acl.sort();
            Ok(wire::encode_fields(&[
                info.owner,
                info.created.to_string(),
                info.modified.to_string(),
                info.accessed.to_string(),
                info.last_accessed_by,
                info.word_count.to_string(),
                info.char_count.to_string(),
                info.size.to_string(),
                acl.join(";"),
            ])
            .into_bytes())
        }

        Command::Stream => {
            let words = state.stream(&frame.filename, &frame.identity).await?;
            Ok(wire::encode_fields(&words).into_bytes())
        }

        Command::Copy => {
            let dst = frame.data_str();
            state.copy(&frame.filename, dst, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::AddAccess => {
            let fields = wire::decode_fields(frame.data_str());
            let (Some(target), Some(perm)) = (fields.first(), fields.get(1)) else {
                return Err(Error::InvalidParameters);
            };
            state.add_access(&frame.filename, &frame.identity, target, perm).await?;
            Ok(Vec::new())
        }

        Command::RemAccess => {
            let target = frame.data_str();
            state.rem_access(&frame.filename, &frame.identity, target).await?;
            Ok(Vec::new())
        }

        Command::Checkpoint => {
            state.checkpoint(&frame.filename, frame.data_str(), &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::ViewCheckpoint => {
            Ok(state.view_checkpoint(&frame.filename, frame.data_str(), &frame.identity).await?.into_bytes())
        }

        Command::Revert => {
            state.revert(&frame.filename, frame.data_str(), &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::ListCheckpoints => {
            let mut out = String::new();
            for (tag, ts) in state.list_checkpoints(&frame.filename, &frame.identity).await? {
                out.push_str(&wire::encode_fields(&[tag, ts.to_string()]));
            }
            Ok(out.into_bytes())
        }

        Command::CreateFolder => {
            state.create_folder(&frame.filename, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::Move => {
            let dst = frame.data_str();
            state.rename(&frame.filename, dst, &frame.identity).await?;
            Ok(Vec::new())
        }

        Command::ViewFolder => {
            let mut out = String::new();
            for name in state.view_folder(&frame.filename) {
                out.push_str(&wire::encode_fields(&[name]));
            }
            Ok(out.into_bytes())
        }

        _ => Err(Error::InvalidCommand),
    }
}
