//! Fixed-layout request/response framing shared by every NN/SN/client hop.
//!
//! Every node speaks the same [`Frame`]: a message kind, a command code, an error
//! code, an identity, a filename, and a bounded variable payload. Frames are
//! exchanged in full (§4.1) — a partial read is fatal to that session and surfaces
//! as [`crate::error::Error::StorageServerDown`]-style availability failure to the
//! caller that owns the socket.

mod codec;
mod frame;

pub use codec::{decode_fields, encode_fields};
pub use frame::{read_frame, write_frame, Frame, FRAME_VERSION, MAX_FILENAME_LEN, MAX_IDENTITY_LEN};

use num_derive::FromPrimitive;

/// Message kinds, per §6.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum Kind {
    RegisterSs = 0,
    RegisterUser = 1,
    Command = 2,
    Response = 3,
    SsCommand = 4,
    Heartbeat = 5,
    Ack = 6,
}

/// Command codes, per §6.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum Command {
    View = 0,
    Read = 1,
    Create = 2,
    Write = 3,
    Delete = 4,
    Info = 5,
    List = 6,
    AddAccess = 7,
    RemAccess = 8,
    Stream = 9,
    Undo = 10,
    Copy = 11,
    FileInfo = 12,
    Exec = 13,
    WriteCommit = 14,
    LockAcquire = 15,
    LockRelease = 16,
    CreateFolder = 17,
    Move = 18,
    ViewFolder = 19,
    Checkpoint = 20,
    ViewCheckpoint = 21,
    Revert = 22,
    ListCheckpoints = 23,
    RequestAccess = 24,
    ViewRequests = 25,
    ApproveRequest = 26,
    DenyRequest = 27,
}
