//! Error codes shared by the wire protocol, the Name Node and the Storage Node.
//!
//! Every fallible operation in this crate returns [`Error`], which maps 1:1 onto the
//! numeric error codes carried in a [`crate::wire::Frame`] (see `error_code`).

use std::fmt;

/// Result alias used throughout the coordination and storage layers.
pub type Result<T> = std::result::Result<T, Error>;

/// Taxonomy of operation-scoped failures, numbered to match the wire error codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Error {
    /// The named file does not exist in the namespace (or on the Storage Node).
    FileNotFound = 1,
    /// The caller is not the owner of the target of a privileged operation.
    Unauthorized = 2,
    /// The target sentence is held by a different identity.
    FileLocked = 3,
    /// A sentence or word index in an edit script is out of range.
    InvalidIndex = 4,
    /// A Create/Copy/Checkpoint target already exists.
    FileExists = 5,
    /// The caller lacks the ACL permission required for the operation.
    PermissionDenied = 6,
    /// The command code or frame could not be interpreted.
    InvalidCommand = 7,
    /// The file's home Storage Node is not currently connected.
    StorageServerDown = 8,
    /// An unexpected internal failure (disk I/O, channel closed, poisoned lock).
    Internal = 9,
    /// The referenced user identity has not registered.
    UserNotFound = 10,
    /// Placement failed because no Storage Node is connected.
    NoStorageServers = 11,
    /// A request was missing required parameters or referenced an absent lock/request.
    InvalidParameters = 12,
    /// Exec of file content failed (see the §9 exec-removal design note).
    ExecFailed = 13,
}

impl Error {
    /// Returns the numeric error code carried on the wire (0 is reserved for success).
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Reconstructs an [`Error`] from a wire error code, if it is non-zero and known.
    pub fn from_code(code: i32) -> Option<Error> {
        use Error::*;
        Some(match code {
            1 => FileNotFound,
            2 => Unauthorized,
            3 => FileLocked,
            4 => InvalidIndex,
            5 => FileExists,
            6 => PermissionDenied,
            7 => InvalidCommand,
            8 => StorageServerDown,
            9 => Internal,
            10 => UserNotFound,
            11 => NoStorageServers,
            12 => InvalidParameters,
            13 => ExecFailed,
            _ => return None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::FileNotFound => "file not found",
            Error::Unauthorized => "unauthorized",
            Error::FileLocked => "file locked",
            Error::InvalidIndex => "invalid index",
            Error::FileExists => "file exists",
            Error::PermissionDenied => "permission denied",
            Error::InvalidCommand => "invalid command",
            Error::StorageServerDown => "storage server down",
            Error::Internal => "internal error",
            Error::UserNotFound => "user not found",
            Error::NoStorageServers => "no storage servers available",
            Error::InvalidParameters => "invalid parameters",
            Error::ExecFailed => "exec failed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::Internal
    }
}
