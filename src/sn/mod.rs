//! The Storage Node (§4.7-§4.8): content, metadata, undo and checkpoint storage,
//! per-file locking, and the heartbeat session to the Name Node.

pub mod backend;
pub mod dispatch;
mod lock_table;
pub mod server;
pub mod state;

pub use state::SnState;
