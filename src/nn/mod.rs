//! The Name Node (§4.2-§4.6, §4.10): namespace, placement, sentence locks,
//! failure detection and the access-request workflow, plus the cache that makes
//! repeated redirections cheap.

mod cache;
pub mod dispatch;
pub mod server;
pub mod state;

pub use state::NnState;
