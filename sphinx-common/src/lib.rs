// sphinx-common - Shared types and protocol definitions for the searchd client
//
// This crate defines the searchd wire constants, the binary codec and the
// request/result types shared by the client.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export for convenience
pub use codec::*;
pub use error::*;
pub use protocol::*;
pub use types::*;
