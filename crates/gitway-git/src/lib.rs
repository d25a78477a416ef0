//! Git transport plumbing for gitway.
//!
//! This crate holds the pieces of the smart and dumb HTTP transports that do
//! not depend on an HTTP stack: the pkt-line framing used by reference
//! advertisements, the gateway that runs the `git` executable against a tree
//! of bare repositories, and the small resources shared by the streaming
//! bridge (request-body decoding, buffer pooling, process-group cleanup).

mod buffer;
mod decode;
mod error;
mod gateway;
mod pktline;
mod process;
mod service;

pub use buffer::{BufferPool, PooledBuffer, DEFAULT_BUFFER_SIZE};
pub use decode::BodyDecoder;
pub use error::{GatewayError, GitError};
pub use gateway::{GatewayConfig, ProcessGateway, RequestedFile};
pub use pktline::{PktLine, PktLineReader, PktLineWriter, MAX_PKT_DATA_LEN};
pub use process::ProcessGroup;
pub use service::Service;

/// Result type for git transport operations.
pub type Result<T> = std::result::Result<T, GitError>;
