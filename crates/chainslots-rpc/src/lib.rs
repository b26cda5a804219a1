//! chainslots-rpc: JSON-RPC plumbing for raw storage reads.
//!
//! - [`RpcTransport`]: the async seam every transport implements
//! - [`HttpRpcClient`]: `reqwest`-backed HTTP transport
//! - [`RpcStorageReader`]: `eth_getStorageAt` at a fixed [`BlockTag`]
//! - [`retry`]: backoff for callers that retry a whole decode pass

pub mod block;
pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod storage;
pub mod transport;

pub use block::BlockTag;
pub use client::{HttpClientConfig, HttpRpcClient};
pub use error::TransportError;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use storage::RpcStorageReader;
pub use transport::{call, RpcTransport};
