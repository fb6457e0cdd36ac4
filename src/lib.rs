//! # T2 RPC
//!
//! A JSON-RPC 2.0 client running over a single WebSocket connection. Any number of requests
//! may be outstanding at once; each one is followed through its own `Handle`, which yields
//! progress updates sent by the server and finally the result or error.
//!
//! ## Making requests
//!
//! ```no_run
//! use serde_json::json;
//! use t2_rpc::prelude::*;
//!
//! # fn main() -> RpcResult<()> {
//! // connect to the server listening at ws://localhost:5000
//! let client = Client::connect("localhost:5000")?;
//!
//! // make a request and wait for its result
//! let version = client.request("get-version", json!(null), None)?;
//! println!("{}", version);
//! #     Ok(())
//! # }
//! ```
//!
//! ## Progress and cancellation
//!
//! Long running requests report progress. `call` returns as soon as the request has been
//! queued; the `Handle` then yields the progress updates in the order they arrive.
//!
//! ```no_run
//! # use serde_json::json;
//! # use t2_rpc::prelude::*;
//! # fn main() -> RpcResult<()> {
//! # let client = Client::connect("localhost:5000")?;
//! let handle = client.call("load-model", json!({"path": "cells.h5"}))?;
//!
//! for progress in handle.progress() {
//!     println!("{}: {:.0}%", progress.operation, progress.amount * 100.0);
//!     if progress.amount > 0.5 {
//!         // ask the server to stop, it may or may not comply
//!         client.cancel(&handle)?;
//!     }
//! }
//!
//! let result = client.result_of(&handle, Some(std::time::Duration::from_secs(10)));
//! #     Ok(())
//! # }
//! ```
//!
//! ## Binary payloads
//!
//! Some requests are answered with a binary frame directly after the reply, an image for
//! example. Mark such requests with `Request::expecting_binary` and the payload ends up in
//! `Reply::binary`. Requests can carry a binary payload of their own with `Request::with_binary`.
//!
//! ## In-process mode
//!
//! `transport::memory::pair` creates a client transport connected to a `MemoryPeer` which
//! plays the server. Useful for tests and for embedding a server in the same program.

pub mod client;
pub mod entrypoint;
pub mod protocol;
pub mod transport;
pub mod prelude;
pub(crate) mod id;
pub(crate) mod err;
pub(crate) mod debug;
mod stopper;

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;


pub use err::*;
pub use client::Client;
pub use client::builder::{ClientBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_URI};
pub use client::handle::Handle;
pub use protocol::{ErrorDetails, Progress, Reply, Request, RequestId, JSONRPC_VERSION};
