//! RPC over Unix domain sockets.
//!
//! A server exposes a fixed table of named methods; any number of clients
//! connect concurrently, learn the server's callable surface in a single
//! discovery round trip, and invoke the discovered methods as local async
//! calls. On the wire each message is one length-prefixed,
//! bincode-encoded frame, and every session alternates strictly between
//! one call and one response.
//!
//! Remote failures stay structured: an unknown method, a bad argument
//! count, or a failing method body come back as [`ClientError::Remote`]
//! and leave the session usable, while transport and codec faults close
//! the session and surface as [`CommunicationError`]s.

pub mod dispatcher;
pub mod frame;
pub mod net;
pub mod session;
pub mod types;

pub use dispatcher::{MethodError, MethodTable};
pub use net::client::{ClientError, RpcClient};
pub use net::server::RpcServer;
pub use net::{Message, DISCOVERY_METHOD};
pub use session::{CommunicationError, Received, Session};
pub use types::Value;
