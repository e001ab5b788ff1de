//! The wire protocol shared by the client and server.

pub mod client;
pub mod server;

use crate::types::Value;
use serde::{Deserialize, Serialize};

/// The method every server exposes unconditionally; it takes no arguments
/// and returns the full list of callable method names.
pub const DISCOVERY_METHOD: &str = "list_methods";

/// One logical message on the wire, exactly one per frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Message {
    /// A request naming a method and carrying its arguments in order.
    Call {
        method: String,
        arguments: Vec<Value>,
    },
    /// The value a successful invocation produced.
    Return(Value),
    /// An in-band failure; the session it arrives on stays usable.
    Error { message: String },
}
