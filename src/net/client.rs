use crate::net::{Message, DISCOVERY_METHOD};
use crate::session::{CommunicationError, Received, Session};
use crate::types::Value;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint could not be reached at all.
    #[error("connecting to rpc socket: {0}")]
    Connect(#[source] io::Error),

    #[error(transparent)]
    Communication(#[from] CommunicationError),

    /// The server closed the connection while a response was pending.
    #[error("the server closed the connection")]
    RemoteClosed,

    /// The server reported the call failed; carries its message verbatim.
    #[error("remote error: {0}")]
    Remote(String),

    /// The name was never listed by the server. Nothing went on the wire.
    #[error("no such method \"{0}\"")]
    NoSuchMethod(String),

    /// The server sent a message that has no business arriving here.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

/// Connects to an [`RpcServer`] socket and exposes every method the server
/// lists as a local async call.
///
/// Calls are strictly one at a time per client; `call` takes `&mut self`,
/// so the borrow checker enforces the request/response alternation the
/// protocol requires.
///
/// [`RpcServer`]: crate::RpcServer
#[derive(Debug)]
pub struct RpcClient {
    session: Session<UnixStream>,
    methods: BTreeSet<String>,
}

impl RpcClient {
    /// Connects and performs the discovery round trip. Construction fails
    /// if the endpoint is unreachable or discovery itself fails.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path.as_ref())
            .await
            .map_err(ClientError::Connect)?;
        let mut client = Self {
            session: Session::new(stream),
            methods: BTreeSet::new(),
        };

        let listing = client
            .perform_call(DISCOVERY_METHOD.to_owned(), Vec::new())
            .await?;
        let Value::List(names) = listing else {
            return Err(ClientError::Protocol("malformed method listing"));
        };
        for name in names {
            let Value::Str(name) = name else {
                return Err(ClientError::Protocol("malformed method listing"));
            };
            client.methods.insert(name);
        }
        debug!(methods = client.methods.len(), "discovered rpc methods");
        Ok(client)
    }

    /// The method names learned from the server at connection time.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    /// Invokes a discovered method and waits for its single response.
    ///
    /// A remote failure comes back as [`ClientError::Remote`] carrying the
    /// server's message; the session stays usable afterwards. Calling a
    /// name the server never listed is a local error and sends nothing.
    pub async fn call(
        &mut self,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, ClientError> {
        if !self.methods.contains(method) {
            return Err(ClientError::NoSuchMethod(method.to_owned()));
        }
        self.perform_call(method.to_owned(), arguments).await
    }

    async fn perform_call(
        &mut self,
        method: String,
        arguments: Vec<Value>,
    ) -> Result<Value, ClientError> {
        self.session
            .send(&Message::Call { method, arguments })
            .await?;
        match self.session.receive().await? {
            Received::Closed => Err(ClientError::RemoteClosed),
            Received::Message(Message::Return(value)) => Ok(value),
            Received::Message(Message::Error { message }) => Err(ClientError::Remote(message)),
            Received::Message(Message::Call { .. }) => {
                Err(ClientError::Protocol("the server sent a call"))
            }
        }
    }
}
