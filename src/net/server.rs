use crate::dispatcher::{MethodError, MethodTable};
use crate::net::Message;
use crate::session::{Received, Session};
use crate::types::Value;
use std::future::Future;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::task;
use tracing::{debug, warn};

/// Serves a fixed method table to any number of concurrent local clients
/// over a Unix domain socket.
///
/// ```no_run
/// # use unixrpc::{RpcServer, Value};
/// # async fn demo() -> std::io::Result<()> {
/// let mut server = RpcServer::bind("/tmp/app.sock")?;
/// server.register("hello", 1, |arguments: Vec<Value>| async move {
///     let name = arguments[0].as_str().unwrap_or("stranger");
///     Ok(Value::from(format!("Hello, {name}!")))
/// });
/// server.serve().await
/// # }
/// ```
pub struct RpcServer {
    path: PathBuf,
    listener: UnixListener,
    table: MethodTable,
}

impl RpcServer {
    /// Binds the listening socket. Any stale socket file left behind by a
    /// previous run is removed first, and the fresh one is restricted to
    /// the owning user before a connection can be accepted.
    pub fn bind(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }
        let listener = UnixListener::bind(&path)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        Ok(Self {
            path,
            listener,
            table: MethodTable::new(),
        })
    }

    /// Registers a method. The table is frozen once [`serve`] is called.
    ///
    /// [`serve`]: RpcServer::serve
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, arity: usize, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, MethodError>> + Send + 'static,
    {
        self.table.register(name, arity, handler);
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until the listener fails, spawning one task per
    /// connection. The accept loop never waits on a connection's calls.
    pub async fn serve(mut self) -> io::Result<()> {
        self.table.seal();
        let table = Arc::new(self.table);
        debug!(path = %self.path.display(), "rpc server listening");
        loop {
            let (stream, _addr) = self.listener.accept().await?;
            let table = Arc::clone(&table);
            task::spawn(serve_connection(table, stream));
        }
    }
}

/// One connection's serving loop: receive a call, dispatch it, reply,
/// repeat. Ends on clean peer shutdown, protocol violation, or a
/// communication fault, none of which disturb other connections.
async fn serve_connection(table: Arc<MethodTable>, stream: UnixStream) {
    debug!("rpc client connected");
    let mut session = Session::new(stream);
    loop {
        let (method, arguments) = match session.receive().await {
            Ok(Received::Closed) => {
                debug!("rpc client closed the connection");
                return;
            }
            Ok(Received::Message(Message::Call { method, arguments })) => (method, arguments),
            Ok(Received::Message(other)) => {
                // Anything but a call has no business arriving here; drop
                // the connection without a response.
                warn!(received = ?other, "protocol violation, closing connection");
                return;
            }
            Err(error) => {
                warn!(%error, "rpc session fault");
                return;
            }
        };
        let reply = table.dispatch(&method, arguments).await;
        if let Err(error) = session.send(&reply).await {
            warn!(%error, "failed to send rpc reply");
            return;
        }
    }
}
