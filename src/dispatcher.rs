//! The server-side method table.

use crate::net::{Message, DISCOVERY_METHOD};
use crate::types::Value;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

/// A failure raised by a method body. Reported to the caller in-band; it
/// never tears down the session.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MethodError(pub String);

impl MethodError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type Handler = Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, MethodError>> + Send + Sync>;

struct Method {
    arity: usize,
    handler: Handler,
}

/// Maps method names to handlers. Populated before the server starts
/// serving and immutable afterwards, so connection tasks share it without
/// locking.
#[derive(Default)]
pub struct MethodTable {
    methods: BTreeMap<String, Method>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, expecting exactly `arity`
    /// arguments. Re-registering a name replaces the previous entry.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, arity: usize, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, MethodError>> + Send + 'static,
    {
        let handler: Handler = Box::new(move |arguments| Box::pin(handler(arguments)));
        self.methods.insert(name.into(), Method { arity, handler });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    /// Inserts the discovery entry, listing every registered name with the
    /// discovery method itself included. Called once, when the server
    /// starts serving.
    pub(crate) fn seal(&mut self) {
        let mut names = self.names();
        names.push(DISCOVERY_METHOD.to_owned());
        names.sort();
        names.dedup();
        let listing = Value::List(names.into_iter().map(Value::Str).collect());
        self.register(DISCOVERY_METHOD, 0, move |_arguments| {
            let listing = listing.clone();
            async move { Ok(listing) }
        });
    }

    /// Resolves and invokes one call. Every failure mode maps to an
    /// in-band [`Message::Error`]; only success produces a
    /// [`Message::Return`].
    pub async fn dispatch(&self, method: &str, arguments: Vec<Value>) -> Message {
        let Some(entry) = self.methods.get(method) else {
            return Message::Error {
                message: format!("Unknown method \"{method}\""),
            };
        };
        if arguments.len() != entry.arity {
            return Message::Error {
                message: format!("Invalid argument count for method \"{method}\""),
            };
        }
        match (entry.handler)(arguments).await {
            Ok(value) => Message::Return(value),
            Err(error) => Message::Error {
                message: error.to_string(),
            },
        }
    }
}
