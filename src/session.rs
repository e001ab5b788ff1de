//! A typed request/response channel over one byte stream.

use crate::frame;
use crate::net::Message;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufStream};

/// A fault that ends the session. Never retried, never swallowed.
#[derive(Debug, Error)]
pub enum CommunicationError {
    #[error("transport fault: {0}")]
    Transport(#[from] io::Error),

    #[error("serialization fault: {0}")]
    Serialization(#[from] bincode::Error),

    /// The session already observed a fault or the peer's shutdown.
    #[error("session is closed")]
    Closed,
}

/// What one [`Session::receive`] produced.
#[derive(Debug)]
pub enum Received {
    Message(Message),
    /// The peer shut the stream down cleanly between frames.
    Closed,
}

/// Pairs the framed channel with the codec: one [`Message`] in or out per
/// call, no retries.
///
/// A session starts open and closes exactly once, either because the peer
/// shut down cleanly or because a transport or codec fault occurred.
/// Every operation on a closed session fails with
/// [`CommunicationError::Closed`].
#[derive(Debug)]
pub struct Session<S> {
    stream: BufStream<S>,
    open: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Encodes and frames one message. Any failure closes the session.
    pub async fn send(&mut self, message: &Message) -> Result<(), CommunicationError> {
        if !self.open {
            return Err(CommunicationError::Closed);
        }
        let result = self.try_send(message).await;
        if result.is_err() {
            self.open = false;
        }
        result
    }

    async fn try_send(&mut self, message: &Message) -> Result<(), CommunicationError> {
        let payload = bincode::serialize(message)?;
        frame::write_frame(&mut self.stream, &payload).await?;
        Ok(())
    }

    /// Reads and decodes one message, or observes the peer's shutdown.
    pub async fn receive(&mut self) -> Result<Received, CommunicationError> {
        if !self.open {
            return Err(CommunicationError::Closed);
        }
        match self.try_receive().await {
            Ok(Some(message)) => Ok(Received::Message(message)),
            Ok(None) => {
                self.open = false;
                Ok(Received::Closed)
            }
            Err(error) => {
                self.open = false;
                Err(error)
            }
        }
    }

    async fn try_receive(&mut self) -> Result<Option<Message>, CommunicationError> {
        let Some(payload) = frame::read_frame(&mut self.stream).await? else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::write_frame;
    use crate::types::Value;
    use tokio::io::AsyncWriteExt;

    fn sessions() -> (Session<tokio::io::DuplexStream>, Session<tokio::io::DuplexStream>) {
        let (near, far) = tokio::io::duplex(1024);
        (Session::new(near), Session::new(far))
    }

    #[tokio::test]
    async fn messages_alternate_between_peers() {
        let (mut near, mut far) = sessions();

        let call = Message::Call {
            method: "echo".to_owned(),
            arguments: vec![Value::Int(3)],
        };
        near.send(&call).await.unwrap();
        match far.receive().await.unwrap() {
            Received::Message(received) => assert_eq!(received, call),
            Received::Closed => panic!("peer saw a close"),
        }

        far.send(&Message::Return(Value::Int(3))).await.unwrap();
        match near.receive().await.unwrap() {
            Received::Message(Message::Return(value)) => assert_eq!(value, Value::Int(3)),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_shutdown_closes_the_session() {
        let (near, mut far) = sessions();
        drop(near);

        assert!(matches!(far.receive().await.unwrap(), Received::Closed));
        assert!(!far.is_open());
        assert!(matches!(
            far.receive().await,
            Err(CommunicationError::Closed)
        ));
        assert!(matches!(
            far.send(&Message::Return(Value::Nil)).await,
            Err(CommunicationError::Closed)
        ));
    }

    #[tokio::test]
    async fn undecodable_frame_closes_the_session() {
        let (mut raw, far) = tokio::io::duplex(1024);
        let mut far = Session::new(far);

        write_frame(&mut raw, b"\xff\xff\xff\xff not a message")
            .await
            .unwrap();
        assert!(matches!(
            far.receive().await,
            Err(CommunicationError::Serialization(_))
        ));
        assert!(!far.is_open());
    }

    #[tokio::test]
    async fn truncated_frame_closes_the_session() {
        let (mut raw, far) = tokio::io::duplex(1024);
        let mut far = Session::new(far);

        raw.write_all(&64u32.to_be_bytes()).await.unwrap();
        raw.write_all(b"short").await.unwrap();
        raw.shutdown().await.unwrap();
        drop(raw);

        assert!(matches!(
            far.receive().await,
            Err(CommunicationError::Transport(_))
        ));
        assert!(!far.is_open());
    }
}
