use crate::codec::{read_envelope, write_envelope, CodecError};
use crate::dispatch::RequestHandler;
use crate::error::Result;
use crate::protocol::{Envelope, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

pub type SharedHandler = Arc<dyn RequestHandler + Send + Sync>;

/// Accepts connections on the vault socket and serves each one on its own task.
pub struct VaultServer {
    socket_path: PathBuf,
    handler: SharedHandler,
}

impl VaultServer {
    pub fn new(socket_path: PathBuf, handler: SharedHandler) -> Self {
        Self {
            socket_path,
            handler,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket, replacing a stale socket file. Only the owner may connect.
    pub fn bind(&self) -> Result<UnixListener> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => debug!(path = %self.socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        info!(path = %self.socket_path.display(), "listening");
        Ok(listener)
    }

    /// Accept loop. Never waits on a connection task; returns only when
    /// `accept` itself fails.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        loop {
            let (stream, _addr) = listener.accept().await?;
            debug!("accepted connection");
            let handler = self.handler.clone();
            tokio::spawn(async move {
                handle_connection(stream, handler).await;
            });
        }
    }

    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One response was written.
    Answered(&'static str),
    /// The peer hung up before sending a request.
    PeerClosed,
    /// Closed without a response.
    Dropped(String),
}

enum Phase {
    AwaitingRequest,
    Dispatching(Envelope),
    WritingResponse(Response),
    Closed(Outcome),
}

/// Serves exactly one request/response exchange, then closes the stream.
pub async fn handle_connection<S>(stream: S, handler: SharedHandler) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let mut phase = Phase::AwaitingRequest;
    let outcome = loop {
        phase = match phase {
            Phase::AwaitingRequest => match read_envelope(&mut reader).await {
                Ok(envelope) => Phase::Dispatching(envelope),
                Err(CodecError::Closed) => Phase::Closed(Outcome::PeerClosed),
                Err(e) => {
                    warn!(error = %e, "protocol error");
                    Phase::Closed(Outcome::Dropped(e.to_string()))
                }
            },
            Phase::Dispatching(envelope) => {
                let tag = envelope.tag();
                match handler.handle(envelope).await {
                    Ok(response) => Phase::WritingResponse(response),
                    Err(e) => {
                        warn!(request = tag, error = %e, "request failed");
                        Phase::Closed(Outcome::Dropped(e.to_string()))
                    }
                }
            }
            Phase::WritingResponse(response) => {
                let tag = response.tag();
                match write_envelope(&mut writer, &Envelope::Response(response)).await {
                    Ok(()) => Phase::Closed(Outcome::Answered(tag)),
                    Err(e) => {
                        warn!(response = tag, error = %e, "failed to write response");
                        Phase::Closed(Outcome::Dropped(e.to_string()))
                    }
                }
            }
            Phase::Closed(outcome) => break outcome,
        };
    };

    let _ = writer.shutdown().await;
    match &outcome {
        Outcome::PeerClosed => debug!("peer closed before sending a request"),
        Outcome::Answered(tag) => debug!(response = *tag, "connection served"),
        Outcome::Dropped(_) => {}
    }
    outcome
}
