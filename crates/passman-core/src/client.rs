use crate::codec::{read_envelope, write_envelope, CodecError};
use crate::entry::Entry;
use crate::error::{Result, VaultError};
use crate::protocol::{
    AddRequest, DeleteRequest, Envelope, GetRequest, GetResult, ListRequest, LockRequest,
    OpResult, Request, Response, UnlockRequest, UpdateRequest,
};
use std::path::PathBuf;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Talks to `passmand`. Every call opens a fresh connection and performs a
/// single request/response exchange.
#[derive(Debug, Clone)]
pub struct VaultClient {
    socket_path: PathBuf,
}

impl VaultClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn send(&self, request: Request) -> Result<Response> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (read_half, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        write_envelope(&mut writer, &Envelope::Request(request)).await?;
        writer.shutdown().await?;

        match read_envelope(&mut reader).await {
            Ok(Envelope::Response(response)) => Ok(response),
            Ok(Envelope::Request(other)) => Err(VaultError::UnexpectedResponse(other.tag().to_string())),
            Err(CodecError::Closed) => Err(VaultError::UnexpectedResponse(
                "daemon closed the connection without answering".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn add(&self, entry: Entry) -> Result<()> {
        match self.send(Request::Add(AddRequest::from(entry))).await? {
            Response::AddResult(result) => check(result),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get(&self, service: &str, username: &str) -> Result<GetResult> {
        let request = Request::Get(GetRequest {
            service: service.to_string(),
            username: username.to_string(),
        });
        match self.send(request).await? {
            Response::GetResult(result) if result.found => Ok(result),
            Response::GetResult(_) => Err(VaultError::not_found(service, username)),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list(&self, query: Option<String>) -> Result<Vec<Entry>> {
        match self.send(Request::List(ListRequest { query })).await? {
            Response::ListResult(result) => Ok(result.entries),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn update(
        &self,
        service: &str,
        username: &str,
        password: &str,
        notes: Option<String>,
    ) -> Result<()> {
        let request = Request::Update(UpdateRequest {
            service: service.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            notes,
        });
        match self.send(request).await? {
            Response::UpdateResult(result) => check(result),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn delete(&self, service: &str, username: &str) -> Result<()> {
        let request = Request::Delete(DeleteRequest {
            service: service.to_string(),
            username: username.to_string(),
        });
        match self.send(request).await? {
            Response::DeleteResult(result) => check(result),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn lock(&self, password: &str) -> Result<()> {
        let request = Request::Lock(LockRequest {
            password: password.to_string(),
        });
        match self.send(request).await? {
            Response::LockResult(result) => check(result),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn unlock(&self, password: &str) -> Result<()> {
        let request = Request::Unlock(UnlockRequest {
            password: password.to_string(),
        });
        match self.send(request).await? {
            Response::UnlockResult(result) => check(result),
            other => Err(unexpected(&other)),
        }
    }
}

fn check(result: OpResult) -> Result<()> {
    if result.success {
        Ok(())
    } else {
        Err(VaultError::Rejected(
            result.error.unwrap_or_else(|| "request failed".to_string()),
        ))
    }
}

fn unexpected(response: &Response) -> VaultError {
    VaultError::UnexpectedResponse(response.tag().to_string())
}
