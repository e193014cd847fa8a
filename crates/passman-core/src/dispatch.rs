use crate::entry::Entry;
use crate::error::VaultError;
use crate::protocol::{Envelope, GetResult, ListResult, Request, Response};
use crate::store::EntryStore;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unsupported request: {0}")]
    Unsupported(String),
    #[error("store failure: {0}")]
    Store(#[from] VaultError),
    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Turns one decoded envelope into the response that answers it.
#[async_trait::async_trait]
pub trait RequestHandler {
    async fn handle(&self, envelope: Envelope) -> Result<Response, DispatchError>;
}

/// Routes each request variant to the matching store operation.
pub struct Dispatcher<S> {
    store: Arc<S>,
}

impl<S: EntryStore + 'static> Dispatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn dispatch(&self, envelope: Envelope) -> Result<Response, DispatchError> {
        let request = match envelope {
            Envelope::Request(request) => request,
            Envelope::Response(response) => {
                return Err(DispatchError::Unsupported(response.tag().to_string()))
            }
        };
        debug!(request = request.tag(), "dispatching");

        let response = match request {
            Request::Add(req) => {
                let entry = Entry::from(req);
                let result = self.run(move |store| store.add(&entry)).await?;
                Response::AddResult(result.into())
            }
            Request::Get(req) => {
                let result = self
                    .run(move |store| store.get(&req.service, &req.username))
                    .await?;
                match result {
                    Ok(entry) => Response::GetResult(GetResult::from(entry)),
                    Err(VaultError::NotFound { .. }) => Response::GetResult(GetResult::not_found()),
                    Err(e) => return Err(e.into()),
                }
            }
            Request::List(req) => {
                let query = req.query.unwrap_or_default();
                let entries = self.run(move |store| store.list(&query)).await??;
                Response::ListResult(ListResult { entries })
            }
            Request::Update(req) => {
                let result = self
                    .run(move |store| {
                        store.update(&req.service, &req.username, &req.password, req.notes.as_deref())
                    })
                    .await?;
                Response::UpdateResult(result.into())
            }
            Request::Delete(req) => {
                let result = self
                    .run(move |store| store.delete(&req.service, &req.username))
                    .await?;
                Response::DeleteResult(result.into())
            }
            Request::Lock(req) => {
                let result = self.run(move |store| store.lock(&req.password)).await?;
                Response::LockResult(result.into())
            }
            Request::Unlock(req) => {
                let result = self.run(move |store| store.unlock(&req.password)).await?;
                Response::UnlockResult(result.into())
            }
        };
        Ok(response)
    }

    /// Runs a store call on the blocking pool; SQLite I/O must not stall
    /// the connection tasks.
    async fn run<T, F>(&self, op: F) -> Result<T, tokio::task::JoinError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> T + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref())).await
    }
}

#[async_trait::async_trait]
impl<S: EntryStore + 'static> RequestHandler for Dispatcher<S> {
    async fn handle(&self, envelope: Envelope) -> Result<Response, DispatchError> {
        self.dispatch(envelope).await
    }
}
