//! Wire types shared by `passmand` and its clients.
//!
//! Every message travels as an [`Envelope`]. The envelope names its
//! direction in `kind` and the concrete variant in `body.type`, so a reader
//! can rebuild the exact variant without being told what to expect:
//!
//! ```text
//! {"kind":"request","body":{"type":"get","payload":{"service":"github","username":"alice"}}}
//! ```

use crate::entry::Entry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Envelope {
    Request(Request),
    Response(Response),
}

impl Envelope {
    pub const KINDS: &'static [&'static str] = &["request", "response"];

    /// The variant tag carried in `body.type`.
    pub fn tag(&self) -> &'static str {
        match self {
            Envelope::Request(r) => r.tag(),
            Envelope::Response(r) => r.tag(),
        }
    }
}

impl From<Request> for Envelope {
    fn from(request: Request) -> Self {
        Envelope::Request(request)
    }
}

impl From<Response> for Envelope {
    fn from(response: Response) -> Self {
        Envelope::Response(response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Request {
    Add(AddRequest),
    Get(GetRequest),
    List(ListRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    Lock(LockRequest),
    Unlock(UnlockRequest),
}

impl Request {
    pub const TAGS: &'static [&'static str] =
        &["add", "get", "list", "update", "delete", "lock", "unlock"];

    pub fn tag(&self) -> &'static str {
        match self {
            Request::Add(_) => "add",
            Request::Get(_) => "get",
            Request::List(_) => "list",
            Request::Update(_) => "update",
            Request::Delete(_) => "delete",
            Request::Lock(_) => "lock",
            Request::Unlock(_) => "unlock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Response {
    AddResult(OpResult),
    GetResult(GetResult),
    ListResult(ListResult),
    UpdateResult(OpResult),
    DeleteResult(OpResult),
    LockResult(OpResult),
    UnlockResult(OpResult),
}

impl Response {
    pub const TAGS: &'static [&'static str] = &[
        "add_result",
        "get_result",
        "list_result",
        "update_result",
        "delete_result",
        "lock_result",
        "unlock_result",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Response::AddResult(_) => "add_result",
            Response::GetResult(_) => "get_result",
            Response::ListResult(_) => "list_result",
            Response::UpdateResult(_) => "update_result",
            Response::DeleteResult(_) => "delete_result",
            Response::LockResult(_) => "lock_result",
            Response::UnlockResult(_) => "unlock_result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRequest {
    pub service: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl From<AddRequest> for Entry {
    fn from(req: AddRequest) -> Self {
        Entry {
            service: req.service,
            username: req.username,
            password: req.password,
            notes: req.notes,
            expiry: req.expiry,
        }
    }
}

impl From<Entry> for AddRequest {
    fn from(entry: Entry) -> Self {
        AddRequest {
            service: entry.service,
            username: entry.username,
            password: entry.password,
            notes: entry.notes,
            expiry: entry.expiry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub service: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub service: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub service: String,
    pub username: String,
}

/// Master-password attempt. Encryption at rest is not implemented; the
/// password only arms and disarms the store's lock gate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

impl std::fmt::Debug for LockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRequest").field("password", &"<redacted>").finish()
    }
}

impl std::fmt::Debug for UnlockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockRequest").field("password", &"<redacted>").finish()
    }
}

/// Outcome shape shared by every mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for OpResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => OpResult::ok(),
            Err(e) => OpResult::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResult {
    /// False when no entry matched; the remaining fields are then empty.
    pub found: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl GetResult {
    pub fn not_found() -> Self {
        Self::default()
    }
}

impl From<Entry> for GetResult {
    fn from(entry: Entry) -> Self {
        Self {
            found: true,
            password: entry.password,
            notes: entry.notes,
            expiry: entry.expiry,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    pub entries: Vec<Entry>,
}
