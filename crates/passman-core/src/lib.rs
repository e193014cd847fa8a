//! passman-core: the vault RPC service shared by `passmand` and `passman`.
//!
//! - `protocol` / `codec`: tagged envelopes, newline-delimited JSON on the wire
//! - `store`: SQLite entry table with the lock gate from `lock`
//! - `dispatch`: request variant to store operation
//! - `server` / `client`: the Unix socket ends of one exchange

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod lock;
pub mod paths;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod store;

pub use client::VaultClient;
pub use dispatch::{DispatchError, Dispatcher, RequestHandler};
pub use entry::Entry;
pub use error::VaultError;
pub use protocol::{Envelope, Request, Response};
pub use server::VaultServer;
pub use store::{EntryStore, VaultStore};
