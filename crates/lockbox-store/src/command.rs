//! The command surface: string-dispatched operations as a typed enum.
//!
//! Mirrors a host method channel: `method` selects the operation and the
//! arguments ride alongside it. Dispatch is exhaustive, so an unknown
//! method fails at deserialization instead of at a default match arm.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;
use crate::store::SecureStore;

/// One store operation, tagged the way host channels spell them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Command {
    Write { key: String, value: String },
    Read { key: String },
    ReadAll,
    Delete { key: String },
    DeleteAll,
}

impl Command {
    /// Wire name of the operation, for error reporting.
    pub fn method(&self) -> &'static str {
        match self {
            Command::Write { .. } => "write",
            Command::Read { .. } => "read",
            Command::ReadAll => "readAll",
            Command::Delete { .. } => "delete",
            Command::DeleteAll => "deleteAll",
        }
    }
}

/// Successful dispatch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Mutation acknowledged.
    Done,
    /// Value for a single read, when present.
    Value(Option<String>),
    /// The whole decrypted namespace.
    Entries(HashMap<String, String>),
}

/// A failed command: the generic failure signal hosts expect, carrying the
/// method name, with the original cause attached as the error source.
#[derive(Debug, Error)]
#[error("secure storage command \"{method}\" failed")]
pub struct CommandError {
    pub method: &'static str,
    #[source]
    pub source: StoreError,
}

/// Route one command to the store.
pub fn dispatch(store: &SecureStore, command: Command) -> Result<Reply, CommandError> {
    let method = command.method();
    let fail = |source| CommandError { method, source };
    match command {
        Command::Write { key, value } => {
            store.put(&key, &value).map_err(fail)?;
            Ok(Reply::Done)
        }
        Command::Read { key } => Ok(Reply::Value(store.get(&key).map_err(fail)?)),
        Command::ReadAll => Ok(Reply::Entries(store.get_all().map_err(fail)?)),
        Command::Delete { key } => {
            store.delete(&key).map_err(fail)?;
            Ok(Reply::Done)
        }
        Command::DeleteAll => {
            store.clear().map_err(fail)?;
            Ok(Reply::Done)
        }
    }
}
