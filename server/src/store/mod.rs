//! Persistence of todos behind the [`TodoStore`] trait.
//!
//! # Design
//! Stores own field constraints: every write validates its input and reports
//! all violations together. Identifiers arrive already parsed as
//! [`ObjectId`], so a malformed id cannot reach this layer.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageMode;
use crate::model::{NewTodo, ObjectId, Todo, TodoPatch, ValidationError};

mod memory;
mod sqlite;

pub use memory::MemoryTodoStore;
pub use sqlite::SqliteTodoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No live todo has the requested id.
    #[error("todo not found")]
    NotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend failed for a reason unrelated to the input.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Validate and persist a new todo, assigning its id and timestamps.
    async fn insert(&self, fields: NewTodo) -> Result<Todo, StoreError>;

    /// Every live todo, oldest first.
    async fn find_all(&self) -> Result<Vec<Todo>, StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Todo, StoreError>;

    /// Merge the provided fields into the stored todo and refresh
    /// `updated_at`. Fields absent from `patch` keep their values.
    async fn update_by_id(&self, id: ObjectId, patch: TodoPatch) -> Result<Todo, StoreError>;

    async fn delete_by_id(&self, id: ObjectId) -> Result<(), StoreError>;
}

/// Open the backend selected by `mode`. `database_url` is ignored for the
/// in-memory store.
pub async fn open(mode: StorageMode, database_url: &str) -> Result<Arc<dyn TodoStore>, StoreError> {
    match mode {
        StorageMode::Memory => Ok(Arc::new(MemoryTodoStore::new())),
        StorageMode::Sqlite => Ok(Arc::new(SqliteTodoStore::connect(database_url).await?)),
    }
}
