//! Durable store over SQLite via `sqlx`.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE todos (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,
//!     id TEXT NOT NULL UNIQUE,
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL,
//!     completed BOOLEAN NOT NULL,
//!     created_at INTEGER NOT NULL,  -- Unix milliseconds
//!     updated_at INTEGER NOT NULL   -- Unix milliseconds
//! );
//! ```
//!
//! `seq` fixes insertion order and, being `AUTOINCREMENT`, is never reused.
//! Updates are a single `UPDATE ... RETURNING` statement, so concurrent writes
//! to one todo resolve last-write-wins without losing fields.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{StoreError, TodoStore};
use crate::model::{self, NewTodo, ObjectId, Todo, TodoPatch};

const MAX_CONNECTIONS: u32 = 8;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 100),
    description TEXT NOT NULL DEFAULT '' CHECK (length(description) <= 500),
    completed BOOLEAN NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL CHECK (updated_at >= created_at)
)";

const INSERT: &str = "INSERT INTO todos (id, title, description, completed, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)";

const SELECT_ALL: &str =
    "SELECT id, title, description, completed, created_at, updated_at FROM todos ORDER BY seq";

const SELECT_ONE: &str =
    "SELECT id, title, description, completed, created_at, updated_at FROM todos WHERE id = ?";

const UPDATE: &str = "UPDATE todos SET
    title = COALESCE(?, title),
    description = COALESCE(?, description),
    completed = COALESCE(?, completed),
    updated_at = MAX(?, updated_at + 1)
    WHERE id = ?
    RETURNING id, title, description, completed, created_at, updated_at";

const DELETE: &str = "DELETE FROM todos WHERE id = ?";

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: String,
    title: String,
    description: String,
    completed: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<TodoRow> for Todo {
    type Error = StoreError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse::<ObjectId>()
            .map_err(|e| StoreError::Unavailable(format!("corrupt row: {e}")))?;
        Ok(Self {
            id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: from_millis(row.created_at, id)?,
            updated_at: from_millis(row.updated_at, id)?,
        })
    }
}

fn from_millis(millis: i64, id: ObjectId) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Unavailable(format!("corrupt timestamp {millis} on todo {id}")))
}

#[derive(Clone, Debug)]
pub struct SqliteTodoStore {
    pool: SqlitePool,
}

impl SqliteTodoStore {
    /// Connect to `url` (for example `sqlite://todos.db?mode=rwc` or
    /// `sqlite::memory:`) and create the schema if needed.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// are pinned to a single connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };
        let pool = pool_options.connect_with(options).await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        tracing::debug!("todos schema ready");
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn insert(&self, fields: NewTodo) -> Result<Todo, StoreError> {
        let todo = fields.validate()?.into_todo(ObjectId::generate(), model::now());
        sqlx::query(INSERT)
            .bind(todo.id.to_string())
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(todo.created_at.timestamp_millis())
            .bind(todo.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        sqlx::query_as::<_, TodoRow>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Todo::try_from)
            .collect()
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Todo, StoreError> {
        sqlx::query_as::<_, TodoRow>(SELECT_ONE)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    // Each provided field is checked on its own; stored fields already
    // satisfy their constraints, so the merged row does too.
    async fn update_by_id(&self, id: ObjectId, patch: TodoPatch) -> Result<Todo, StoreError> {
        let changes = patch.validate()?;
        sqlx::query_as::<_, TodoRow>(UPDATE)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.completed)
            .bind(model::now().timestamp_millis())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<(), StoreError> {
        let result = sqlx::query(DELETE)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DESCRIPTION_TOO_LONG, TITLE_REQUIRED};

    async fn store() -> SqliteTodoStore {
        SqliteTodoStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_find_round_trips_every_field() {
        let store = store().await;
        let created = store
            .insert(
                NewTodo::titled("New todo")
                    .with_description("New todo description")
                    .with_completed(true),
            )
            .await
            .unwrap();
        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, created);
        assert!(found.completed);
    }

    #[tokio::test]
    async fn insert_reports_all_violations() {
        let store = store().await;
        let input = NewTodo {
            title: Some("   ".to_string()),
            description: Some("d".repeat(501)),
            completed: None,
        };
        match store.insert(input).await.unwrap_err() {
            StoreError::Validation(errors) => {
                assert_eq!(errors.message("title"), Some(TITLE_REQUIRED));
                assert_eq!(errors.message("description"), Some(DESCRIPTION_TOO_LONG));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_all_is_ordered_by_insertion() {
        let store = store().await;
        assert!(store.find_all().await.unwrap().is_empty());
        store
            .insert(NewTodo::titled("First todo").with_description("First todo description"))
            .await
            .unwrap();
        store
            .insert(NewTodo::titled("Second todo").with_description("Second todo description"))
            .await
            .unwrap();
        let todos = store.find_all().await.unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].title, "First todo");
        assert_eq!(todos[1].title, "Second todo");
    }

    #[tokio::test]
    async fn update_touches_only_provided_fields() {
        let store = store().await;
        let created = store
            .insert(NewTodo::titled("Original title").with_description("Original description"))
            .await
            .unwrap();

        let updated = store
            .update_by_id(
                created.id,
                TodoPatch::default().with_title("Updated title").with_completed(true),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Updated title");
        assert_eq!(updated.description, "Original description");
        assert!(updated.completed);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let reset = store
            .update_by_id(created.id, TodoPatch::default().with_completed(false))
            .await
            .unwrap();
        assert!(!reset.completed);
        assert!(reset.updated_at > updated.updated_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_to_one_todo_are_both_kept() {
        let store = store().await;
        let created = store.insert(NewTodo::titled("before")).await.unwrap();

        let retitle = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(created.id, TodoPatch::default().with_title("after"))
                    .await
            })
        };
        let complete = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(created.id, TodoPatch::default().with_completed(true))
                    .await
            })
        };
        let first = retitle.await.unwrap().unwrap();
        let second = complete.await.unwrap().unwrap();
        assert_ne!(first.updated_at, second.updated_at);

        let stored = store.find_by_id(created.id).await.unwrap();
        assert_eq!(stored.title, "after");
        assert!(stored.completed);
        assert_eq!(stored.updated_at, first.updated_at.max(second.updated_at));
    }

    #[tokio::test]
    async fn update_and_delete_missing_id_are_not_found() {
        let store = store().await;
        let id = ObjectId::generate();
        assert!(matches!(
            store.update_by_id(id, TodoPatch::default().with_title("x")).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.delete_by_id(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn deleted_todo_is_gone() {
        let store = store().await;
        let created = store.insert(NewTodo::titled("Todo to delete")).await.unwrap();
        store.delete_by_id(created.id).await.unwrap();
        assert!(matches!(
            store.find_by_id(created.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_survives_reconnect_to_file() {
        let dir = std::env::temp_dir().join(format!("todo-server-{}", ObjectId::generate()));
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.join("todos.db").display());

        let created = {
            let store = SqliteTodoStore::connect(&url).await.unwrap();
            let created = store.insert(NewTodo::titled("durable")).await.unwrap();
            store.pool().close().await;
            created
        };

        let store = SqliteTodoStore::connect(&url).await.unwrap();
        assert_eq!(store.find_by_id(created.id).await.unwrap(), created);
        store.pool().close().await;
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
