//! Todo CRUD service over HTTP.
//!
//! # Overview
//! A single-resource JSON API: `GET|POST /todos`, `GET|PUT|DELETE /todos/{id}`.
//! Every response body is an envelope, `{ success, data }` or
//! `{ success: false, error }`.
//!
//! # Design
//! - `store` persists todos and owns field constraints (`TodoStore` trait,
//!   SQLite and in-memory backends).
//! - `service` validates identifiers, delegates to the store, and renders
//!   envelopes. It holds the store handle it was built with and nothing else.
//! - `routes` is a thin axum adapter over the service.

pub mod config;
pub mod envelope;
pub mod logging;
pub mod model;
pub mod routes;
pub mod service;
pub mod store;

use std::future::Future;

use tokio::net::TcpListener;

pub use config::{Config, ConfigError, StorageMode};
pub use envelope::{Envelope, ErrorDetail, Reply};
pub use model::{Body, NewTodo, ObjectId, Todo, TodoPatch, ValidationError};
pub use routes::app;
pub use service::{Payload, ServiceError, TodoService};
pub use store::{MemoryTodoStore, SqliteTodoStore, StoreError, TodoStore};

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, service: TodoService, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(service))
        .with_graceful_shutdown(shutdown)
        .await
}
