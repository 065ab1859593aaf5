//! HTTP adapter: maps verbs and paths onto [`TodoService`] operations.
//!
//! Todo routes are served both at the root (`/todos`) and under `/api`.
//! Bodies are decoded only as far as a JSON object; a rejection is handed to
//! the service as its message, which answers with a 400 envelope rather than
//! axum's plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::envelope::Reply;
use crate::model::Body;
use crate::service::{Payload, TodoService};

pub const BANNER: &str = "Todo API is running...";

pub fn app(service: TodoService) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(todo_routes())
        .nest("/api", todo_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

fn todo_routes() -> Router<TodoService> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

async fn index() -> &'static str {
    BANNER
}

async fn not_found() -> Reply {
    Reply::error(StatusCode::NOT_FOUND, "Not found")
}

async fn list_todos(State(service): State<TodoService>) -> Reply {
    service.list().await
}

async fn create_todo(
    State(service): State<TodoService>,
    payload: Result<Json<Body>, JsonRejection>,
) -> Reply {
    service.create(decoded(payload)).await
}

async fn get_todo(State(service): State<TodoService>, Path(id): Path<String>) -> Reply {
    service.get(&id).await
}

async fn update_todo(
    State(service): State<TodoService>,
    Path(id): Path<String>,
    payload: Result<Json<Body>, JsonRejection>,
) -> Reply {
    service.update(&id, decoded(payload)).await
}

async fn delete_todo(State(service): State<TodoService>, Path(id): Path<String>) -> Reply {
    service.delete(&id).await
}

fn decoded(payload: Result<Json<Body>, JsonRejection>) -> Payload {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| rejection.body_text())
}
