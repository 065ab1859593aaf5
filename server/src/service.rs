//! Request-facing todo operations.
//!
//! # Design
//! `TodoService` is stateless apart from the store handle it is built with.
//! Each operation validates the identifier shape first, then casts the request
//! body, delegates persistence, and turns the outcome into a [`Reply`]. Every
//! failure is recovered here; nothing propagates past this boundary.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::envelope::{Envelope, ErrorDetail, Reply};
use crate::model::{Body, NewTodo, ObjectId, TodoPatch, ValidationError};
use crate::store::{StoreError, TodoStore};

pub const INVALID_ID_MESSAGE: &str = "Invalid todo ID";
pub const NOT_FOUND_MESSAGE: &str = "Todo not found";
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

/// A request body as the HTTP layer decoded it, or the decoder's message.
pub type Payload = Result<Body, String>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The id is not a well-formed identifier; the store was not consulted.
    #[error("invalid todo id")]
    InvalidIdentifier,

    #[error("todo not found")]
    NotFound,

    #[error(transparent)]
    Validation(ValidationError),

    /// The request body could not be decoded as a todo payload.
    #[error("malformed body: {0}")]
    MalformedBody(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::Validation(errors) => Self::Validation(errors),
            StoreError::Unavailable(detail) => Self::StoreUnavailable(detail),
        }
    }
}

impl ServiceError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier | Self::Validation(_) | Self::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as an error envelope. Store details are logged, not sent.
    pub fn into_reply(self) -> Reply {
        let status = self.status();
        let detail = match self {
            Self::InvalidIdentifier => ErrorDetail::Message(INVALID_ID_MESSAGE.to_string()),
            Self::NotFound => ErrorDetail::Message(NOT_FOUND_MESSAGE.to_string()),
            Self::Validation(errors) => ErrorDetail::Fields(errors.into_fields()),
            Self::MalformedBody(message) => ErrorDetail::Message(message),
            Self::StoreUnavailable(detail) => {
                tracing::error!(%detail, "store failure");
                ErrorDetail::Message(SERVER_ERROR_MESSAGE.to_string())
            }
        };
        Reply::new(status, Envelope::failure(detail))
    }
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl std::fmt::Debug for TodoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoService")
            .field("store", &"Arc<dyn TodoStore>")
            .finish()
    }
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Reply {
        let result = self.store.find_all().await.map(Envelope::list);
        respond(StatusCode::OK, result.map_err(ServiceError::from))
    }

    pub async fn get(&self, id: &str) -> Reply {
        respond(StatusCode::OK, self.try_get(id).await)
    }

    pub async fn create(&self, payload: Payload) -> Reply {
        respond(StatusCode::CREATED, self.try_create(payload).await)
    }

    /// Apply only the fields present in `payload`. A malformed `id` is
    /// reported ahead of any problem with the body.
    pub async fn update(&self, id: &str, payload: Payload) -> Reply {
        respond(StatusCode::OK, self.try_update(id, payload).await)
    }

    pub async fn delete(&self, id: &str) -> Reply {
        respond(StatusCode::OK, self.try_delete(id).await)
    }

    async fn try_get(&self, id: &str) -> Result<Envelope, ServiceError> {
        let id = parse_id(id)?;
        Ok(Envelope::single(self.store.find_by_id(id).await?))
    }

    async fn try_create(&self, payload: Payload) -> Result<Envelope, ServiceError> {
        let input = NewTodo::from_body(&payload.map_err(ServiceError::MalformedBody)?)
            .map_err(ServiceError::Validation)?;
        let todo = self.store.insert(input).await?;
        tracing::info!(id = %todo.id, "todo created");
        Ok(Envelope::single(todo))
    }

    async fn try_update(&self, id: &str, payload: Payload) -> Result<Envelope, ServiceError> {
        let id = parse_id(id)?;
        let patch = TodoPatch::from_body(&payload.map_err(ServiceError::MalformedBody)?)
            .map_err(ServiceError::Validation)?;
        let todo = self.store.update_by_id(id, patch).await?;
        tracing::info!(%id, "todo updated");
        Ok(Envelope::single(todo))
    }

    async fn try_delete(&self, id: &str) -> Result<Envelope, ServiceError> {
        let id = parse_id(id)?;
        self.store.delete_by_id(id).await?;
        tracing::info!(%id, "todo deleted");
        Ok(Envelope::deleted())
    }
}

fn parse_id(id: &str) -> Result<ObjectId, ServiceError> {
    id.parse().map_err(|_| {
        tracing::debug!(id, "rejected malformed todo id");
        ServiceError::InvalidIdentifier
    })
}

fn respond(status: StatusCode, result: Result<Envelope, ServiceError>) -> Reply {
    match result {
        Ok(envelope) => Reply::new(status, envelope),
        Err(error) => {
            if !matches!(error, ServiceError::StoreUnavailable(_)) {
                tracing::debug!(%error, "request rejected");
            }
            error.into_reply()
        }
    }
}
