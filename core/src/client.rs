//! Stateless HTTP request builder and envelope parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url`. Each CRUD operation has a `build_*`
//! method producing an `HttpRequest` and a `parse_*` method consuming an
//! `HttpResponse`. Error envelopes are mapped onto `ApiError` variants in
//! one place, `error_from`.

use serde::de::{DeserializeOwned, IgnoredAny};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTodo, Envelope, ErrorBody, Todo, UpdateTodo};

const INVALID_ID_MESSAGE: &str = "Invalid todo ID";

#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    /// `base_url` may include a path prefix such as `/api`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/todos".to_string(), None)
    }

    pub fn build_get_todo(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/todos/{id}"), None)
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        let body = encode(input)?;
        Ok(self.request(HttpMethod::Post, "/todos".to_string(), Some(body)))
    }

    pub fn build_update_todo(&self, id: &str, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        let body = encode(input)?;
        Ok(self.request(HttpMethod::Put, format!("/todos/{id}"), Some(body)))
    }

    pub fn build_delete_todo(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/todos/{id}"), None)
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        let envelope: Envelope<Vec<Todo>> = decode(&response, 200)?;
        let count = envelope.count;
        let todos = require_data(envelope)?;
        match count {
            Some(count) if count == todos.len() => Ok(todos),
            other => Err(ApiError::DeserializationError(format!(
                "count {other:?} does not match {} items",
                todos.len()
            ))),
        }
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        require_data(decode(&response, 200)?)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        require_data(decode(&response, 201)?)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        require_data(decode(&response, 200)?)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        let _: IgnoredAny = require_data(decode(&response, 200)?)?;
        Ok(())
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        let headers = if body.is_some() {
            vec![("content-type".to_string(), "application/json".to_string())]
        } else {
            Vec::new()
        };
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }
}

fn encode<T: serde::Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Decode a success envelope, or map the response onto an `ApiError`.
fn decode<T: DeserializeOwned>(response: &HttpResponse, expected: u16) -> Result<Envelope<T>, ApiError> {
    if response.status != expected {
        return Err(error_from(response));
    }
    let envelope: Envelope<T> = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    if !envelope.success {
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body.clone(),
        });
    }
    Ok(envelope)
}

fn require_data<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    envelope
        .data
        .ok_or_else(|| ApiError::DeserializationError("envelope has no data".to_string()))
}

fn error_from(response: &HttpResponse) -> ApiError {
    let detail = serde_json::from_str::<Envelope<IgnoredAny>>(&response.body)
        .ok()
        .and_then(|envelope| envelope.error);
    match (response.status, detail) {
        (404, _) => ApiError::NotFound,
        (400, Some(ErrorBody::Fields(fields))) => ApiError::Validation(fields),
        (400, Some(ErrorBody::Message(message))) if message == INVALID_ID_MESSAGE => {
            ApiError::InvalidIdentifier
        }
        (400, Some(ErrorBody::Message(message))) => ApiError::BadRequest(message),
        (status, _) => ApiError::HttpError {
            status,
            body: response.body.clone(),
        },
    }
}
