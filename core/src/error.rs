//! Error types for the todo API client.
//!
//! # Design
//! The server's error envelope is decoded into the matching variant, so
//! callers can tell a malformed id from a missing todo from a rejected
//! payload. Anything unrecognised lands in `HttpError` with the raw status
//! and body.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 404: no todo (or route) at that path.
    #[error("resource not found")]
    NotFound,

    /// 400: the id is not a well-formed todo identifier.
    #[error("invalid todo id")]
    InvalidIdentifier,

    /// 400: one message per rejected field.
    #[error("validation failed: {0:?}")]
    Validation(BTreeMap<String, String>),

    /// 400 with any other message, e.g. an undecodable body.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}
