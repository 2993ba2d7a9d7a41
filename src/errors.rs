//! Error types for trellis operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/////////////////////////////////////////////// ErrorKind //////////////////////////////////////////////

/// The status class of a [`ResourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed body shape, wrong cardinality, missing required field.
    BadRequest,
    /// A root interface step excludes the caller's active roles.
    Unauthorized,
    /// The call is not available in this deployment.
    Forbidden,
    /// Unknown resource, subinterface or path target.
    NotFound,
    /// A CRUD flag denies the requested verb on a step.
    MethodNotAllowed,
    /// Inconsistent walker state, failed file move and the like.
    Internal,
    /// A declared verb that is not built.
    NotImplemented,
}

impl ErrorKind {
    /// Returns the numeric HTTP status code of this kind.
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Internal => 500,
            ErrorKind::NotImplemented => 501,
        }
    }

    /// Returns the HTTP status of this kind.
    pub fn status(self) -> StatusCode {
        StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

///////////////////////////////////////////// ResourceError ////////////////////////////////////////////

/// Error raised by resource navigation and mutation.
///
/// Every error carries a status class and a human-readable message. Messages name the
/// offending path and, for patch documents, the index of the offending entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceError {
    kind: ErrorKind,
    message: String,
}

impl ResourceError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A 400 error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// A 401 error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// A 403 error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// A 404 error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A 405 error.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    /// A 500 error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// A 501 error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// The status class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.code())
    }
}

impl std::error::Error for ResourceError {}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind.code(),
            "msg": self.message,
        });
        (self.kind.status(), Json(body)).into_response()
    }
}

impl From<DataStoreError> for ResourceError {
    fn from(e: DataStoreError) -> Self {
        match e {
            DataStoreError::NotFound => ResourceError::not_found(e.to_string()),
            _ => ResourceError::internal(e.to_string()),
        }
    }
}

//////////////////////////////////////////// DataStoreError ////////////////////////////////////////////

/// Errors that can occur during atom store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStoreError {
    /// The requested item was not found in the data store.
    NotFound,
    /// An item with the same identifier already exists.
    AlreadyExists,
    /// JSON serialization or deserialization failed.
    SerializationError(String),
    /// An I/O operation failed.
    IoError(String),
    /// An internal storage system error occurred.
    Internal(String),
}

impl std::fmt::Display for DataStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Item not found in data store"),
            Self::AlreadyExists => write!(f, "Item already exists in data store"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::IoError(msg) => write!(f, "IO error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DataStoreError {}

////////////////////////////////////////////// ModelError //////////////////////////////////////////////

/// Configuration errors raised while loading the model snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A model file could not be read.
    Io(String),
    /// A model document could not be parsed.
    Parse(String),
    /// An interface object carries a node type that is not supported.
    UnsupportedNodeType(String),
    /// The root of an interface must be an expression node.
    RootNotExpression(String),
    /// A relation signature does not have the form `name[Src*Tgt]`.
    InvalidSignature(String),
    /// A definition references a concept that is not declared.
    UnknownConcept(String),
    /// A definition references a relation that is not declared.
    UnknownRelation(String),
    /// A definition references an interface that is not declared.
    UnknownInterface(String),
    /// A definition references a view that is not declared.
    UnknownView(String),
    /// Two definitions share an identifier.
    Duplicate(String),
    /// The definition is internally inconsistent.
    Invalid(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Cannot read model file: {}", msg),
            Self::Parse(msg) => write!(f, "Cannot parse model document: {}", msg),
            Self::UnsupportedNodeType(t) => write!(
                f,
                "Unsupported/unknown interface object type specified: '{}' is not supported",
                t
            ),
            Self::RootNotExpression(id) => write!(
                f,
                "Interface '{}' must have an expression object as its root",
                id
            ),
            Self::InvalidSignature(sig) => write!(
                f,
                "Invalid relation signature '{}', expected 'name[Src*Tgt]'",
                sig
            ),
            Self::UnknownConcept(c) => write!(f, "Concept '{}' is not defined", c),
            Self::UnknownRelation(r) => write!(f, "Relation '{}' is not defined", r),
            Self::UnknownInterface(i) => write!(f, "Interface '{}' is not defined", i),
            Self::UnknownView(v) => write!(f, "View '{}' is not defined", v),
            Self::Duplicate(id) => write!(f, "Duplicate definition of '{}'", id),
            Self::Invalid(msg) => write!(f, "Invalid model definition: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<ModelError> for ResourceError {
    fn from(e: ModelError) -> Self {
        ResourceError::internal(e.to_string())
    }
}
