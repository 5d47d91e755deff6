//! # Errors
//!
//! Structured errors shared by the remote-facing crates (`wed-docs`,
//! `wed-auth`). A `WedError` lives inside `anyhow::Error` so adapters can
//! use `?` freely while callers still recover the kind:
//!
//! ```rust
//! use wed_core::{WedError, ErrorKind};
//!
//! let err = WedError::not_found("listing photos/u1/abc").into_anyhow();
//! assert_eq!(WedError::kind_of(&err), ErrorKind::NotFound);
//! ```

use std::fmt;

use anyhow::Error as AnyError;

/// Result type for the core remote-facing APIs.
pub type WedResult<T> = std::result::Result<T, AnyError>;

/// Error classes a remote collaborator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    Forbidden,
    NotFound,
    Unprocessable,
    GeneralError,
    Unavailable,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }
}

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct WedError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl WedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `WedError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&WedError> {
        err.downcast_ref::<WedError>()
    }

    /// Kind of any error; foreign errors count as `GeneralError`.
    pub fn kind_of(err: &AnyError) -> ErrorKind {
        Self::from_anyhow(err)
            .map(|e| e.kind)
            .unwrap_or(ErrorKind::GeneralError)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for WedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message)
    }
}

impl std::error::Error for WedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Bail out of an `anyhow`-returning function with a `WedError`.
#[macro_export]
macro_rules! bail_wed {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::WedError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::WedError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
