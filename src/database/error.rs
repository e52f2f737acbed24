use std::fmt::{self, Display};

use potion::{Error, HtmlError};

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        let error = match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new("RowNotFound".to_owned()),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_owned()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_owned()),
            sqlx::Error::WorkerCrashed => Self::new("Worker crashed".to_owned()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new("Unknown error".to_owned()),
        };
        log::error!("> Query failed: {}", error.info);
        error
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Malformed request input: bad query strings, unknown enum variants.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Rejected input that parsed fine but breaks a domain rule.
#[derive(Debug)]
pub struct ValidationError {
    info: String,
}

impl ValidationError {
    pub fn new(info: impl Into<String>) -> Self {
        Self { info: info.into() }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Error {
            code: 400,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct NotFoundError {
    info: String,
}

impl NotFoundError {
    pub fn new(info: impl Into<String>) -> Self {
        Self { info: info.into() }
    }
}

impl From<NotFoundError> for Error {
    fn from(value: NotFoundError) -> Self {
        Error {
            code: 404,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct PermissionError;

impl From<PermissionError> for Error {
    fn from(_: PermissionError) -> Self {
        Error {
            code: 403,
            info: Some("You don't have permission to perform this action".to_owned()),
            redirect: None,
        }
    }
}

pub struct AuthError {
    info: String,
}

impl AuthError {
    pub fn new(info: impl Into<String>) -> Self {
        Self { info: info.into() }
    }
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        Error {
            code: 401,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct MediaError {
    info: String,
}

impl From<std::io::Error> for MediaError {
    fn from(value: std::io::Error) -> Self {
        log::error!("> Media storage failed: {value}");
        Self {
            info: format!("Failed to store media: {value}"),
        }
    }
}

impl From<MediaError> for Error {
    fn from(value: MediaError) -> Self {
        HtmlError::InternalServerError.new(&value.info)
    }
}
