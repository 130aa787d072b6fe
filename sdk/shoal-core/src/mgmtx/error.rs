use std::fmt::{Display, Formatter};

use crate::httpx::error::Error as HttpError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn new_server_error(kind: ServerErrorKind, status_code: u16, body: &[u8]) -> Self {
        Self {
            kind: Box::new(ErrorKind::Server {
                kind,
                status_code,
                body: String::from_utf8_lossy(body).to_string(),
            }),
        }
    }

    pub(crate) fn new_message_error(msg: impl Into<String>) -> Self {
        Self {
            kind: Box::new(ErrorKind::Message { msg: msg.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServerErrorKind {
    AccessDenied,
    BucketNotFound,
    BucketExists,
    ScopeNotFound,
    ScopeExists,
    CollectionNotFound,
    CollectionExists,
    Unexpected,
}

impl Display for ServerErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let txt = match self {
            ServerErrorKind::AccessDenied => "access denied",
            ServerErrorKind::BucketNotFound => "bucket not found",
            ServerErrorKind::BucketExists => "bucket already exists",
            ServerErrorKind::ScopeNotFound => "scope not found",
            ServerErrorKind::ScopeExists => "scope already exists",
            ServerErrorKind::CollectionNotFound => "collection not found",
            ServerErrorKind::CollectionExists => "collection already exists",
            ServerErrorKind::Unexpected => "unexpected server response",
        };

        write!(f, "{txt}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Http(HttpError),
    #[non_exhaustive]
    Server {
        kind: ServerErrorKind,
        status_code: u16,
        body: String,
    },
    #[non_exhaustive]
    Message {
        msg: String,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind.as_ref() {
            ErrorKind::Http(e) => write!(f, "{e}"),
            ErrorKind::Server {
                kind,
                status_code,
                body,
            } => {
                write!(f, "management error: {kind}, status: {status_code}, body: {body}")
            }
            ErrorKind::Message { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<HttpError> for Error {
    fn from(value: HttpError) -> Self {
        Self {
            kind: Box::new(ErrorKind::Http(value)),
        }
    }
}
