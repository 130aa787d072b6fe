use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn new_connection_error(msg: impl Into<String>) -> Self {
        Self {
            kind: Box::new(ErrorKind::Connection { msg: msg.into() }),
        }
    }

    pub(crate) fn new_send_request_error(msg: impl Into<String>) -> Self {
        Self {
            kind: Box::new(ErrorKind::SendRequest { msg: msg.into() }),
        }
    }

    pub(crate) fn new_message_error(msg: impl Into<String>) -> Self {
        Self {
            kind: Box::new(ErrorKind::Message { msg: msg.into() }),
        }
    }

    pub(crate) fn new_server_error(context: ServerErrorContext) -> Self {
        Self {
            kind: Box::new(ErrorKind::Server(context)),
        }
    }
}

/// Captured details of a failed HTTP exchange: enough to report where the
/// request went and what came back, without retaining the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ServerErrorContext {
    pub status_code: u16,
    pub method: String,
    pub path: String,
    pub endpoint: String,
    pub body_prefix: Vec<u8>,
    pub msg: Option<String>,
}

impl Display for ServerErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "server error: status: {}, method: {}, path: {}, endpoint: {}",
            self.status_code, self.method, self.path, self.endpoint
        )?;

        if let Some(msg) = &self.msg {
            write!(f, ", msg: {msg}")?;
        }

        if !self.body_prefix.is_empty() {
            write!(f, ", body: {}", String::from_utf8_lossy(&self.body_prefix))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    #[non_exhaustive]
    Connection { msg: String },
    #[non_exhaustive]
    SendRequest { msg: String },
    Server(ServerErrorContext),
    #[non_exhaustive]
    Message { msg: String },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind.as_ref() {
            ErrorKind::Connection { msg } => write!(f, "connection error: {msg}"),
            ErrorKind::SendRequest { msg } => write!(f, "send request error: {msg}"),
            ErrorKind::Server(ctx) => write!(f, "{ctx}"),
            ErrorKind::Message { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
