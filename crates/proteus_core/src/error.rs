//! Core error types for the proteus identification library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed-length read ended before the requested byte count
    #[error("needed {needed} bytes at offset {offset}, got {got}")]
    InsufficientData {
        offset: u64,
        needed: usize,
        got: usize,
    },

    /// Magic bytes or header structure did not match the format
    #[error("not a valid {0} stream")]
    FormatMismatch(&'static str),

    /// Seek target is out of bounds for the source
    #[error("offset {offset} is out of bounds (size: {size})")]
    OutOfBounds { offset: u64, size: u64 },

    /// The server refused the request (4xx other than 416)
    #[error("refused by server: HTTP {status}: {message}")]
    HttpRefused { status: u16, message: String },

    /// The server failed (5xx); the caller might want to retry
    #[error("HTTP {status}: {message}; might want to retry")]
    HttpTransient { status: u16, message: String },

    /// The per-parse HTTP request budget was spent
    #[error("request cap of {limit} HTTP requests exceeded")]
    RequestCapExceeded { limit: u32 },

    /// The per-parse fetched-byte budget was spent
    #[error("byte cap of {limit} bytes exceeded")]
    ByteCapExceeded { limit: u64 },

    /// Bad path, malformed URL, or an unreachable host
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this failure only says "the current parser does not recognize
    /// the input". Dispatch swallows these and moves on to the next
    /// candidate; everything else is an infrastructure fault and aborts the
    /// parse.
    pub fn is_parser_local(&self) -> bool {
        matches!(
            self,
            Error::InsufficientData { .. } | Error::FormatMismatch(_) | Error::OutOfBounds { .. }
        )
    }

    /// HTTP status carried by this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::HttpRefused { status, .. } | Error::HttpTransient { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_message_mentions_refusal() {
        let err = Error::HttpRefused {
            status: 403,
            message: "Forbidden".into(),
        };
        assert!(err.to_string().contains("refused"));
        assert_eq!(err.http_status(), Some(403));
    }

    #[test]
    fn transient_suggests_retry() {
        let err = Error::HttpTransient {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert!(err.to_string().contains("might want to retry"));
        assert_eq!(err.http_status(), Some(503));
    }

    #[test]
    fn parser_local_classification() {
        assert!(Error::InsufficientData {
            offset: 0,
            needed: 8,
            got: 3
        }
        .is_parser_local());
        assert!(Error::FormatMismatch("png").is_parser_local());
        assert!(Error::OutOfBounds { offset: 9, size: 4 }.is_parser_local());

        assert!(!Error::HttpRefused {
            status: 404,
            message: "Not Found".into()
        }
        .is_parser_local());
        assert!(!Error::RequestCapExceeded { limit: 10 }.is_parser_local());
        assert!(!Error::ByteCapExceeded { limit: 1024 }.is_parser_local());
        assert!(!Error::InvalidInput("no such file".into()).is_parser_local());
    }
}
