// src/hal/traits.rs
//! Transport abstraction for line-oriented sample sources

use thiserror::Error;

/// Result of one poll of a transport
#[derive(Debug, Clone, PartialEq)]
pub enum LineRead {
    /// A complete record without its line terminator
    Line(String),
    /// Nothing available right now
    Pending,
    /// The source is exhausted or was closed by the peer
    Closed,
}

/// Transport failures, fatal to a running detector
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed on {port}: {source}")]
    Read {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport already closed")]
    Closed,
}

/// A source of newline-terminated sample records
pub trait SampleTransport: Send {
    /// Poll the next record
    fn read_line(&mut self) -> Result<LineRead, TransportError>;

    /// Release the underlying handle; later reads fail with [`TransportError::Closed`]
    fn close(&mut self) -> Result<(), TransportError>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

impl<T: SampleTransport + ?Sized> SampleTransport for Box<T> {
    fn read_line(&mut self) -> Result<LineRead, TransportError> {
        (**self).read_line()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
