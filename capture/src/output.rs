use crate::frame::Frame;
use crate::output::pcapng::EncodeError;
use thiserror::Error;

/// Destination of captured frames. Owned by the processing thread.
pub trait Output: Send {
    fn accept(&mut self, frame: &Frame) -> Result<(), OutputError>;
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Encoding error. {0}")]
    EncodeError(#[from] EncodeError),
}

impl OutputError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            OutputError::IOError(err) => Some(err.to_string()),
            OutputError::EncodeError(_) => None,
        }
    }
}

pub mod pcapng;
