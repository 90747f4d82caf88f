//! Error types for config handling and startup. The step pipeline itself never fails.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
