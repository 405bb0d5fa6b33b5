//! Main Crate Error

use crate::NodeWasShutdown;

#[derive(thiserror::Error, Debug)]
/// xorstore crate error enum.
pub enum Error {
    #[error(transparent)]
    /// Transparent [std::io::Error], spawning a node's actor thread failed.
    IO(#[from] std::io::Error),

    /// Id bytes are not exactly [crate::ID_SIZE] long.
    #[error("Invalid Id size, expected 20, got {0}")]
    InvalidIdSize(usize),

    /// Id string is not 40 hex characters.
    #[error("Invalid Id encoding: {0}")]
    InvalidIdEncoding(String),

    /// A [crate::Config] option is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    /// Transparent [NodeWasShutdown]
    NodeWasShutdown(#[from] NodeWasShutdown),
}
