use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookshelfError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("No {0} ids left to assign")]
    IdsExhausted(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BookshelfError>;
