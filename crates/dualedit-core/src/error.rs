use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown editor mode \"{0}\" (expected \"visual\" or \"source\")")]
    UnknownMode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
