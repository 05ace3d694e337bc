use thiserror::Error;

pub type R2fmResult<T> = Result<T, R2fmError>;

#[derive(Debug, Error)]
pub enum R2fmError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
