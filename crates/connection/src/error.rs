use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectionError>;

#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The addressed connection code no longer exists remotely. Recoverable:
    /// callers clear their local pointer and fall back to no-connection.
    #[error("connection not found")]
    NotFound,

    #[error("remote deadline exceeded")]
    RemoteTimeout,

    #[error("conflicting writes exhausted {0} attempts")]
    Conflict(u32),

    #[error("local store error: {0}")]
    Local(#[from] namematch_store::StoreError),

    #[error("remote store error: {0}")]
    Remote(String),
}
