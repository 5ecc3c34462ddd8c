use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the in-memory entry collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an entry named '{0}' already exists")]
    DuplicateName(String),

    #[error("no entry named '{0}'")]
    NotFound(String),

    #[error("malformed entry collection")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not allocate memory, is the system out of memory?")]
    AllocationFailure,

    #[error("invalid key derivation parameters: {0}")]
    InvalidParameters(&'static str),

    /// Bad magic, version, header tag, trailing tag or payload. Wrong
    /// passwords land here too and are indistinguishable from corruption.
    #[error("file invalid or wrong password")]
    InvalidFormat,

    #[error("nonce counter exhausted, the container must be re-keyed before writing")]
    NonceExhausted,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("entry record is truncated")]
    Truncated,

    #[error("a credential must not be empty")]
    EmptySecret,

    #[error("an entry name must not be empty")]
    InvalidName,

    #[error("{0} is too long")]
    TooLong(&'static str),

    #[error("password length must be at least 1")]
    InvalidLength,

    #[error("OS random generator unavailable")]
    Random,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
