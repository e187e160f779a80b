use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("AlreadyStopped Error - {0} is stopping or stopped")]
    AlreadyStopped(String),

    #[error("EnqueueInterrupted Error - {0}")]
    EnqueueInterrupted(String),

    #[error("Write Error - {0}")]
    Write(String),

    #[error("Interrupted Error - {0}")]
    Interrupted(String),

    #[error("Spawn Error - {0}")]
    Spawn(String),

    #[error("Config Error - {0}")]
    Config(String),

    #[error("Worker Error - {0}")]
    Worker(String),
}

impl Error {
    /// Whether the error was raised by a Sink write or flush.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Error::Write(_))
    }
}
