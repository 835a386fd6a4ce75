pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("pool is at task capacity")]
    TooManyTasks,

    #[error("pool still has pending or running tasks")]
    HasTasks,

    #[error("task has not been submitted to a pool")]
    TaskNotPushed,

    #[error("task is still owned by a pool")]
    TaskStillOwnedByPool,

    #[error("timed out waiting for the task to finish")]
    Timeout,

    #[error("pool has been shut down")]
    ShutDown,

    #[error("task is already submitted to a pool")]
    TaskAlreadyPooled,

    #[error("task closure was already consumed by an earlier run")]
    TaskAlreadyRun,

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Telemetry(msg.into())
    }
}
