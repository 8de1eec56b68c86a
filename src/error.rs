//! Error types for kiosk-rs.

use thiserror::Error;

use crate::model::producer::ProducerId;
use crate::model::worker::WorkerId;
use crate::model::{OrderId, State};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid order: {0}")]
    InvalidItem(String),

    #[error("queue is empty")]
    EmptyQueue,

    #[error("unknown worker: {0}")]
    UnknownWorker(WorkerId),

    #[error("worker {0} is inactive")]
    WorkerInactive(WorkerId),

    #[error("worker {0} is already removed")]
    AlreadyRemoved(WorkerId),

    #[error("worker {0} is not removed")]
    NotRemoved(WorkerId),

    #[error("worker {0} already has a running loop")]
    LoopRunning(WorkerId),

    #[error("unknown producer: {0}")]
    UnknownProducer(ProducerId),

    #[error("producer {0} is retired")]
    ProducerRetired(ProducerId),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: State, to: State },

    #[error("no tokio runtime available to run serving tasks")]
    NoRuntime,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// How a failure surfaces at an API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing to hand out right now. Not a fault.
    NothingAvailable,
    /// The caller asked for something invalid or raced a lifecycle change.
    Client,
    /// The kitchen or its store failed.
    Server,
}

impl Error {
    /// Errors a polling loop answers by backing off rather than logging a fault.
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, Error::EmptyQueue | Error::WorkerInactive(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyQueue => ErrorKind::NothingAvailable,
            Error::InvalidItem(_)
            | Error::UnknownWorker(_)
            | Error::WorkerInactive(_)
            | Error::AlreadyRemoved(_)
            | Error::NotRemoved(_)
            | Error::LoopRunning(_)
            | Error::UnknownProducer(_)
            | Error::ProducerRetired(_)
            | Error::OrderNotFound(_)
            | Error::InvalidTransition { .. } => ErrorKind::Client,
            Error::NoRuntime
            | Error::Persistence(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::Server,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
