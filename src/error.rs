use crate::document::{Action, Status};

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("action '{action}' not allowed for status '{status}'")]
    IllegalTransition { status: Status, action: Action },
    #[error("{0}")]
    UnauthorizedActor(String),
    #[error("{actor} has already approved this document")]
    DuplicateApproval { actor: String },
    #[error("{0}")]
    InvalidState(String),
    #[error("sequence counter '{key}' is contended, retries exhausted")]
    SequenceContention { key: String },
    #[error("document '{0}' not found")]
    DocumentNotFound(String),
    #[error("actor '{0}' not found")]
    ActorNotFound(String),
    #[error("failed to mint identifier: {0}")]
    Identifier(String),
    #[error("store failure: {0}")]
    Store(#[from] sled::Error),
    #[error("codec failure: {0}")]
    Codec(String),
}

// lets transaction results propagate with `?`: aborts carry a WorkflowError
// already, storage failures fold into `Store`
impl From<sled::transaction::TransactionError<WorkflowError>> for WorkflowError {
    fn from(err: sled::transaction::TransactionError<WorkflowError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(err) => err,
            sled::transaction::TransactionError::Storage(err) => WorkflowError::Store(err),
        }
    }
}
