//! Error types of the ingestion stages.

use crate::infrastructure::traits::{FileStoreError, RepositoryError};
use thiserror::Error;
use uuid::Uuid;

/// A lead parser did not recognise the email. Expected for most emails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadParseError {
    #[error("not a {vendor} lead email: missing {missing:?}")]
    NotALeadEmail {
        vendor: &'static str,
        missing: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("email domain {0:?} is not allowed")]
    DomainNotAllowed(String),
}

#[derive(Debug, Error)]
pub enum ProspectError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("prospect {0} could not be read back after creation")]
    CreationFailed(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum GuestError {
    #[error("guest for {0} could not be read back after creation")]
    GuestCreationFailed(String),

    #[error("department {0:?} does not exist or is disabled")]
    DepartmentNotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment {name:?} is {size} bytes, over the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("failed to upload attachment {name:?}: {source}")]
    UploadFailed {
        name: String,
        #[source]
        source: FileStoreError,
    },
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("room {room_id} belongs to another visitor")]
    RoomOwnership { room_id: Uuid },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("lead rejected: {0}")]
    Prospect(#[from] ProspectError),

    #[error("guest resolution failed: {0}")]
    Guest(#[from] GuestError),

    #[error("room lookup failed: {0}")]
    Room(#[source] RepositoryError),

    #[error("failed to send email message: {0}")]
    SendFailed(#[from] SendError),
}
