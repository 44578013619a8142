//! DI "Interfaces"

use crate::core::email::{EmailAttachment, InboundEmail};
use crate::core::errors::{AttachmentError, GuestError, IngestError, ProspectError, SendError};
use crate::infrastructure::entities;
use crate::infrastructure::traits::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait GuestResolver: Send + Sync {
    /// Finds the visitor owning `email`, creating it when missing, and makes
    /// sure it is assigned to `department`.
    ///
    /// `email` is expected trimmed and lower-cased. A blank `name` falls back
    /// to the email address. `Ok(None)` means the visitor vanished while its
    /// department was being changed.
    async fn resolve_guest(
        &self,
        email: &str,
        name: Option<&str>,
        department: Option<&str>,
    ) -> Result<Option<entities::Visitor>, GuestError>;
}

#[async_trait]
pub trait ThreadLocator: Send + Sync {
    /// Finds the room an email with the given thread ids belongs to.
    ///
    /// Returns `Ok(None)` when no room matches.
    async fn find_room(
        &self,
        visitor_token: &str,
        thread: &[String],
        department: Option<&str>,
    ) -> Result<Option<entities::Room>, RepositoryError>;
}

#[async_trait]
pub trait AttachmentMaterializer: Send + Sync {
    /// Stores one email attachment and describes it for the message.
    async fn materialize(
        &self,
        attachment: &EmailAttachment,
        room_id: Uuid,
        visitor_token: &str,
    ) -> Result<entities::FileAttachment, AttachmentError>;
}

/// Hints used when the message goes to a room that does not exist yet.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub source_type: String,
    pub source_id: String,
    pub source_alias: String,
    pub email_inbox: String,
    pub email_reply_to: String,
    pub email_subject: String,
    pub email_thread: Vec<String>,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Persists `message` in its room, creating the room from `room_info`
    /// when it does not exist.
    async fn send_message(
        &self,
        guest: &entities::Visitor,
        message: entities::Message,
        room_info: RoomInfo,
    ) -> Result<(entities::Room, entities::Message), SendError>;
}

#[async_trait]
pub trait ProspectRegistrar: Send + Sync {
    /// Validates the lead's email and returns the id of the prospect with
    /// that email, creating it when missing.
    async fn register_prospect(&self, data: entities::ProspectData) -> Result<Uuid, ProspectError>;
}

/// How processing of one inbound email ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The email was a vendor lead and was recorded as a prospect.
    LeadRecorded { prospect_id: Uuid },
    /// The email had no usable sender address and was dropped.
    NoSender,
    /// No visitor could be resolved for the sender; the email was dropped.
    NoGuest,
    Sent {
        room_id: Uuid,
        message_id: Uuid,
        reopened: bool,
        /// Number of attachments stored and appended to the message.
        attachments: usize,
    },
}

#[async_trait]
pub trait EmailIngestService: Send + Sync {
    /// Processes one email received on `inbox`, routed to `department`.
    async fn on_email_received(
        &self,
        email: InboundEmail,
        inbox: &str,
        department: Option<&str>,
    ) -> Result<IngestOutcome, IngestError>;
}
