//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

#[async_trait]
pub trait VisitorRepository: Send + Sync {
    /// Case-insensitive lookup by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<entities::Visitor>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<entities::Visitor>, RepositoryError>;

    /// Inserts the visitor unless one with the same email already exists.
    ///
    /// Returns `true` when this call created the row.
    async fn create_visitor(&self, visitor: entities::Visitor) -> Result<bool, RepositoryError>;

    async fn remove_department(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn set_department(&self, id: Uuid, department: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Looks a department up by id first, then by name.
    async fn find_by_id_or_name(
        &self,
        id_or_name: &str,
    ) -> Result<Option<entities::Department>, RepositoryError>;
}

/// What a new room is created with when a message is sent to a room id that
/// does not exist yet.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub id: Uuid,
    pub visitor_id: Uuid,
    pub visitor_token: String,
    pub department: Option<String>,
    pub source_type: String,
    pub source_id: String,
    pub source_alias: String,
    pub email_inbox: String,
    pub email_reply_to: String,
    pub email_subject: String,
    pub email_thread: Vec<String>,
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<entities::Room>, RepositoryError>;

    /// Finds the most recently active room of the visitor whose email thread
    /// shares at least one id with `thread`. A `None` department matches
    /// rooms of any department.
    async fn find_by_visitor_token_and_email_thread(
        &self,
        visitor_token: &str,
        thread: &[String],
        department: Option<&str>,
    ) -> Result<Option<entities::Room>, RepositoryError>;

    async fn list_email_thread(&self, room_id: Uuid) -> Result<Vec<String>, RepositoryError>;

    /// Adds the given ids to the room's email thread. Existing ids are kept.
    async fn add_to_email_thread(
        &self,
        room_id: Uuid,
        thread: &[String],
    ) -> Result<(), RepositoryError>;

    /// Clears `closed_at` and marks the room open again.
    async fn reopen_room(&self, room_id: Uuid) -> Result<entities::Room, RepositoryError>;

    /// Atomically creates the room when missing and stores the message in it.
    async fn create_message_in_room(
        &self,
        room: NewRoom,
        message: entities::Message,
    ) -> Result<(entities::Room, entities::Message), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<entities::Message>, RepositoryError>;

    async fn list_room_messages(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<entities::Message>, RepositoryError>;

    /// Adds the attachments that are not already on the message, keeping the
    /// existing ones in place.
    async fn add_attachments(
        &self,
        message_id: Uuid,
        attachments: Vec<entities::MessageAttachment>,
    ) -> Result<entities::Message, RepositoryError>;
}

#[async_trait]
pub trait ProspectRepository: Send + Sync {
    async fn find_by_email(&self, email: &str)
    -> Result<Option<entities::Prospect>, RepositoryError>;

    /// Inserts the prospect unless one with the same email already exists.
    async fn create_prospect(
        &self,
        id: Uuid,
        data: &entities::ProspectData,
        created_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// Metadata of a file about to be stored.
#[derive(Debug, Clone)]
pub struct UploadDetails {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub room_id: Uuid,
    pub visitor_token: String,
}

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("upload store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("upload rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert(
        &self,
        details: UploadDetails,
        content: &[u8],
    ) -> Result<entities::Upload, FileStoreError>;

    /// Public URL path under which the stored file is served.
    fn public_path(&self, upload: &entities::Upload) -> String;
}
