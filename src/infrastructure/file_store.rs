//! Upload store backed by the `uploads` table

use crate::config::IngestConfig;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::Upload;
use crate::infrastructure::traits::{FileStore, FileStoreError, RepositoryError, UploadDetails};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use uuid::Uuid;

/// Characters escaped in the file name part of an upload URL.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[injectable(FileStore)]
pub struct DbFileStore {
    connection: Ref<DatabaseConnection>,
    config: Ref<IngestConfig>,
}

impl DbFileStore {
    pub fn new(connection: Ref<DatabaseConnection>, config: Ref<IngestConfig>) -> Self {
        DbFileStore { connection, config }
    }
}

#[async_trait]
impl FileStore for DbFileStore {
    async fn insert(&self, details: UploadDetails, content: &[u8]) -> Result<Upload, FileStoreError> {
        let name = details.name.trim();
        if name.is_empty() {
            return Err(FileStoreError::Rejected("file name is empty".to_owned()));
        }

        let size = i64::try_from(details.size)
            .map_err(|_| FileStoreError::Rejected(format!("size {} out of range", details.size)))?;

        sqlx::query_as(
            "INSERT INTO uploads (id, name, size, content_type, room_id, visitor_token, data, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id, name, size, content_type, room_id, visitor_token, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(size)
        .bind(&details.content_type)
        .bind(details.room_id)
        .bind(&details.visitor_token)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&**self.connection)
        .await
        .map_err(|e| FileStoreError::Repository(RepositoryError::from(e)))
    }

    fn public_path(&self, upload: &Upload) -> String {
        format!(
            "{}/file-upload/{}/{}",
            self.config.root_url_path_prefix,
            upload.id,
            utf8_percent_encode(&upload.name, PATH_SEGMENT)
        )
    }
}
