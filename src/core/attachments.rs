//! Turning email attachments into stored files and message attachments.

use crate::config::IngestConfig;
use crate::core::email::EmailAttachment;
use crate::core::errors::AttachmentError;
use crate::core::traits::AttachmentMaterializer;
use crate::infrastructure::entities::FileAttachment;
use crate::infrastructure::traits::{FileStore, UploadDetails};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::debug;
use uuid::Uuid;

/// True for `family/<something>` content types.
fn is_media(content_type: &str, family: &str) -> bool {
    content_type
        .strip_prefix(family)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|subtype| !subtype.is_empty())
}

/// Builds the descriptor of a stored file. Image, audio and video hints are
/// checked independently.
pub fn describe_file(name: &str, url: &str, content_type: &str, size: u64) -> FileAttachment {
    let mut attachment = FileAttachment {
        title: name.to_owned(),
        title_link: url.to_owned(),
        ..Default::default()
    };

    if is_media(content_type, "image") {
        attachment.image_url = Some(url.to_owned());
        attachment.image_type = Some(content_type.to_owned());
        attachment.image_size = Some(size);
    }

    if is_media(content_type, "audio") {
        attachment.audio_url = Some(url.to_owned());
        attachment.audio_type = Some(content_type.to_owned());
        attachment.audio_size = Some(size);
    }

    if is_media(content_type, "video") {
        attachment.video_url = Some(url.to_owned());
        attachment.video_type = Some(content_type.to_owned());
        attachment.video_size = Some(size);
    }

    attachment
}

#[injectable(AttachmentMaterializer)]
pub struct StoreAttachmentMaterializer {
    files: Ref<dyn FileStore>,
    config: Ref<IngestConfig>,
}

impl StoreAttachmentMaterializer {
    pub fn new(files: Ref<dyn FileStore>, config: Ref<IngestConfig>) -> Self {
        StoreAttachmentMaterializer { files, config }
    }
}

#[async_trait]
impl AttachmentMaterializer for StoreAttachmentMaterializer {
    async fn materialize(
        &self,
        attachment: &EmailAttachment,
        room_id: Uuid,
        visitor_token: &str,
    ) -> Result<FileAttachment, AttachmentError> {
        if let Some(limit) = self.config.file_upload_max_size
            && attachment.size > limit
        {
            return Err(AttachmentError::TooLarge {
                name: attachment.filename.clone(),
                size: attachment.size,
                limit,
            });
        }

        let details = UploadDetails {
            name: attachment.filename.clone(),
            size: attachment.size,
            content_type: attachment.content_type.clone(),
            room_id,
            visitor_token: visitor_token.to_owned(),
        };

        let upload = self
            .files
            .insert(details, &attachment.content)
            .await
            .map_err(|source| AttachmentError::UploadFailed {
                name: attachment.filename.clone(),
                source,
            })?;
        let url = self.files.public_path(&upload);
        debug!("stored attachment {} as upload {}", upload.name, upload.id);

        Ok(describe_file(
            &upload.name,
            &url,
            &upload.content_type,
            upload.size.max(0) as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_image() {
        let attachment = describe_file("a.png", "/file-upload/1/a.png", "image/png", 10);
        assert_eq!(attachment.title, "a.png");
        assert_eq!(attachment.title_link, "/file-upload/1/a.png");
        assert_eq!(attachment.image_url.as_deref(), Some("/file-upload/1/a.png"));
        assert_eq!(attachment.image_size, Some(10));
        assert!(attachment.audio_url.is_none());
        assert!(attachment.video_url.is_none());
    }

    #[test]
    fn test_describe_plain_file_has_only_title() {
        let attachment = describe_file("a.pdf", "/u/a.pdf", "application/pdf", 10);
        assert_eq!(
            attachment,
            FileAttachment {
                title: "a.pdf".to_owned(),
                title_link: "/u/a.pdf".to_owned(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_media_type_needs_subtype() {
        assert!(is_media("video/mp4", "video"));
        assert!(!is_media("video/", "video"));
        assert!(!is_media("videos/mp4", "video"));
    }
}
