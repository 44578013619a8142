//! Ingestion of one inbound email: a vendor lead becomes a prospect, anything
//! else becomes a visitor message in the room of its email thread.

use crate::config::IngestConfig;
use crate::core::email::InboundEmail;
use crate::core::errors::IngestError;
use crate::core::guests::normalize_department;
use crate::core::leads::LeadParserRegistry;
use crate::core::locks::SenderLocks;
use crate::core::render::{Labels, build_message};
use crate::core::threads::thread_candidates;
use crate::core::traits::{
    AttachmentMaterializer, EmailIngestService, GuestResolver, IngestOutcome, MessageSender,
    ProspectRegistrar, RoomInfo, ThreadLocator,
};
use crate::infrastructure::entities::MessageAttachment;
use crate::infrastructure::traits::{MessageRepository, RoomRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{debug, error, info};
use uuid::Uuid;

pub const EMAIL_SOURCE_TYPE: &str = "email";
pub const EMAIL_SOURCE_ALIAS: &str = "email-inbox";

#[injectable(EmailIngestService)]
pub struct InboxIngestService {
    leads: Ref<LeadParserRegistry>,
    prospects: Ref<dyn ProspectRegistrar>,
    guests: Ref<dyn GuestResolver>,
    threads: Ref<dyn ThreadLocator>,
    rooms: Ref<dyn RoomRepository>,
    messages: Ref<dyn MessageRepository>,
    sender: Ref<dyn MessageSender>,
    materializer: Ref<dyn AttachmentMaterializer>,
    locks: Ref<SenderLocks>,
    config: Ref<IngestConfig>,
}

impl InboxIngestService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        leads: Ref<LeadParserRegistry>,
        prospects: Ref<dyn ProspectRegistrar>,
        guests: Ref<dyn GuestResolver>,
        threads: Ref<dyn ThreadLocator>,
        rooms: Ref<dyn RoomRepository>,
        messages: Ref<dyn MessageRepository>,
        sender: Ref<dyn MessageSender>,
        materializer: Ref<dyn AttachmentMaterializer>,
        locks: Ref<SenderLocks>,
        config: Ref<IngestConfig>,
    ) -> Self {
        InboxIngestService {
            leads,
            prospects,
            guests,
            threads,
            rooms,
            messages,
            sender,
            materializer,
            locks,
            config,
        }
    }

    /// Stores the non-inline attachments of `email` one at a time and appends
    /// the ones that succeeded to the message. Returns how many were appended.
    async fn attach_files(
        &self,
        email: &InboundEmail,
        room_id: Uuid,
        message_id: Uuid,
        visitor_token: &str,
    ) -> usize {
        let mut files = Vec::new();
        for attachment in email.attachments.iter().filter(|a| !a.inline) {
            match self
                .materializer
                .materialize(attachment, room_id, visitor_token)
                .await
            {
                Ok(file) => files.push(MessageAttachment::File(file)),
                Err(e) => error!("Error uploading attachment from email: {e}"),
            }
        }

        if files.is_empty() {
            return 0;
        }

        let count = files.len();
        match self.messages.add_attachments(message_id, files).await {
            Ok(_) => count,
            Err(e) => {
                error!("Error updating attachments of message {message_id}: {e}");
                0
            }
        }
    }
}

#[async_trait]
impl EmailIngestService for InboxIngestService {
    async fn on_email_received(
        &self,
        email: InboundEmail,
        inbox: &str,
        department: Option<&str>,
    ) -> Result<IngestOutcome, IngestError> {
        if let Some(lead) = email.text.as_deref().and_then(|text| self.leads.parse(text)) {
            debug!("Email on inbox {inbox} is a {} lead", lead.lead_vendor);
            let prospect_id = self.prospects.register_prospect(lead).await?;
            return Ok(IngestOutcome::LeadRecorded { prospect_id });
        }

        let department = normalize_department(department);
        debug!(
            "New email conversation received on inbox {inbox}. Will be assigned to department {department:?}"
        );

        let Some(reply_to) = email.sender_address().map(str::trim).filter(|a| !a.is_empty())
        else {
            debug!("Email on inbox {inbox} has no sender address, skipping");
            return Ok(IngestOutcome::NoSender);
        };
        let sender = reply_to.to_lowercase();
        let thread = thread_candidates(&email);
        debug!("Email from {sender} carries thread ids {thread:?}");

        let lock = self.locks.lock(&sender).await;

        let Some(guest) = self
            .guests
            .resolve_guest(&sender, email.sender_name(), department)
            .await?
        else {
            debug!("No visitor found for {sender}, skipping");
            return Ok(IngestOutcome::NoGuest);
        };

        // Rooms store the resolved department id, not the requested id or name.
        let room_department = department.and(guest.department.as_deref());
        let mut room = self
            .threads
            .find_room(&guest.token, &thread, room_department)
            .await
            .map_err(IngestError::Room)?;

        let mut reopened = false;
        if let Some(closed_id) = room.as_ref().filter(|r| r.is_closed()).map(|r| r.id) {
            debug!("Room {closed_id} is closed. Reopening");
            room = Some(
                self.rooms
                    .reopen_room(closed_id)
                    .await
                    .map_err(IngestError::Room)?,
            );
            reopened = true;
        }

        let room_id = room.as_ref().map_or_else(Uuid::new_v4, |r| r.id);
        let message = build_message(
            &email,
            &guest,
            room_id,
            Uuid::new_v4(),
            &thread,
            Labels::for_language(&self.config.language),
        );
        let room_info = RoomInfo {
            source_type: EMAIL_SOURCE_TYPE.to_owned(),
            source_id: inbox.to_owned(),
            source_alias: EMAIL_SOURCE_ALIAS.to_owned(),
            email_inbox: inbox.to_owned(),
            email_reply_to: reply_to.to_owned(),
            email_subject: email.subject.clone(),
            email_thread: thread.clone(),
        };

        let sent = self.sender.send_message(&guest, message, room_info).await;
        drop(lock);
        let (room, message) = sent.map_err(|e| {
            error!("Error receiving email from {sender}: {e}");
            IngestError::SendFailed(e)
        })?;

        let attachments = self
            .attach_files(&email, room.id, message.id, &guest.token)
            .await;

        if let Err(e) = self.rooms.add_to_email_thread(room.id, &thread).await {
            error!("Error updating email thread of room {}: {e}", room.id);
        }

        info!(
            "Email from {sender} on inbox {inbox} stored as message {} in room {}",
            message.id, room.id
        );
        Ok(IngestOutcome::Sent {
            room_id: room.id,
            message_id: message.id,
            reopened,
            attachments,
        })
    }
}
