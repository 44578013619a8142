//! Persisting a visitor message, creating its room on first contact.

use crate::core::errors::SendError;
use crate::core::traits::{MessageSender, RoomInfo};
use crate::infrastructure::entities::{Message, Room, Visitor};
use crate::infrastructure::traits::{NewRoom, RoomRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::debug;

#[injectable(MessageSender)]
pub struct DbMessageSender {
    rooms: Ref<dyn RoomRepository>,
}

impl DbMessageSender {
    pub fn new(rooms: Ref<dyn RoomRepository>) -> Self {
        DbMessageSender { rooms }
    }
}

#[async_trait]
impl MessageSender for DbMessageSender {
    async fn send_message(
        &self,
        guest: &Visitor,
        message: Message,
        room_info: RoomInfo,
    ) -> Result<(Room, Message), SendError> {
        if let Some(room) = self.rooms.find_by_id(message.room_id).await?
            && room.visitor_token != guest.token
        {
            return Err(SendError::RoomOwnership { room_id: room.id });
        }

        let room = NewRoom {
            id: message.room_id,
            visitor_id: guest.id,
            visitor_token: guest.token.clone(),
            department: guest.department.clone(),
            source_type: room_info.source_type,
            source_id: room_info.source_id,
            source_alias: room_info.source_alias,
            email_inbox: room_info.email_inbox,
            email_reply_to: room_info.email_reply_to,
            email_subject: room_info.email_subject,
            email_thread: room_info.email_thread,
        };

        let (room, message) = self.rooms.create_message_in_room(room, message).await?;
        debug!(
            "message {} stored in room {} ({} messages)",
            message.id, room.id, room.messages_count
        );
        Ok((room, message))
    }
}
