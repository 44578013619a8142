//! Database entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Visitor {
    pub id: Uuid,
    pub token: String,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Room {
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
    pub open: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub messages_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub text: String,
    pub token: String,
    pub groupable: bool,
    pub attachments: Json<Vec<MessageAttachment>>,
    pub blocks: Json<Vec<MessageBlock>>,
    pub email_thread: Json<Vec<String>>,
    pub email_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a message's `attachments` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageAttachment {
    Actions { actions: Vec<MessageAction> },
    File(FileAttachment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub msg: String,
    #[serde(rename = "msgId")]
    pub msg_id: Uuid,
    pub msg_in_chat_window: bool,
    pub msg_processing_type: String,
}

/// Rendering hints for a stored file. The media specific groups are filled
/// independently of each other, based on the stored content type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub title: String,
    pub title_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBlock {
    Context { elements: Vec<TextObject> },
    Section { text: TextObject },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TextObject {
    pub fn markdown(text: impl Into<String>) -> Self {
        TextObject {
            kind: "mrkdwn".to_owned(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Upload {
    pub id: Uuid,
    pub name: String,
    pub size: i64,
    pub content_type: String,
    pub room_id: Uuid,
    pub visitor_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Prospect {
    pub id: Uuid,
    #[sqlx(flatten)]
    pub data: ProspectData,
    pub created_at: DateTime<Utc>,
}

/// The form-like fields of a CRM lead. Every field is free text, empty when
/// unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct ProspectData {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub prospect_type: String,
    pub location: String,
    pub street: String,
    pub gender: String,
    pub birth: String,
    pub height: String,
    pub weight: String,
    pub tobacco: String,
    pub relation: String,
    pub marital_status: String,
    pub preexisting_conditions: String,
    pub type_of_condition: String,
    pub people_in_household: String,
    pub annual_income: String,
    pub self_employed: String,
    pub qualifying_life_event: String,
    pub expectant_parent: String,
    pub medications: String,
    pub health_of_condition: String,
    pub denied_coverage: String,
    pub treated_by_physician: String,
    pub plan_types: String,
    pub optional_coverage: String,
    pub currently_insured: String,
    pub policy_expires: String,
    pub covered_for: String,
    pub current_provider: String,
    pub record_type: String,
    pub lead_vendor: String,
    pub campaign: String,
}
