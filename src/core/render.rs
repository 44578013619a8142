//! Rendering an inbound email as a livechat message.

use crate::core::email::InboundEmail;
use crate::infrastructure::entities::{
    Message, MessageAction, MessageAttachment, MessageBlock, TextObject, Visitor,
};
use chrono::Utc;
use log::warn;
use regex::Regex;
use sqlx::types::Json;
use std::sync::OnceLock;
use uuid::Uuid;

const PLAIN_TEXT_WIDTH: usize = 1000;

pub const REPLY_PROCESSING_TYPE: &str = "respondWithQuotedMessage";

/// User visible strings added around the email content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub reply_via_email: &'static str,
    pub from: &'static str,
    pub subject: &'static str,
}

impl Labels {
    /// Unknown languages get the English labels.
    pub fn for_language(language: &str) -> Labels {
        match language.to_ascii_lowercase().as_str() {
            "es" => Labels {
                reply_via_email: "Responder por correo electrónico",
                from: "De",
                subject: "Asunto",
            },
            "pt-br" | "pt" => Labels {
                reply_via_email: "Responder por e-mail",
                from: "De",
                subject: "Assunto",
            },
            "de" => Labels {
                reply_via_email: "Per E-Mail antworten",
                from: "Von",
                subject: "Betreff",
            },
            _ => Labels {
                reply_via_email: "Reply via Email",
                from: "From",
                subject: "Subject",
            },
        }
    }
}

fn signature_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?s)<div name="messageSignatureSection.+"#).expect("valid signature regex")
    })
}

/// Plain text of an HTML body, without the signature and quoted history.
fn html_to_text(html: &str, width: usize) -> Result<String, html2text::Error> {
    let html = signature_regex().replace(html, "");
    let text = html2text::config::plain().string_from_read(html.as_bytes(), width)?;
    Ok(text.trim().to_owned())
}

/// The message text: the HTML body when there is one, else the text body.
pub fn render_body(email: &InboundEmail) -> String {
    render_body_at(email, PLAIN_TEXT_WIDTH)
}

fn render_body_at(email: &InboundEmail, width: usize) -> String {
    let plain = || email.text.clone().unwrap_or_default();
    match email.html.as_deref().map(|html| html_to_text(html, width)) {
        Some(Ok(text)) => text,
        Some(Err(e)) => {
            warn!("failed to convert email HTML to text, using the text body: {e}");
            plain()
        }
        None => plain(),
    }
}

/// Builds the message posted for `email`.
pub fn build_message(
    email: &InboundEmail,
    guest: &Visitor,
    room_id: Uuid,
    message_id: Uuid,
    thread: &[String],
    labels: Labels,
) -> Message {
    let body = render_body(email);

    let reply = MessageAttachment::Actions {
        actions: vec![MessageAction {
            kind: "button".to_owned(),
            text: labels.reply_via_email.to_owned(),
            msg: "msg".to_owned(),
            msg_id: message_id,
            msg_in_chat_window: true,
            msg_processing_type: REPLY_PROCESSING_TYPE.to_owned(),
        }],
    };

    let preview = vec![
        MessageBlock::Context {
            elements: vec![TextObject::markdown(format!(
                "**{}:** {}\n**{}:** {}",
                labels.from,
                email.from_text(),
                labels.subject,
                email.subject
            ))],
        },
        MessageBlock::Section {
            text: TextObject::markdown(body.clone()),
        },
    ];

    Message {
        id: message_id,
        room_id,
        text: body,
        token: guest.token.clone(),
        groupable: false,
        attachments: Json(vec![reply]),
        blocks: Json(preview),
        email_thread: Json(thread.to_vec()),
        email_message_id: email.message_id.clone(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_history_are_dropped() {
        let html = r#"<p>Hello <b>team</b></p><div name="messageSignatureSection"><p>Jane</p></div><blockquote>old</blockquote>"#;
        let text = html_to_text(html, PLAIN_TEXT_WIDTH).unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("team"));
        assert!(!text.contains("Jane"));
        assert!(!text.contains("old"));
    }

    #[test]
    fn test_plain_text_used_without_html() {
        let email = InboundEmail {
            text: Some("just text".to_owned()),
            ..Default::default()
        };
        assert_eq!(render_body(&email), "just text");
        assert_eq!(render_body(&InboundEmail::default()), "");
    }

    #[test]
    fn test_text_body_used_when_html_cannot_be_rendered() {
        let email = InboundEmail {
            html: Some("<p>Hello</p>".to_owned()),
            text: Some("Hello in plain text".to_owned()),
            ..Default::default()
        };
        assert!(html_to_text("<p>Hello</p>", 0).is_err());
        assert_eq!(render_body_at(&email, 0), "Hello in plain text");
        assert_eq!(render_body(&email), "Hello");
    }

    #[test]
    fn test_labels_fall_back_to_english() {
        assert_eq!(Labels::for_language("pt-BR").subject, "Assunto");
        assert_eq!(Labels::for_language("xx").reply_via_email, "Reply via Email");
    }
}
