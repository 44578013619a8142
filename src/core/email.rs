//! Inbound email model.
//!
//! Converts raw RFC 5322 bytes into the value the ingestion pipeline works on:
//! sender, subject, bodies, threading headers and attachments.

use mail_parser::{HeaderValue, MessageParser, MimeHeaders, PartType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailParseError {
    #[error("failed to parse MIME message ({0} bytes)")]
    Malformed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub address: String,
    pub name: Option<String>,
}

impl Mailbox {
    /// `Name <address>`, or the bare address when there is no display name.
    pub fn display(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name} <{}>", self.address),
            _ => self.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub content: Vec<u8>,
    /// Parts with `Content-Disposition: inline` are rendered by mail clients
    /// as part of the body and are not stored as files.
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEmail {
    pub from: Option<Mailbox>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Vec<String>,
    /// References values as they appeared; a value may hold several
    /// comma-joined ids.
    pub references: Vec<String>,
    pub attachments: Vec<EmailAttachment>,
}

impl InboundEmail {
    pub fn parse(raw: &[u8]) -> Result<InboundEmail, EmailParseError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(EmailParseError::Malformed(raw.len()));
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or(EmailParseError::Malformed(raw.len()))?;

        let from = message.from().and_then(|address| address.first()).and_then(|addr| {
            addr.address().map(|address| Mailbox {
                address: address.trim().to_owned(),
                name: addr.name().map(str::to_owned),
            })
        });

        // html_part falls back to the text part when the message has no HTML.
        let html = message.html_part(0).and_then(|part| match &part.body {
            PartType::Html(html) => Some(html.to_string()),
            _ => None,
        });

        let attachments = message
            .attachments()
            .map(|part| {
                let content_type = part
                    .content_type()
                    .map(|ct| match ct.subtype() {
                        Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                        None => ct.ctype().to_owned(),
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_owned())
                    .to_lowercase();
                let inline = part
                    .content_disposition()
                    .is_some_and(|disposition| disposition.ctype().eq_ignore_ascii_case("inline"));
                let content = part.contents().to_vec();

                EmailAttachment {
                    filename: part.attachment_name().unwrap_or("attachment").to_owned(),
                    content_type,
                    size: content.len() as u64,
                    content,
                    inline,
                }
            })
            .collect();

        Ok(InboundEmail {
            from,
            subject: message.subject().unwrap_or_default().to_owned(),
            text: message.body_text(0).map(|text| text.into_owned()),
            html,
            message_id: message.message_id().map(str::to_owned),
            in_reply_to: header_values(message.in_reply_to()),
            references: header_values(message.references()),
            attachments,
        })
    }

    pub fn sender_address(&self) -> Option<&str> {
        self.from
            .as_ref()
            .map(|mailbox| mailbox.address.as_str())
            .filter(|address| !address.is_empty())
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.from.as_ref().and_then(|mailbox| mailbox.name.as_deref())
    }

    /// The `From` header as shown in the message preview.
    pub fn from_text(&self) -> String {
        self.from.as_ref().map(Mailbox::display).unwrap_or_default()
    }
}

fn header_values(value: &HeaderValue<'_>) -> Vec<String> {
    match value {
        HeaderValue::Text(text) => vec![text.to_string()],
        HeaderValue::TextList(list) => list.iter().map(|text| text.to_string()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "From: Jane Doe <Jane.Doe@Example.com>\r\n\
To: support@inbox.test\r\n\
Subject: Re: Order 42\r\n\
Message-ID: <reply-2@example.com>\r\n\
In-Reply-To: <origin-1@inbox.test>\r\n\
References: <origin-1@inbox.test> <reply-1@example.com>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Still waiting on my order.\r\n";

    #[test]
    fn test_parse_threading_headers() {
        let email = InboundEmail::parse(REPLY.as_bytes()).unwrap();

        assert_eq!(email.sender_address(), Some("Jane.Doe@Example.com"));
        assert_eq!(email.sender_name(), Some("Jane Doe"));
        assert_eq!(email.from_text(), "Jane Doe <Jane.Doe@Example.com>");
        assert_eq!(email.subject, "Re: Order 42");
        assert_eq!(email.message_id.as_deref(), Some("reply-2@example.com"));
        assert_eq!(email.in_reply_to, vec!["origin-1@inbox.test"]);
        assert_eq!(
            email.references,
            vec!["origin-1@inbox.test", "reply-1@example.com"]
        );
        assert!(email.text.unwrap().contains("Still waiting"));
        assert!(email.html.is_none());
    }

    #[test]
    fn test_parse_attachments() {
        let raw = "From: bob@example.com\r\n\
Subject: Photos\r\n\
Message-ID: <photos@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--b1\r\n\
Content-Type: image/png\r\n\
Content-Disposition: attachment; filename=\"shot.png\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--b1--\r\n";

        let email = InboundEmail::parse(raw.as_bytes()).unwrap();

        assert_eq!(email.attachments.len(), 1);
        let attachment = &email.attachments[0];
        assert_eq!(attachment.filename, "shot.png");
        assert_eq!(attachment.content_type, "image/png");
        assert_eq!(attachment.size, 8);
        assert!(!attachment.inline);
    }

    #[test]
    fn test_missing_from_has_no_sender() {
        let email = InboundEmail::parse(b"Subject: hi\r\n\r\nbody\r\n").unwrap();
        assert_eq!(email.sender_address(), None);
        assert_eq!(email.from_text(), "");
    }
}
