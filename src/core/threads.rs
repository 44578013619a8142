//! Email thread matching.
//!
//! An email joins an existing conversation when any of its thread ids is
//! already known to one of the visitor's rooms. Intermediate mails of a chain
//! may be missing, so all ids of the email are tried, not just the parent.

use crate::core::email::InboundEmail;
use crate::core::traits::ThreadLocator;
use crate::infrastructure::entities::Room;
use crate::infrastructure::traits::{RepositoryError, RoomRepository};
use async_trait::async_trait;
use di::{Ref, injectable};

/// The ids identifying the thread of `email`: every `References` value (folded
/// headers are split on commas), then its own `Message-Id`, then
/// `In-Reply-To`. Blank and repeated ids are skipped.
pub fn thread_candidates(email: &InboundEmail) -> Vec<String> {
    let references = email
        .references
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim);
    let own = email
        .message_id
        .iter()
        .chain(email.in_reply_to.iter())
        .map(|id| id.trim());

    let mut thread: Vec<String> = Vec::new();
    for id in references.chain(own) {
        if !id.is_empty() && !thread.iter().any(|known| known == id) {
            thread.push(id.to_owned());
        }
    }
    thread
}

#[injectable(ThreadLocator)]
pub struct DbThreadLocator {
    rooms: Ref<dyn RoomRepository>,
}

impl DbThreadLocator {
    pub fn new(rooms: Ref<dyn RoomRepository>) -> Self {
        DbThreadLocator { rooms }
    }
}

#[async_trait]
impl ThreadLocator for DbThreadLocator {
    async fn find_room(
        &self,
        visitor_token: &str,
        thread: &[String],
        department: Option<&str>,
    ) -> Result<Option<Room>, RepositoryError> {
        self.rooms
            .find_by_visitor_token_and_email_thread(visitor_token, thread, department)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_split_folded_references() {
        let email = InboundEmail {
            references: vec!["a@x, b@x".to_owned(), "c@x".to_owned()],
            message_id: Some("d@x".to_owned()),
            in_reply_to: vec!["c@x".to_owned()],
            ..Default::default()
        };

        assert_eq!(thread_candidates(&email), vec!["a@x", "b@x", "c@x", "d@x"]);
    }

    #[test]
    fn test_candidates_skip_blank_ids() {
        let email = InboundEmail {
            references: vec![" , ".to_owned()],
            message_id: Some(String::new()),
            ..Default::default()
        };

        assert!(thread_candidates(&email).is_empty());
    }
}
