//! Email address and domain validation for new prospects.

use crate::config::IngestConfig;
use crate::core::errors::DomainError;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default)]
pub struct EmailDomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl EmailDomainPolicy {
    pub fn new(allowed: Vec<String>, blocked: Vec<String>) -> Self {
        EmailDomainPolicy {
            allowed: allowed.into_iter().map(|d| d.to_lowercase()).collect(),
            blocked: blocked.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        EmailDomainPolicy::new(
            config.allowed_email_domains.clone(),
            config.blocked_email_domains.clone(),
        )
    }

    /// Fails closed: an address that cannot be validated is refused.
    pub fn validate(&self, email: &str) -> Result<(), DomainError> {
        if !email_regex().is_match(email) {
            return Err(DomainError::InvalidEmail(email.to_owned()));
        }

        let domain = email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .ok_or_else(|| DomainError::InvalidEmail(email.to_owned()))?;

        if !self.allowed.is_empty() && !self.allowed.contains(&domain) {
            return Err(DomainError::DomainNotAllowed(domain));
        }
        if self.blocked.contains(&domain) {
            return Err(DomainError::DomainNotAllowed(domain));
        }
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
        )
        .expect("valid email regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_addresses() {
        let policy = EmailDomainPolicy::default();
        assert!(policy.validate("jane@example.com").is_ok());
        assert_eq!(
            policy.validate("jane.example.com"),
            Err(DomainError::InvalidEmail("jane.example.com".to_owned()))
        );
        assert!(policy.validate("jane@localhost").is_err());
        assert!(policy.validate("").is_err());
    }

    #[test]
    fn test_allow_list_restricts_domains() {
        let policy = EmailDomainPolicy::new(vec!["Example.com".to_owned()], Vec::new());
        assert!(policy.validate("jane@example.com").is_ok());
        assert_eq!(
            policy.validate("jane@other.org"),
            Err(DomainError::DomainNotAllowed("other.org".to_owned()))
        );
    }

    #[test]
    fn test_block_list_wins() {
        let policy = EmailDomainPolicy::new(Vec::new(), vec!["spam.io".to_owned()]);
        assert!(policy.validate("jane@example.com").is_ok());
        assert!(matches!(
            policy.validate("bot@SPAM.io"),
            Err(DomainError::DomainNotAllowed(domain)) if domain == "spam.io"
        ));
    }
}
