//! Service settings, read from the environment (and `.env`).

use di::{inject, injectable};
use log::warn;
use std::env;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_FILE_SIZE: u64 = 104_857_600;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: String,
    /// Language of the labels rendered into messages.
    pub language: String,
    /// When non-empty, lead emails must belong to one of these domains.
    pub allowed_email_domains: Vec<String>,
    pub blocked_email_domains: Vec<String>,
    /// `None` means attachments of any size are stored.
    pub file_upload_max_size: Option<u64>,
    /// Prefix prepended to every public upload path.
    pub root_url_path_prefix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            language: "en".to_owned(),
            allowed_email_domains: Vec::new(),
            blocked_email_domains: Vec::new(),
            file_upload_max_size: Some(DEFAULT_MAX_FILE_SIZE),
            root_url_path_prefix: String::new(),
        }
    }
}

#[injectable]
impl IngestConfig {
    #[inject]
    pub fn create() -> IngestConfig {
        IngestConfig::from_env()
    }
}

impl IngestConfig {
    pub fn from_env() -> IngestConfig {
        dotenvy::dotenv().ok();
        IngestConfig::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the settings from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> IngestConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = IngestConfig::default();

        let file_upload_max_size = match lookup("FILE_UPLOAD_MAX_SIZE") {
            None => defaults.file_upload_max_size,
            Some(value) => match value.trim().parse::<i64>() {
                Ok(size) if size < 0 => None,
                Ok(size) => Some(size as u64),
                Err(_) => {
                    warn!("invalid FILE_UPLOAD_MAX_SIZE {value:?}, using default");
                    defaults.file_upload_max_size
                }
            },
        };

        IngestConfig {
            listen_addr: lookup("LISTEN_ADDR")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.listen_addr),
            language: lookup("LANGUAGE")
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.language),
            allowed_email_domains: lookup("ALLOWED_EMAIL_DOMAINS")
                .map(|value| domain_list(&value))
                .unwrap_or_default(),
            blocked_email_domains: lookup("BLOCKED_EMAIL_DOMAINS")
                .map(|value| domain_list(&value))
                .unwrap_or_default(),
            file_upload_max_size,
            root_url_path_prefix: lookup("ROOT_URL_PATH_PREFIX")
                .map(|value| value.trim().trim_end_matches('/').to_owned())
                .unwrap_or_default(),
        }
    }
}

fn domain_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|domain| domain.trim().to_lowercase())
        .filter(|domain| !domain.is_empty())
        .collect()
}
