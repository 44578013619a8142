//! Prospect (CRM lead) registration.

use crate::config::IngestConfig;
use crate::core::domains::EmailDomainPolicy;
use crate::core::errors::ProspectError;
use crate::core::traits::ProspectRegistrar;
use crate::infrastructure::entities::ProspectData;
use crate::infrastructure::traits::ProspectRepository;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{debug, info};
use uuid::Uuid;

pub const PROSPECT_RECORD_TYPE: &str = "prospect";

#[injectable(ProspectRegistrar)]
pub struct DbProspectRegistrar {
    prospects: Ref<dyn ProspectRepository>,
    config: Ref<IngestConfig>,
}

impl DbProspectRegistrar {
    pub fn new(prospects: Ref<dyn ProspectRepository>, config: Ref<IngestConfig>) -> Self {
        DbProspectRegistrar { prospects, config }
    }
}

#[async_trait]
impl ProspectRegistrar for DbProspectRegistrar {
    async fn register_prospect(&self, mut data: ProspectData) -> Result<Uuid, ProspectError> {
        data.email = data.email.trim().to_lowercase();
        data.record_type = PROSPECT_RECORD_TYPE.to_owned();

        EmailDomainPolicy::from_config(&self.config).validate(&data.email)?;

        if let Some(existing) = self.prospects.find_by_email(&data.email).await? {
            debug!("prospect {} already registered as {}", data.email, existing.id);
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        if !self.prospects.create_prospect(id, &data, Utc::now()).await? {
            debug!("prospect {} was created concurrently", data.email);
        }

        let prospect = self
            .prospects
            .find_by_email(&data.email)
            .await?
            .ok_or_else(|| ProspectError::CreationFailed(data.email.clone()))?;
        info!(
            "registered prospect {} from {:?}",
            prospect.id, prospect.data.lead_vendor
        );
        Ok(prospect.id)
    }
}
