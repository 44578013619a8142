//! Guest resolution: the visitor behind an email address.

use crate::core::errors::GuestError;
use crate::core::traits::GuestResolver;
use crate::infrastructure::entities::Visitor;
use crate::infrastructure::traits::{DepartmentRepository, VisitorRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::debug;
use uuid::Uuid;

/// Treats a blank department the same as no department.
pub fn normalize_department(department: Option<&str>) -> Option<&str> {
    department.map(str::trim).filter(|d| !d.is_empty())
}

#[injectable(GuestResolver)]
pub struct DbGuestResolver {
    visitors: Ref<dyn VisitorRepository>,
    departments: Ref<dyn DepartmentRepository>,
}

impl DbGuestResolver {
    pub fn new(
        visitors: Ref<dyn VisitorRepository>,
        departments: Ref<dyn DepartmentRepository>,
    ) -> Self {
        DbGuestResolver {
            visitors,
            departments,
        }
    }

    /// Returns the id of an enabled department matching `id_or_name`.
    async fn department_id(&self, id_or_name: &str) -> Result<String, GuestError> {
        match self.departments.find_by_id_or_name(id_or_name).await? {
            Some(department) if department.enabled => Ok(department.id),
            _ => Err(GuestError::DepartmentNotFound(id_or_name.to_owned())),
        }
    }
}

#[async_trait]
impl GuestResolver for DbGuestResolver {
    async fn resolve_guest(
        &self,
        email: &str,
        name: Option<&str>,
        department: Option<&str>,
    ) -> Result<Option<Visitor>, GuestError> {
        let department = normalize_department(department);
        debug!("Attempt to register a guest for {email} on department: {department:?}");

        if let Some(mut guest) = self.visitors.find_by_email(email).await? {
            debug!("Guest with email {email} found with id {}", guest.id);

            let Some(department) = department else {
                if guest.department.is_some() {
                    debug!("Removing department {:?} from guest {}", guest.department, guest.id);
                    self.visitors.remove_department(guest.id).await?;
                    guest.department = None;
                }
                return Ok(Some(guest));
            };

            // The department may be addressed by name; guests store its id.
            let department_id = self.department_id(department).await?;
            if guest.department.as_deref() == Some(department_id.as_str()) {
                return Ok(Some(guest));
            }

            debug!(
                "Switching departments for guest {}: {:?} -> {department_id}",
                guest.id, guest.department
            );
            self.visitors.set_department(guest.id, &department_id).await?;
            return Ok(self.visitors.find_by_id(guest.id).await?);
        }

        debug!("Creating a new guest for visitor with email {email}");
        let department = match department {
            Some(department) => Some(self.department_id(department).await?),
            None => None,
        };
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(email);

        let created = self
            .visitors
            .create_visitor(Visitor {
                id: Uuid::new_v4(),
                token: Uuid::new_v4().simple().to_string(),
                name: name.to_owned(),
                email: email.to_owned(),
                department,
                created_at: Utc::now(),
            })
            .await?;
        if !created {
            debug!("Guest for {email} was created concurrently, reusing it");
        }

        let guest = self
            .visitors
            .find_by_email(email)
            .await?
            .ok_or_else(|| GuestError::GuestCreationFailed(email.to_owned()))?;
        debug!("Guest {} for visitor {email} created", guest.id);

        Ok(Some(guest))
    }
}
