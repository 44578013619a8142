//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Department, Message, MessageAttachment, Prospect, ProspectData, Room, Visitor,
};
use crate::infrastructure::traits::{
    DepartmentRepository, MessageRepository, NewRoom, ProspectRepository, RepositoryError,
    RoomRepository, VisitorRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::debug;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[injectable(VisitorRepository)]
pub struct DbVisitorRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbVisitorRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbVisitorRepository { connection }
    }
}

#[async_trait]
impl VisitorRepository for DbVisitorRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Visitor>, RepositoryError> {
        Ok(sqlx::query_as("SELECT * FROM visitors WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Visitor>, RepositoryError> {
        Ok(sqlx::query_as("SELECT * FROM visitors WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn create_visitor(&self, visitor: Visitor) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO visitors (id, token, name, email, department, created_at) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(visitor.id)
        .bind(visitor.token)
        .bind(visitor.name)
        .bind(visitor.email)
        .bind(visitor.department)
        .bind(visitor.created_at)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_department(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE visitors SET department = NULL WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;
        Ok(())
    }

    async fn set_department(&self, id: Uuid, department: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE visitors SET department = ? WHERE id = ?")
            .bind(department)
            .bind(id)
            .execute(&**self.connection)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "visitor",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[injectable(DepartmentRepository)]
pub struct DbDepartmentRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbDepartmentRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbDepartmentRepository { connection }
    }
}

#[async_trait]
impl DepartmentRepository for DbDepartmentRepository {
    async fn find_by_id_or_name(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT * FROM departments WHERE id = ? OR name = ? ORDER BY id = ? DESC LIMIT 1",
        )
        .bind(id_or_name)
        .bind(id_or_name)
        .bind(id_or_name)
        .fetch_optional(&**self.connection)
        .await?)
    }
}

#[injectable(RoomRepository)]
pub struct DbRoomRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbRoomRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbRoomRepository { connection }
    }
}

#[async_trait]
impl RoomRepository for DbRoomRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, RepositoryError> {
        Ok(sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn find_by_visitor_token_and_email_thread(
        &self,
        visitor_token: &str,
        thread: &[String],
        department: Option<&str>,
    ) -> Result<Option<Room>, RepositoryError> {
        if thread.is_empty() {
            return Ok(None);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM rooms WHERE visitor_token = ");
        query.push_bind(visitor_token.to_owned());
        if let Some(department) = department {
            query.push(" AND department = ");
            query.push_bind(department.to_owned());
        }
        query.push(" AND id IN (SELECT room_id FROM room_email_threads WHERE thread_id IN (");
        let mut ids = query.separated(", ");
        for thread_id in thread {
            ids.push_bind(thread_id.clone());
        }
        ids.push_unseparated("))");
        query.push(" ORDER BY julianday(updated_at) DESC, julianday(created_at) DESC LIMIT 1");

        Ok(query
            .build_query_as::<Room>()
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn list_email_thread(&self, room_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT thread_id FROM room_email_threads WHERE room_id = ? ORDER BY rowid ASC",
        )
        .bind(room_id)
        .fetch_all(&**self.connection)
        .await?;

        Ok(rows.into_iter().map(|(thread_id,)| thread_id).collect())
    }

    async fn add_to_email_thread(
        &self,
        room_id: Uuid,
        thread: &[String],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.connection.begin().await?;
        for thread_id in thread {
            sqlx::query(
                "INSERT INTO room_email_threads (room_id, thread_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(room_id)
            .bind(thread_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reopen_room(&self, room_id: Uuid) -> Result<Room, RepositoryError> {
        sqlx::query_as(
            "UPDATE rooms SET open = 1, closed_at = NULL, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(Utc::now())
        .bind(room_id)
        .fetch_optional(&**self.connection)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "room",
            id: room_id.to_string(),
        })
    }

    async fn create_message_in_room(
        &self,
        room: NewRoom,
        message: Message,
    ) -> Result<(Room, Message), RepositoryError> {
        let mut tx = self.connection.begin().await?;

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = ?")
            .bind(room.id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_none() {
            debug!("creating room {} for visitor {}", room.id, room.visitor_id);
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO rooms (id, visitor_id, visitor_token, department, source_type, source_id, source_alias, email_inbox, email_reply_to, email_subject, open, closed_at, messages_count, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, NULL, 0, ?, ?)",
            )
            .bind(room.id)
            .bind(room.visitor_id)
            .bind(&room.visitor_token)
            .bind(&room.department)
            .bind(&room.source_type)
            .bind(&room.source_id)
            .bind(&room.source_alias)
            .bind(&room.email_inbox)
            .bind(&room.email_reply_to)
            .bind(&room.email_subject)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for thread_id in &room.email_thread {
                sqlx::query(
                    "INSERT INTO room_email_threads (room_id, thread_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
                )
                .bind(room.id)
                .bind(thread_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let message: Message = sqlx::query_as(
            "INSERT INTO messages (id, room_id, text, token, groupable, attachments, blocks, email_thread, email_message_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(message.id)
        .bind(room.id)
        .bind(message.text)
        .bind(message.token)
        .bind(message.groupable)
        .bind(message.attachments)
        .bind(message.blocks)
        .bind(message.email_thread)
        .bind(message.email_message_id)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let room: Room = sqlx::query_as(
            "UPDATE rooms SET messages_count = messages_count + 1, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(message.created_at)
        .bind(room.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((room, message))
    }
}

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbMessageRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbMessageRepository { connection }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, RepositoryError> {
        Ok(sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT * FROM messages WHERE room_id = ? ORDER BY julianday(created_at) ASC",
        )
        .bind(room_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn add_attachments(
        &self,
        message_id: Uuid,
        attachments: Vec<MessageAttachment>,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.connection.begin().await?;

        let message: Message = sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "message",
                id: message_id.to_string(),
            })?;

        let Json(mut merged) = message.attachments;
        for attachment in attachments {
            if !merged.contains(&attachment) {
                merged.push(attachment);
            }
        }

        let message: Message = sqlx::query_as("UPDATE messages SET attachments = ? WHERE id = ? RETURNING *")
            .bind(Json(merged))
            .bind(message_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }
}

#[injectable(ProspectRepository)]
pub struct DbProspectRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbProspectRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbProspectRepository { connection }
    }
}

#[async_trait]
impl ProspectRepository for DbProspectRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Prospect>, RepositoryError> {
        Ok(sqlx::query_as("SELECT * FROM prospects WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn create_prospect(
        &self,
        id: Uuid,
        data: &ProspectData,
        created_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO prospects (id, name, email, phone, prospect_type, location, street, gender, birth, height, weight, tobacco, relation, marital_status, preexisting_conditions, type_of_condition, people_in_household, annual_income, self_employed, qualifying_life_event, expectant_parent, medications, health_of_condition, denied_coverage, treated_by_physician, plan_types, optional_coverage, currently_insured, policy_expires, covered_for, current_provider, record_type, lead_vendor, campaign, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.prospect_type)
        .bind(&data.location)
        .bind(&data.street)
        .bind(&data.gender)
        .bind(&data.birth)
        .bind(&data.height)
        .bind(&data.weight)
        .bind(&data.tobacco)
        .bind(&data.relation)
        .bind(&data.marital_status)
        .bind(&data.preexisting_conditions)
        .bind(&data.type_of_condition)
        .bind(&data.people_in_household)
        .bind(&data.annual_income)
        .bind(&data.self_employed)
        .bind(&data.qualifying_life_event)
        .bind(&data.expectant_parent)
        .bind(&data.medications)
        .bind(&data.health_of_condition)
        .bind(&data.denied_coverage)
        .bind(&data.treated_by_physician)
        .bind(&data.plan_types)
        .bind(&data.optional_coverage)
        .bind(&data.currently_insured)
        .bind(&data.policy_expires)
        .bind(&data.covered_for)
        .bind(&data.current_provider)
        .bind(&data.record_type)
        .bind(&data.lead_vendor)
        .bind(&data.campaign)
        .bind(created_at)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
