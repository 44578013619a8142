//! Shared setup for the integration tests: an in-memory database with the
//! migrations applied and the services wired by hand.

#![allow(dead_code)]

use chrono::Utc;
use di::Ref;
use livechat_email_inbox::config::IngestConfig;
use livechat_email_inbox::core::attachments::StoreAttachmentMaterializer;
use livechat_email_inbox::core::email::{EmailAttachment, InboundEmail, Mailbox};
use livechat_email_inbox::core::guests::DbGuestResolver;
use livechat_email_inbox::core::ingest::InboxIngestService;
use livechat_email_inbox::core::leads::LeadParserRegistry;
use livechat_email_inbox::core::locks::SenderLocks;
use livechat_email_inbox::core::prospects::DbProspectRegistrar;
use livechat_email_inbox::core::sender::DbMessageSender;
use livechat_email_inbox::core::threads::DbThreadLocator;
use livechat_email_inbox::infrastructure::database::DatabaseConnection;
use livechat_email_inbox::infrastructure::file_store::DbFileStore;
use livechat_email_inbox::infrastructure::repositories::{
    DbDepartmentRepository, DbMessageRepository, DbProspectRepository, DbRoomRepository,
    DbVisitorRepository,
};
use livechat_email_inbox::infrastructure::traits::{
    DepartmentRepository, FileStore, MessageRepository, ProspectRepository, RoomRepository,
    VisitorRepository,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

pub const QUOTE_WIZARD_LEAD: &str = "*Please do not respond to this email.Leads are sent from an unmonitored mailbox.*

Contact Information
NAME: Jane Doe
EMAIL: Jane.Doe@Example.com
ADDRESS: 12 Main St
PHONE: 555-0100
CITY / STATE / ZIP: Springfield, IL 62701
Health Details
DATE OF BIRTH: 1980-01-02
GENDER: Female
Coverage
COVERAGE TYPE: Individual
IS MEDICARE: No
Custom Lead Type Name : Exclusive
";

/// A single connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

pub struct Harness {
    pub pool: SqlitePool,
    pub config: Ref<IngestConfig>,
    pub locks: Ref<SenderLocks>,
    pub visitors: Ref<dyn VisitorRepository>,
    pub departments: Ref<dyn DepartmentRepository>,
    pub rooms: Ref<dyn RoomRepository>,
    pub messages: Ref<dyn MessageRepository>,
    pub prospects: Ref<dyn ProspectRepository>,
    pub files: Ref<dyn FileStore>,
}

impl Harness {
    pub async fn new() -> Harness {
        Harness::with_config(IngestConfig::default()).await
    }

    pub async fn with_config(config: IngestConfig) -> Harness {
        let pool = setup_test_db().await;
        let connection = Ref::new(DatabaseConnection::from_pool(pool.clone()));
        let config = Ref::new(config);

        Harness {
            pool,
            locks: Ref::new(SenderLocks::default()),
            visitors: Ref::new(DbVisitorRepository::new(connection.clone())),
            departments: Ref::new(DbDepartmentRepository::new(connection.clone())),
            rooms: Ref::new(DbRoomRepository::new(connection.clone())),
            messages: Ref::new(DbMessageRepository::new(connection.clone())),
            prospects: Ref::new(DbProspectRepository::new(connection.clone())),
            files: Ref::new(DbFileStore::new(connection, config.clone())),
            config,
        }
    }

    pub fn guest_resolver(&self) -> DbGuestResolver {
        DbGuestResolver::new(self.visitors.clone(), self.departments.clone())
    }

    pub fn prospect_registrar(&self) -> DbProspectRegistrar {
        DbProspectRegistrar::new(self.prospects.clone(), self.config.clone())
    }

    pub fn ingest_service(&self) -> InboxIngestService {
        self.ingest_service_with_files(self.files.clone())
    }

    pub fn ingest_service_with_files(&self, files: Ref<dyn FileStore>) -> InboxIngestService {
        InboxIngestService::new(
            Ref::new(LeadParserRegistry::create()),
            Ref::new(self.prospect_registrar()),
            Ref::new(self.guest_resolver()),
            Ref::new(DbThreadLocator::new(self.rooms.clone())),
            self.rooms.clone(),
            self.messages.clone(),
            Ref::new(DbMessageSender::new(self.rooms.clone())),
            Ref::new(StoreAttachmentMaterializer::new(files, self.config.clone())),
            self.locks.clone(),
            self.config.clone(),
        )
    }

    pub async fn add_department(&self, id: &str, name: &str, enabled: bool) {
        sqlx::query("INSERT INTO departments (id, name, enabled) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(enabled)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn close_room(&self, room_id: Uuid) {
        sqlx::query("UPDATE rooms SET open = 0, closed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(room_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count
    }
}

pub fn email_from(address: &str, message_id: &str) -> InboundEmail {
    InboundEmail {
        from: Some(Mailbox {
            address: address.to_owned(),
            name: Some("Jane Doe".to_owned()),
        }),
        subject: "Question about my plan".to_owned(),
        text: Some("Hello, I have a question.".to_owned()),
        message_id: Some(message_id.to_owned()),
        ..Default::default()
    }
}

pub fn reply_from(address: &str, message_id: &str, parent: &str) -> InboundEmail {
    InboundEmail {
        in_reply_to: vec![parent.to_owned()],
        references: vec![parent.to_owned()],
        ..email_from(address, message_id)
    }
}

pub fn attachment(filename: &str, content_type: &str, content: &[u8]) -> EmailAttachment {
    EmailAttachment {
        filename: filename.to_owned(),
        content_type: content_type.to_owned(),
        size: content.len() as u64,
        content: content.to_vec(),
        inline: false,
    }
}
