//! API Integration Tests
//!
//! Tests the HTTP API endpoints with a real database.
//!
//! Tests are serialized because they share a global test pool.
//!
//! Note: The `more-di` DI framework doesn't support injecting custom pools.
//! We work around this by using `DatabaseConnection::set_test_pool()` to set
//! a global pool that the DI-created DatabaseConnection will use.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
};
use common::setup_test_db;
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use livechat_email_inbox::{
    api,
    config::IngestConfig,
    core::attachments::StoreAttachmentMaterializer,
    core::guests::DbGuestResolver,
    core::ingest::InboxIngestService,
    core::leads::LeadParserRegistry,
    core::locks::SenderLocks,
    core::prospects::DbProspectRegistrar,
    core::sender::DbMessageSender,
    core::threads::DbThreadLocator,
    infrastructure::database::DatabaseConnection,
    infrastructure::file_store::DbFileStore,
    infrastructure::repositories::{
        DbDepartmentRepository, DbMessageRepository, DbProspectRepository, DbRoomRepository,
        DbVisitorRepository,
    },
};
use serde_json::Value;
use serial_test::serial;
use sqlx::SqlitePool;
use std::time::Duration;
use tower::ServiceExt;

const RAW_EMAIL: &str = concat!(
    "From: Jane Doe <jane@example.com>\r\n",
    "To: support@company.example\r\n",
    "Subject: Help with my account\r\n",
    "Message-ID: <api1@mail>\r\n",
    "Content-Type: text/plain; charset=utf-8\r\n",
    "\r\n",
    "I cannot log in.\r\n",
);

/// Setup test database with migrations and returns pool
async fn setup_shared_db() -> SqlitePool {
    let pool = setup_test_db().await;

    // Set this pool as the global test pool so DI uses it
    DatabaseConnection::set_test_pool(pool.clone());

    pool
}

/// Clean up after test
fn cleanup_test_db() {
    DatabaseConnection::clear_test_pool();
}

/// Create test app - uses the global test pool set by setup_shared_db()
fn create_test_app() -> axum::Router {
    let provider = ServiceCollection::new()
        .add(DatabaseConnection::transient())
        .add(IngestConfig::singleton())
        .add(SenderLocks::singleton())
        .add(LeadParserRegistry::singleton())
        .add(DbVisitorRepository::scoped())
        .add(DbDepartmentRepository::scoped())
        .add(DbRoomRepository::scoped())
        .add(DbMessageRepository::scoped())
        .add(DbProspectRepository::scoped())
        .add(DbFileStore::scoped())
        .add(DbGuestResolver::scoped())
        .add(DbThreadLocator::scoped())
        .add(StoreAttachmentMaterializer::scoped())
        .add(DbMessageSender::scoped())
        .add(DbProspectRegistrar::scoped())
        .add(InboxIngestService::scoped())
        .build_provider()
        .unwrap();

    axum::Router::new()
        .route("/health", get(api::health))
        .nest("/inboxes", api::inbox::router())
        .with_provider(provider)
}

async fn wait_for_rooms(pool: &SqlitePool, expected: i64) -> i64 {
    let mut count = 0;
    for _ in 0..100 {
        let (rooms,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
            .fetch_one(pool)
            .await
            .unwrap();
        count = rooms;
        if count == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    count
}

#[tokio::test]
#[serial]
async fn test_health() {
    let _pool = setup_shared_db().await;

    let app = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_post_email_is_accepted_and_ingested() {
    let pool = setup_shared_db().await;

    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inboxes/support/emails")
                .header("Content-Type", "message/rfc822")
                .body(Body::from(RAW_EMAIL))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["inbox"], "support");
    assert_eq!(json["message_id"], "api1@mail");

    assert_eq!(wait_for_rooms(&pool, 1).await, 1);
    let (source_id, reply_to): (String, String) =
        sqlx::query_as("SELECT source_id, email_reply_to FROM rooms")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(source_id, "support");
    assert_eq!(reply_to, "jane@example.com");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_post_empty_email_is_rejected() {
    let pool = setup_shared_db().await;

    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inboxes/support/emails")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("failed to parse"));

    let (visitors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM visitors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(visitors, 0);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_post_email_with_invalid_department_header() {
    let _pool = setup_shared_db().await;

    let app = create_test_app();

    let mut request = Request::builder()
        .method("POST")
        .uri("/inboxes/support/emails")
        .body(Body::from(RAW_EMAIL))
        .unwrap();
    request.headers_mut().insert(
        "X-Department-ID",
        axum::http::HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    cleanup_test_db();
}
