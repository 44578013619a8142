//! Email inbox ingestion service for livechat

use livechat_email_inbox::api;
use livechat_email_inbox::config::IngestConfig;
use livechat_email_inbox::core::attachments::StoreAttachmentMaterializer;
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

use anyhow::{Context, anyhow};
use axum::Router;
use axum::http::Method;
use axum::routing::get;
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task())
}

async fn web_server_task() -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(DatabaseConnection::singleton())
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
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await
        .context("failed to run database migrations")?;

    let config = provider.get_required::<IngestConfig>();
    info!(
        "language {}, max upload size {:?}",
        config.language, config.file_upload_max_size
    );

    let app = Router::new()
        .route("/health", get(api::health))
        .nest("/inboxes", api::inbox::router())
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_headers(Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_origin(Any),
            ),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
