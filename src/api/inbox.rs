//! Inbox endpoints, called by the mail connector for every received email

use crate::api::ExtractDepartment;
use crate::core::email::InboundEmail;
use crate::core::traits::{EmailIngestService, IngestOutcome};
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::{error, info, warn};

pub fn router() -> Router {
    Router::new().route("/:inbox/emails", post(receive_email))
}

async fn receive_email(
    Inject(ingest_service): Inject<dyn EmailIngestService>,
    Path(inbox): Path<String>,
    ExtractDepartment(department): ExtractDepartment,
    body: Bytes,
) -> Result<(StatusCode, Json<schemas::EmailAccepted>), (StatusCode, Json<schemas::ErrorBody>)> {
    let email = InboundEmail::parse(&body).map_err(|e| {
        warn!("Rejected email for inbox {inbox}: {e}");
        (
            StatusCode::BAD_REQUEST,
            Json(schemas::ErrorBody {
                error: e.to_string(),
            }),
        )
    })?;

    let accepted = schemas::EmailAccepted {
        inbox: inbox.clone(),
        message_id: email.message_id.clone(),
    };

    tokio::spawn(async move {
        match ingest_service
            .on_email_received(email, &inbox, department.as_deref())
            .await
        {
            Ok(IngestOutcome::Sent {
                room_id,
                message_id,
                reopened,
                attachments,
            }) => info!(
                "Inbox {inbox}: message {message_id} in room {room_id} (reopened: {reopened}, attachments: {attachments})"
            ),
            Ok(outcome) => info!("Inbox {inbox}: {outcome:?}"),
            Err(e) => error!("Inbox {inbox}: failed to ingest email: {e}"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub mod schemas {
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct EmailAccepted {
        pub inbox: String,
        pub message_id: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct ErrorBody {
        pub error: String,
    }
}
