//! Spreadsheet upload, preview and import handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::services::csv;
use crate::services::import_processor::ContactImportProcessor;
use crate::types::{
    CsvPreviewRequest, ErrorResponse, ImportError, ListRequest, ListResponse,
    ProcessSpreadsheetRequest, Request, SpreadsheetIdRequest, SuccessResponse,
    UploadSpreadsheetRequest,
};

const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Decode the base64 file payload carried in upload/preview requests.
fn decode_file_content(encoded: &str) -> Result<Vec<u8>, ImportError> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| ImportError::MalformedInput(format!("invalid base64 file content: {}", e)))
}

/// Handle spreadsheet.upload messages
///
/// Decodes and counts the file up front, so a file that is not text at all
/// is rejected here instead of producing a doomed `uploaded` record. The
/// raw text is stored on the record; processing reads it back later.
pub async fn handle_upload(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received spreadsheet.upload message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UploadSpreadsheetRequest> = match serde_json::from_slice(&msg.payload)
        {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "userId required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let parsed = decode_file_content(&request.payload.file_content)
            .and_then(|bytes| csv::parse_csv_bytes(&bytes, Some(0)).map(|p| (bytes, p)));

        let (bytes, parsed) = match parsed {
            Ok(ok) => ok,
            Err(e) => {
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // parse_csv_bytes verified the bytes are UTF-8
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let file_size = bytes.len() as i64;
        let contact_count = parsed.total_rows as i32;

        match queries::spreadsheet::create_spreadsheet(
            &pool,
            user_id,
            &request.payload.file_name,
            &text,
            contact_count,
            file_size,
        )
        .await
        {
            Ok(spreadsheet) => {
                info!(
                    "Spreadsheet '{}' uploaded as {} ({} rows, {} bytes)",
                    request.payload.file_name, spreadsheet.id, contact_count, file_size
                );
                let response = SuccessResponse::new(request.id, spreadsheet);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to create spreadsheet record: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle csv.preview messages
///
/// Pure parse of the supplied file content; nothing is stored.
pub async fn handle_preview(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received csv.preview message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CsvPreviewRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let preview_rows = request.payload.preview_rows.unwrap_or(DEFAULT_PREVIEW_ROWS);

        let parsed = decode_file_content(&request.payload.file_content)
            .and_then(|bytes| csv::parse_csv_bytes(&bytes, Some(preview_rows)));

        match parsed {
            Ok(parsed) => {
                let response = SuccessResponse::new(request.id, parsed);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle spreadsheet.process messages
///
/// Runs the whole import synchronously within the request and replies with
/// the run summary. Each message is handled on its own task so two users'
/// imports never queue behind each other; same-spreadsheet requests are
/// rejected by the processor's single-flight guard.
pub async fn handle_process(
    client: Client,
    mut subscriber: Subscriber,
    processor: Arc<ContactImportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received spreadsheet.process message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ProcessSpreadsheetRequest> = match serde_json::from_slice(&msg.payload)
        {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "userId required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let client_task = client.clone();
        let processor_task = Arc::clone(&processor);
        tokio::spawn(async move {
            let result = processor_task.process(user_id, &request.payload).await;

            let publish = match result {
                Ok(summary) => {
                    let response = SuccessResponse::new(request.id, summary);
                    serde_json::to_vec(&response)
                }
                Err(e) => {
                    warn!(
                        "Spreadsheet {} import rejected or failed: {}",
                        request.payload.spreadsheet_id, e
                    );
                    let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                    serde_json::to_vec(&error)
                }
            };

            match publish {
                Ok(bytes) => {
                    if let Err(e) = client_task.publish(reply, bytes.into()).await {
                        error!("Failed to publish process reply: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize process reply: {}", e),
            }
        });
    }

    Ok(())
}

/// Handle spreadsheet.get messages
pub async fn handle_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received spreadsheet.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SpreadsheetIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "userId required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::spreadsheet::get_spreadsheet(&pool, user_id, request.payload.id).await {
            Ok(Some(spreadsheet)) => {
                let response = SuccessResponse::new(request.id, spreadsheet);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "spreadsheet not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to get spreadsheet: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle spreadsheet.list messages
pub async fn handle_list(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received spreadsheet.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "userId required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let limit = request.payload.limit;
        let offset = request.payload.offset;

        let items = queries::spreadsheet::list_spreadsheets(&pool, user_id, limit, offset).await;
        let total = queries::spreadsheet::count_spreadsheets(&pool, user_id).await;

        match (items, total) {
            (Ok(items), Ok(total)) => {
                let response = SuccessResponse::new(
                    request.id,
                    ListResponse {
                        items,
                        total,
                        limit,
                        offset,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to list spreadsheets: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle spreadsheet.delete messages
///
/// A spreadsheet with a run in flight cannot be deleted.
pub async fn handle_delete(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received spreadsheet.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SpreadsheetIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "userId required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::spreadsheet::delete_spreadsheet(&pool, user_id, request.payload.id).await {
            Ok(true) => {
                let response = SuccessResponse::new(request.id, serde_json::json!({"deleted": true}));
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(false) => {
                let error = ErrorResponse::new(
                    request.id,
                    "NOT_FOUND",
                    "spreadsheet not found or currently processing",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to delete spreadsheet: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
