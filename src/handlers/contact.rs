//! Contact message handlers

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::services::normalize::{normalize_phone, INVALID_PHONE};
use crate::types::{
    BulkDeleteContactsRequest, BulkDeleteContactsResponse, ContactIdRequest,
    CreateContactRequest, ErrorResponse, ListRequest, ListResponse, Request, SuccessResponse,
    UpdateContactRequest,
};

/// Handle contact.create messages
///
/// The single-contact API runs the same phone normalization as the import
/// pipeline, so a hand-entered contact can never slip past dedup with a
/// differently-formatted number.
pub async fn handle_create(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateContactRequest> = match serde_json::from_slice(&msg.payload) {
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

        let mut create_request = request.payload.clone();
        create_request.phone = match normalize_phone(&create_request.phone) {
            Some(phone) => phone,
            None => {
                let error = ErrorResponse::new(request.id, "INVALID_PHONE", INVALID_PHONE);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::contact::create_contact(&pool, user_id, &create_request).await {
            Ok(contact) => {
                debug!("Created contact {}", contact.id);
                let response = SuccessResponse::new(request.id, contact);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) if queries::contact::is_unique_violation(&e) => {
                let error = ErrorResponse::new(
                    request.id,
                    "DUPLICATE_CONTACT",
                    "a contact with this phone number already exists",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to create contact: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle contact.list messages
pub async fn handle_list(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.list message");

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
        let search = request.payload.search.as_deref();

        let items = queries::contact::list_contacts(&pool, user_id, limit, offset, search).await;
        let total = queries::contact::count_contacts(&pool, user_id, search).await;

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
                error!("Failed to list contacts: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle contact.get messages
pub async fn handle_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ContactIdRequest> = match serde_json::from_slice(&msg.payload) {
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

        match queries::contact::get_contact(&pool, user_id, request.payload.id).await {
            Ok(Some(contact)) => {
                let response = SuccessResponse::new(request.id, contact);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "contact not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to get contact: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle contact.update messages
pub async fn handle_update(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateContactRequest> = match serde_json::from_slice(&msg.payload) {
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

        let mut update_request = request.payload.clone();
        if let Some(raw_phone) = update_request.phone.take() {
            match normalize_phone(&raw_phone) {
                Some(phone) => update_request.phone = Some(phone),
                None => {
                    let error = ErrorResponse::new(request.id, "INVALID_PHONE", INVALID_PHONE);
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            }
        }

        match queries::contact::update_contact(&pool, user_id, &update_request).await {
            Ok(Some(contact)) => {
                let response = SuccessResponse::new(request.id, contact);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "contact not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) if queries::contact::is_unique_violation(&e) => {
                let error = ErrorResponse::new(
                    request.id,
                    "DUPLICATE_CONTACT",
                    "a contact with this phone number already exists",
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to update contact: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle contact.delete messages
pub async fn handle_delete(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ContactIdRequest> = match serde_json::from_slice(&msg.payload) {
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

        match queries::contact::delete_contact(&pool, user_id, request.payload.id).await {
            Ok(true) => {
                let response = SuccessResponse::new(request.id, serde_json::json!({"deleted": true}));
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(false) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "contact not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to delete contact: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle contact.delete.bulk messages
pub async fn handle_delete_bulk(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.delete.bulk message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BulkDeleteContactsRequest> = match serde_json::from_slice(&msg.payload)
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

        match queries::contact::delete_contacts_bulk(&pool, user_id, &request.payload.ids).await {
            Ok(deleted) => {
                debug!("Bulk-deleted {} contacts", deleted);
                let response =
                    SuccessResponse::new(request.id, BulkDeleteContactsResponse { deleted });
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to bulk-delete contacts: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
