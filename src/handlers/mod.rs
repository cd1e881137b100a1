//! NATS message handlers

pub mod contact;
pub mod ping;
pub mod spreadsheet;
pub mod template;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::services::import_processor::ContactImportProcessor;

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool) -> Result<()> {
    info!("Starting message handlers...");

    // Shared import orchestrator
    let processor = Arc::new(ContactImportProcessor::new(pool.clone()));

    // Subscribe to all subjects
    let ping_sub = client.subscribe("sendaro.ping").await?;

    // Contact subjects
    let contact_create_sub = client.subscribe("sendaro.contact.create").await?;
    let contact_list_sub = client.subscribe("sendaro.contact.list").await?;
    let contact_get_sub = client.subscribe("sendaro.contact.get").await?;
    let contact_update_sub = client.subscribe("sendaro.contact.update").await?;
    let contact_delete_sub = client.subscribe("sendaro.contact.delete").await?;
    let contact_delete_bulk_sub = client.subscribe("sendaro.contact.delete.bulk").await?;

    // Template subjects
    let template_create_sub = client.subscribe("sendaro.template.create").await?;
    let template_list_sub = client.subscribe("sendaro.template.list").await?;
    let template_get_sub = client.subscribe("sendaro.template.get").await?;
    let template_update_sub = client.subscribe("sendaro.template.update").await?;
    let template_delete_sub = client.subscribe("sendaro.template.delete").await?;

    // Spreadsheet / import subjects
    let spreadsheet_upload_sub = client.subscribe("sendaro.spreadsheet.upload").await?;
    let spreadsheet_list_sub = client.subscribe("sendaro.spreadsheet.list").await?;
    let spreadsheet_get_sub = client.subscribe("sendaro.spreadsheet.get").await?;
    let spreadsheet_delete_sub = client.subscribe("sendaro.spreadsheet.delete").await?;
    let spreadsheet_process_sub = client.subscribe("sendaro.spreadsheet.process").await?;
    let csv_preview_sub = client.subscribe("sendaro.csv.preview").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();

    let client_contact_create = client.clone();
    let client_contact_list = client.clone();
    let client_contact_get = client.clone();
    let client_contact_update = client.clone();
    let client_contact_delete = client.clone();
    let client_contact_delete_bulk = client.clone();

    let client_template_create = client.clone();
    let client_template_list = client.clone();
    let client_template_get = client.clone();
    let client_template_update = client.clone();
    let client_template_delete = client.clone();

    let client_spreadsheet_upload = client.clone();
    let client_spreadsheet_list = client.clone();
    let client_spreadsheet_get = client.clone();
    let client_spreadsheet_delete = client.clone();
    let client_spreadsheet_process = client.clone();
    let client_csv_preview = client.clone();

    let pool_contact_create = pool.clone();
    let pool_contact_list = pool.clone();
    let pool_contact_get = pool.clone();
    let pool_contact_update = pool.clone();
    let pool_contact_delete = pool.clone();
    let pool_contact_delete_bulk = pool.clone();

    let pool_template_create = pool.clone();
    let pool_template_list = pool.clone();
    let pool_template_get = pool.clone();
    let pool_template_update = pool.clone();
    let pool_template_delete = pool.clone();

    let pool_spreadsheet_upload = pool.clone();
    let pool_spreadsheet_list = pool.clone();
    let pool_spreadsheet_get = pool.clone();
    let pool_spreadsheet_delete = pool.clone();

    let processor_process = Arc::clone(&processor);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move { ping::handle_ping(client_ping, ping_sub).await });

    let contact_create_handle = tokio::spawn(async move {
        contact::handle_create(client_contact_create, contact_create_sub, pool_contact_create).await
    });

    let contact_list_handle = tokio::spawn(async move {
        contact::handle_list(client_contact_list, contact_list_sub, pool_contact_list).await
    });

    let contact_get_handle = tokio::spawn(async move {
        contact::handle_get(client_contact_get, contact_get_sub, pool_contact_get).await
    });

    let contact_update_handle = tokio::spawn(async move {
        contact::handle_update(client_contact_update, contact_update_sub, pool_contact_update).await
    });

    let contact_delete_handle = tokio::spawn(async move {
        contact::handle_delete(client_contact_delete, contact_delete_sub, pool_contact_delete).await
    });

    let contact_delete_bulk_handle = tokio::spawn(async move {
        contact::handle_delete_bulk(
            client_contact_delete_bulk,
            contact_delete_bulk_sub,
            pool_contact_delete_bulk,
        )
        .await
    });

    // Template handlers
    let template_create_handle = tokio::spawn(async move {
        template::handle_create(
            client_template_create,
            template_create_sub,
            pool_template_create,
        )
        .await
    });

    let template_list_handle = tokio::spawn(async move {
        template::handle_list(client_template_list, template_list_sub, pool_template_list).await
    });

    let template_get_handle = tokio::spawn(async move {
        template::handle_get(client_template_get, template_get_sub, pool_template_get).await
    });

    let template_update_handle = tokio::spawn(async move {
        template::handle_update(
            client_template_update,
            template_update_sub,
            pool_template_update,
        )
        .await
    });

    let template_delete_handle = tokio::spawn(async move {
        template::handle_delete(
            client_template_delete,
            template_delete_sub,
            pool_template_delete,
        )
        .await
    });

    // Spreadsheet handlers
    let spreadsheet_upload_handle = tokio::spawn(async move {
        spreadsheet::handle_upload(
            client_spreadsheet_upload,
            spreadsheet_upload_sub,
            pool_spreadsheet_upload,
        )
        .await
    });

    let spreadsheet_list_handle = tokio::spawn(async move {
        spreadsheet::handle_list(
            client_spreadsheet_list,
            spreadsheet_list_sub,
            pool_spreadsheet_list,
        )
        .await
    });

    let spreadsheet_get_handle = tokio::spawn(async move {
        spreadsheet::handle_get(
            client_spreadsheet_get,
            spreadsheet_get_sub,
            pool_spreadsheet_get,
        )
        .await
    });

    let spreadsheet_delete_handle = tokio::spawn(async move {
        spreadsheet::handle_delete(
            client_spreadsheet_delete,
            spreadsheet_delete_sub,
            pool_spreadsheet_delete,
        )
        .await
    });

    let spreadsheet_process_handle = tokio::spawn(async move {
        spreadsheet::handle_process(
            client_spreadsheet_process,
            spreadsheet_process_sub,
            processor_process,
        )
        .await
    });

    let csv_preview_handle = tokio::spawn(async move {
        spreadsheet::handle_preview(client_csv_preview, csv_preview_sub).await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which means an error occurred)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = contact_create_handle => {
            error!("Contact create handler finished: {:?}", result);
        }
        result = contact_list_handle => {
            error!("Contact list handler finished: {:?}", result);
        }
        result = contact_get_handle => {
            error!("Contact get handler finished: {:?}", result);
        }
        result = contact_update_handle => {
            error!("Contact update handler finished: {:?}", result);
        }
        result = contact_delete_handle => {
            error!("Contact delete handler finished: {:?}", result);
        }
        result = contact_delete_bulk_handle => {
            error!("Contact bulk delete handler finished: {:?}", result);
        }
        result = template_create_handle => {
            error!("Template create handler finished: {:?}", result);
        }
        result = template_list_handle => {
            error!("Template list handler finished: {:?}", result);
        }
        result = template_get_handle => {
            error!("Template get handler finished: {:?}", result);
        }
        result = template_update_handle => {
            error!("Template update handler finished: {:?}", result);
        }
        result = template_delete_handle => {
            error!("Template delete handler finished: {:?}", result);
        }
        result = spreadsheet_upload_handle => {
            error!("Spreadsheet upload handler finished: {:?}", result);
        }
        result = spreadsheet_list_handle => {
            error!("Spreadsheet list handler finished: {:?}", result);
        }
        result = spreadsheet_get_handle => {
            error!("Spreadsheet get handler finished: {:?}", result);
        }
        result = spreadsheet_delete_handle => {
            error!("Spreadsheet delete handler finished: {:?}", result);
        }
        result = spreadsheet_process_handle => {
            error!("Spreadsheet process handler finished: {:?}", result);
        }
        result = csv_preview_handle => {
            error!("CSV preview handler finished: {:?}", result);
        }
    }

    Ok(())
}
