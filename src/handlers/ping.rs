//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PongResponse {
    message: String,
    service: String,
    timestamp: String,
}

/// Handle ping messages
pub async fn handle_ping(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        let request: PingRequest = serde_json::from_slice(&msg.payload).unwrap_or(PingRequest {
            message: None,
        });

        let response = PongResponse {
            message: request
                .message
                .map(|m| format!("Pong: {}", m))
                .unwrap_or_else(|| "Pong".to_string()),
            service: "sendaro-worker".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let response_bytes = serde_json::to_vec(&response)?;
        client.publish(reply, response_bytes.into()).await?;

        debug!("Sent pong response");
    }

    Ok(())
}
