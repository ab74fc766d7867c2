// Ethernet Bundle - Message Bus Transport
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! JSON-lines message transport over stdio.
//!
//! Every stdin line is one request message; every stdout line is either a
//! response to a request or a change event. Responses and events share one
//! ordered channel so an event is never written ahead of the response that
//! caused it. Requests are handled one at a time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use crate::handlers;
use crate::network_utils::NetworkAdapter;
use crate::reconciler::Reconciler;

/// Request verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

/// Inbound request message.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Correlation id echoed in the response.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: Method,
    pub resource: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Request {
    pub fn new(method: Method, resource: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            id: None,
            method,
            resource: resource.into(),
            data,
        }
    }
}

/// Handler result: HTTP-like code plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: u16,
    pub data: Value,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self { code: 200, data }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            data: json!({ "message": message.into() }),
        }
    }
}

/// Outbound message: a response or an event.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: Method,
    pub resource: String,
    pub code: u16,
    pub data: Value,
}

/// Sink for change events.
pub trait Notifier {
    /// Publish `data` on `resource`.
    fn publish(&self, resource: &str, data: Value);
}

/// Notifier that queues events on the outbound channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Message>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn publish(&self, resource: &str, data: Value) {
        let event = Message {
            id: None,
            method: Method::Put,
            resource: resource.to_string(),
            code: 200,
            data,
        };
        if self.tx.send(event).is_err() {
            warn!("Dropping event for {}: outbound channel closed", resource);
        }
    }
}

/// 400 reply for a line that is not a valid request.
fn rejection(err: &serde_json::Error) -> Message {
    Message {
        id: None,
        method: Method::Put,
        resource: String::new(),
        code: 400,
        data: json!({ "message": format!("Invalid message: {}", err) }),
    }
}

/// Queue `message` for the writer. Returns `false` if the channel is closed.
fn enqueue(tx: &UnboundedSender<Message>, message: Message) -> bool {
    if tx.send(message).is_err() {
        error!("Outbound channel closed, response lost");
        return false;
    }
    true
}

/// Read requests from stdin until EOF and dispatch them.
pub async fn serve<A, N>(
    reconciler: &mut Reconciler<A, N>,
    tx: UnboundedSender<Message>,
) -> std::io::Result<()>
where
    A: NetworkAdapter,
    N: Notifier,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request: {}", e);
                enqueue(&tx, rejection(&e));
                continue;
            }
        };

        debug!("{:?} {}", request.method, request.resource);
        let mut reply = |response: Response| {
            let message = Message {
                id: request.id.clone(),
                method: request.method,
                resource: request.resource.clone(),
                code: response.code,
                data: response.data,
            };
            enqueue(&tx, message);
        };
        handlers::dispatch(reconciler, &request, &mut reply);
    }

    Ok(())
}

/// Write outbound messages to stdout, one JSON document per line.
pub async fn write_outbound(mut rx: UnboundedReceiver<Message>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parsing() {
        let request: Request = serde_json::from_str(
            r#"{"id": 7, "method": "put", "resource": "/network/ethernets/1", "data": {"id": 1}}"#,
        )
        .unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.id, Some(json!(7)));
        assert!(request.data.is_some());

        let bare: Request =
            serde_json::from_str(r#"{"method": "get", "resource": "/network/ethernets"}"#).unwrap();
        assert!(bare.data.is_none());
    }

    #[test]
    fn test_channel_notifier_queues_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.publish("/network/interfaces/eth0", json!({"id": 1}));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.resource, "/network/interfaces/eth0");
        assert_eq!(event.method, Method::Put);
        assert_eq!(event.code, 200);
    }

    #[test]
    fn test_malformed_line_rejection() {
        let err = serde_json::from_str::<Request>("{not json").unwrap_err();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        assert!(enqueue(&tx, rejection(&err)));
        let message = rx.try_recv().unwrap();
        assert_eq!(message.code, 400);
        assert!(message.data["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid message:"));

        drop(rx);
        assert!(!enqueue(&tx, rejection(&err)));
    }

    #[test]
    fn test_message_serialization_skips_missing_id() {
        let message = Message {
            id: None,
            method: Method::Get,
            resource: "/network/ethernets".into(),
            code: 404,
            data: json!({"message": "No such device."}),
        };
        let text = serde_json::to_string(&message).unwrap();
        assert!(!text.contains("\"id\""));
        assert!(text.contains("\"method\":\"get\""));
    }
}
