//! Call control objects returned from the answer webhook.
//!
//! The only flow needed is a single `connect` action that bridges the call
//! audio to our WebSocket endpoint. The endpoint headers are echoed back as
//! the first text message on that socket, which is how a connection learns
//! which call it belongs to.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EndpointHeaders {
    pub language: String,
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebSocketEndpoint {
    #[serde(rename = "type")]
    pub endpoint_type: &'static str,
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub uri: String,
    pub headers: EndpointHeaders,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum NccoAction {
    Connect {
        #[serde(rename = "bargeIn")]
        barge_in: bool,
        endpoint: Vec<WebSocketEndpoint>,
    },
}

/// `audio/l16;rate=<sample_rate>`
pub fn linear16_content_type(sample_rate: u32) -> String {
    format!("audio/l16;rate={sample_rate}")
}

/// NCCO that connects call `call_id` to the WebSocket at `socket_uri`.
pub fn connect_websocket(
    socket_uri: &str,
    sample_rate: u32,
    language: &str,
    call_id: &str,
) -> Vec<NccoAction> {
    vec![NccoAction::Connect {
        barge_in: true,
        endpoint: vec![WebSocketEndpoint {
            endpoint_type: "websocket",
            content_type: linear16_content_type(sample_rate),
            uri: socket_uri.to_string(),
            headers: EndpointHeaders {
                language: language.to_string(),
                uuid: call_id.to_string(),
            },
        }],
    }]
}
