//! Teneo engine response body.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::dialogue::base::DialogueReply;

/// Output parameter the engine sets to `"true"` to end the call.
pub const END_CALL_PARAMETER: &str = "endCall";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeneoOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

/// `{"status":0,"output":{"text":..,"parameters":{..}},"sessionId":..}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeneoResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: TeneoOutput,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl TeneoResponse {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Accepts the exact string `"true"` and a JSON boolean.
    pub fn end_call(&self) -> bool {
        match self.output.parameters.get(END_CALL_PARAMETER) {
            Some(Value::String(flag)) => flag == "true",
            Some(Value::Bool(flag)) => *flag,
            _ => false,
        }
    }

    pub fn into_reply(self) -> DialogueReply {
        let end_call = self.end_call();
        DialogueReply {
            text: self.output.text,
            session_token: self.session_id.filter(|id| !id.is_empty()),
            end_call,
        }
    }
}
