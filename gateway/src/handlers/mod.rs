//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `webhooks` - Telephony answer and event webhooks
//! - `socket` - Call audio WebSocket
//! - `audio` - Synthesized reply files fetched by the telephony provider

pub mod api;
pub mod audio;
pub mod socket;
pub mod webhooks;

pub use socket::call_socket_handler;
