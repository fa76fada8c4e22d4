//! Telephony provider integration.

pub mod base;
pub mod vonage;

pub use base::{TelephonyControl, TelephonyError, TelephonyResult};
pub use vonage::{VONAGE_API_URL, VonageClient, VonageCredentials};
