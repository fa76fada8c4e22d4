//! Vonage Voice API: call control client, application JWTs and the NCCO
//! returned from the answer webhook.

mod client;
mod jwt;
pub mod ncco;

pub use client::{VONAGE_API_URL, VonageClient};
pub use jwt::{ApplicationClaims, VonageCredentials};
