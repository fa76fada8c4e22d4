//! Teneo Interaction Engine client (`viewtype=tieapi`).

mod client;
mod messages;

pub use client::TeneoClient;
pub use messages::TeneoResponse;
