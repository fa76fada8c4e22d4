//! Application-signed JWTs for the Voice API.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::core::telephony::base::{TelephonyError, TelephonyResult};

/// Token lifetime. Tokens are minted per request, so this only needs to
/// cover one round trip plus clock skew.
const TOKEN_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationClaims {
    pub application_id: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Application id plus the RSA key it signs with.
#[derive(Clone)]
pub struct VonageCredentials {
    application_id: String,
    key: EncodingKey,
}

impl std::fmt::Debug for VonageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VonageCredentials")
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

impl VonageCredentials {
    pub fn from_pem(application_id: impl Into<String>, pem: &[u8]) -> TelephonyResult<Self> {
        let application_id = application_id.into();
        if application_id.trim().is_empty() {
            return Err(TelephonyError::InvalidConfiguration(
                "Vonage application id is required".to_string(),
            ));
        }
        let key = EncodingKey::from_rsa_pem(pem).map_err(|e| {
            TelephonyError::InvalidConfiguration(format!("Invalid Vonage private key: {e}"))
        })?;
        Ok(Self {
            application_id,
            key,
        })
    }

    pub fn from_key_file(
        application_id: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> TelephonyResult<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            TelephonyError::InvalidConfiguration(format!(
                "Failed to read Vonage private key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_pem(application_id, &pem)
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn claims_at(&self, issued_at: u64) -> ApplicationClaims {
        ApplicationClaims {
            application_id: self.application_id.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Mint a fresh RS256 bearer token.
    pub fn token(&self) -> TelephonyResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        encode(&Header::new(Algorithm::RS256), &self.claims_at(now), &self.key)
            .map_err(|e| TelephonyError::AuthenticationFailed(format!("JWT signing failed: {e}")))
    }
}
