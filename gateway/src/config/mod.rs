//! Server configuration.
//!
//! Configuration comes from environment variables (a `.env` file is loaded in
//! `main.rs`) and, optionally, a YAML file whose values override them.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: environment variable loading
//! - `yaml`: YAML configuration file loading
//! - `merge`: applying YAML overrides on top of the environment
//! - `validation`: checks on the merged result
//!
//! # Example
//! ```rust,no_run
//! use callbridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//!
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::session::{DeliveryMode, SessionSettings};
use crate::core::tts::{VoiceGender, VoiceProfile};
use crate::errors::config_error::{ConfigError, ConfigResult};
use crate::utils::retry::CallPolicy;

pub(crate) mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 3000;
    pub const PUBLIC_SCHEME: &str = "https";
    pub const LANGUAGE_CODE: &str = "en-US";
    pub const SAMPLE_RATE: u32 = 16000;
    pub const FRAME_SIZE: usize = 640;
    pub const KEEP_ALIVE_SECONDS: u64 = 25;
    pub const AUDIO_DIR: &str = "audio";
    pub const AUDIO_FILE_NAME: &str = "reply.mp3";
    pub const VONAGE_API_URL: &str = "https://api.nexmo.com";
    pub const CALL_TIMEOUT_SECONDS: u64 = 10;
    pub const CALL_MAX_ATTEMPTS: u32 = 2;
    pub const CALL_BACKOFF_MS: u64 = 200;
}

/// Server configuration
///
/// Contains everything needed to run the bridge:
/// - Listener and public address settings
/// - Per-call audio and delivery settings
/// - Provider endpoints and credentials (Teneo, Deepgram, Google, Vonage)
/// - Deadline and retry settings for provider calls
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host name the telephony provider reaches us on. Falls back to the
    /// request's Host header for the answer webhook.
    pub public_host: Option<String>,
    /// Default: "https" (sockets use "wss")
    pub public_scheme: String,

    // Call settings
    pub language_code: String,
    pub voice_gender: VoiceGender,
    pub voice_name: Option<String>,
    pub delivery_mode: DeliveryMode,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub keep_alive_seconds: u64,
    pub audio_dir: PathBuf,
    /// Path the most recent reply file is also served under
    pub audio_file_name: String,

    // Providers
    pub teneo_engine_url: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: Option<String>,
    pub google_tts_api_key: Option<String>,
    pub vonage_application_id: Option<String>,
    pub vonage_private_key_path: Option<PathBuf>,
    pub vonage_api_url: String,

    // Resilience
    pub call_timeout_seconds: u64,
    pub call_max_attempts: u32,
    pub call_backoff_ms: u64,
}

/// Zeroize secret fields when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.google_tts_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    pub fn from_env() -> ConfigResult<Self> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    ///
    /// # Errors
    /// - The YAML file cannot be read or is malformed
    /// - An environment variable has an invalid format
    /// - Validation of the merged configuration fails
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn socket_scheme(&self) -> &'static str {
        if self.public_scheme == "https" { "wss" } else { "ws" }
    }

    /// Public base URL for files the provider fetches, e.g. `https://bot.example.com`.
    pub fn public_base_url(&self) -> String {
        match &self.public_host {
            Some(host) => format!("{}://{}", self.public_scheme, host),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// Call socket URI handed to the provider in the answer NCCO.
    ///
    /// `request_host` is used when no public host is configured.
    pub fn socket_url(&self, request_host: Option<&str>) -> String {
        let host = self
            .public_host
            .as_deref()
            .or(request_host)
            .map(str::to_string)
            .unwrap_or_else(|| format!("localhost:{}", self.port));
        format!("{}://{}/socket", self.socket_scheme(), host)
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.call_timeout_seconds),
            max_attempts: self.call_max_attempts,
            initial_backoff: Duration::from_millis(self.call_backoff_ms),
            ..CallPolicy::default()
        }
    }

    pub fn session_settings(&self) -> ConfigResult<SessionSettings> {
        let frame_size = NonZeroUsize::new(self.frame_size)
            .ok_or_else(|| ConfigError::invalid("FRAME_SIZE", "must be positive"))?;

        Ok(SessionSettings {
            language_code: self.language_code.clone(),
            voice: VoiceProfile {
                gender: self.voice_gender,
                name: self.voice_name.clone(),
            },
            delivery_mode: self.delivery_mode,
            sample_rate: self.sample_rate,
            frame_size,
            keep_alive_interval: Duration::from_secs(self.keep_alive_seconds),
            public_base_url: self.public_base_url(),
            call_policy: self.call_policy(),
        })
    }

    /// A credential or endpoint that must be present to build a provider.
    pub fn required<'a, T: ?Sized>(key: &str, value: Option<&'a T>) -> ConfigResult<&'a T> {
        value.ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ENV_KEYS: &[&str] = &[
        "HOST",
        "PORT",
        "PUBLIC_HOST",
        "PUBLIC_SCHEME",
        "LANGUAGE_CODE",
        "VOICE_GENDER",
        "VOICE_NAME",
        "DELIVERY_MODE",
        "SAMPLE_RATE",
        "FRAME_SIZE",
        "KEEP_ALIVE_SECONDS",
        "AUDIO_DIR",
        "AUDIO_FILE_NAME",
        "TENEO_ENGINE_URL",
        "DEEPGRAM_API_KEY",
        "DEEPGRAM_MODEL",
        "GOOGLE_TTS_API_KEY",
        "VONAGE_APPLICATION_ID",
        "VONAGE_PRIVATE_KEY_PATH",
        "VONAGE_API_URL",
        "CALL_TIMEOUT_SECONDS",
        "CALL_MAX_ATTEMPTS",
        "CALL_BACKOFF_MS",
    ];

    fn cleanup_env_vars() {
        unsafe {
            for key in ENV_KEYS {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.language_code, "en-US");
        assert_eq!(config.voice_gender, VoiceGender::Female);
        assert_eq!(config.delivery_mode, DeliveryMode::Stream);
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.frame_size, 640);
        assert_eq!(config.keep_alive_seconds, 25);
        assert_eq!(config.vonage_api_url, "https://api.nexmo.com");
        assert!(config.deepgram_api_key.is_none());

        let policy = config.call_policy();
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_backoff, Duration::from_millis(200));
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("PORT", "8080");
            std::env::set_var("DELIVERY_MODE", "google-audio-file");
            std::env::set_var("PUBLIC_HOST", "bot.example.com");
            std::env::set_var("VOICE_GENDER", "male");
            std::env::set_var("DEEPGRAM_API_KEY", "dg-key");
            std::env::set_var("CALL_MAX_ATTEMPTS", "3");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.delivery_mode, DeliveryMode::File);
        assert_eq!(config.voice_gender, VoiceGender::Male);
        assert_eq!(config.deepgram_api_key.as_deref(), Some("dg-key"));
        assert_eq!(config.call_max_attempts, 3);
        assert_eq!(config.public_base_url(), "https://bot.example.com");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("PORT", "not-a-port");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_file_mode_requires_public_host() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("DELIVERY_MODE", "file");
        }

        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::Missing(_))
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_frame_size_rejected() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("FRAME_SIZE", "641");
        }

        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  deepgram_api_key: "yaml-key"

resilience:
  timeout_seconds: 3
"#,
        )
        .unwrap();

        unsafe {
            std::env::set_var("HOST", "10.0.0.1");
            std::env::set_var("DEEPGRAM_API_KEY", "env-key");
            std::env::set_var("LANGUAGE_CODE", "nl-NL");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.deepgram_api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.language_code, "nl-NL");
        assert_eq!(config.call_timeout_seconds, 3);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = ServerConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    #[serial]
    fn test_socket_url() {
        cleanup_env_vars();

        let mut config = ServerConfig::from_env().unwrap();
        assert_eq!(
            config.socket_url(Some("abc.ngrok.io")),
            "wss://abc.ngrok.io/socket"
        );

        config.public_scheme = "http".to_string();
        config.public_host = Some("bot.local:3000".to_string());
        assert_eq!(
            config.socket_url(Some("ignored.example.com")),
            "ws://bot.local:3000/socket"
        );
    }

    #[test]
    #[serial]
    fn test_session_settings() {
        cleanup_env_vars();

        let mut config = ServerConfig::from_env().unwrap();
        config.public_host = Some("bot.example.com".to_string());
        config.voice_name = Some("en-US-Wavenet-F".to_string());

        let settings = config.session_settings().unwrap();
        assert_eq!(settings.frame_size.get(), 640);
        assert_eq!(settings.keep_alive_interval, Duration::from_secs(25));
        assert_eq!(settings.voice.name.as_deref(), Some("en-US-Wavenet-F"));
        assert_eq!(
            settings.audio_url("call-1.mp3"),
            "https://bot.example.com/audio/call-1.mp3"
        );
    }

    #[test]
    fn test_required() {
        let present = Some("value".to_string());
        assert_eq!(
            ServerConfig::required("KEY", present.as_deref()).unwrap(),
            "value"
        );
        assert!(matches!(
            ServerConfig::required::<str>("KEY", None),
            Err(ConfigError::Missing(_))
        ));
    }
}
