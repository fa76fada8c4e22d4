//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use super::defaults;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// Non-empty value of `key`, if set.
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse `key` if set, otherwise fall back to `default`.
pub(super) fn parse_env<T>(key: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> ConfigResult<ServerConfig> {
    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
        port: parse_env("PORT", defaults::PORT)?,
        public_host: env_var("PUBLIC_HOST"),
        public_scheme: env_var("PUBLIC_SCHEME")
            .unwrap_or_else(|| defaults::PUBLIC_SCHEME.to_string()),

        language_code: env_var("LANGUAGE_CODE")
            .unwrap_or_else(|| defaults::LANGUAGE_CODE.to_string()),
        voice_gender: parse_env("VOICE_GENDER", Default::default())?,
        voice_name: env_var("VOICE_NAME"),
        delivery_mode: parse_env("DELIVERY_MODE", Default::default())?,
        sample_rate: parse_env("SAMPLE_RATE", defaults::SAMPLE_RATE)?,
        frame_size: parse_env("FRAME_SIZE", defaults::FRAME_SIZE)?,
        keep_alive_seconds: parse_env("KEEP_ALIVE_SECONDS", defaults::KEEP_ALIVE_SECONDS)?,
        audio_dir: env_var("AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(defaults::AUDIO_DIR)),
        audio_file_name: env_var("AUDIO_FILE_NAME")
            .unwrap_or_else(|| defaults::AUDIO_FILE_NAME.to_string()),

        teneo_engine_url: env_var("TENEO_ENGINE_URL"),
        deepgram_api_key: env_var("DEEPGRAM_API_KEY"),
        deepgram_model: env_var("DEEPGRAM_MODEL"),
        google_tts_api_key: env_var("GOOGLE_TTS_API_KEY"),
        vonage_application_id: env_var("VONAGE_APPLICATION_ID"),
        vonage_private_key_path: env_var("VONAGE_PRIVATE_KEY_PATH").map(PathBuf::from),
        vonage_api_url: env_var("VONAGE_API_URL")
            .unwrap_or_else(|| defaults::VONAGE_API_URL.to_string()),

        call_timeout_seconds: parse_env("CALL_TIMEOUT_SECONDS", defaults::CALL_TIMEOUT_SECONDS)?,
        call_max_attempts: parse_env("CALL_MAX_ATTEMPTS", defaults::CALL_MAX_ATTEMPTS)?,
        call_backoff_ms: parse_env("CALL_BACKOFF_MS", defaults::CALL_BACKOFF_MS)?,
    })
}
