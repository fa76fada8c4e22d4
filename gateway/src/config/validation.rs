//! Checks applied after loading and merging.
//!
//! Provider credentials are not required here; they are checked when the
//! providers are built so a partial config can still be loaded and inspected.

use super::ServerConfig;
use crate::core::audio::SUPPORTED_SAMPLE_RATES;
use crate::core::session::DeliveryMode;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// Top-level route segments the latest-audio route must not shadow.
const RESERVED_PATHS: &[&str] = &["audio", "socket", "webhooks"];

pub(super) fn validate(config: &ServerConfig) -> ConfigResult<()> {
    validate_public_scheme(&config.public_scheme)?;
    validate_audio(config)?;
    validate_resilience(config)?;

    if config.delivery_mode == DeliveryMode::File && config.public_host.is_none() {
        return Err(ConfigError::Missing(
            "PUBLIC_HOST is required when DELIVERY_MODE is file".to_string(),
        ));
    }

    if let Some(url) = &config.teneo_engine_url {
        url::Url::parse(url)
            .map_err(|e| ConfigError::invalid("TENEO_ENGINE_URL", e.to_string()))?;
    }
    url::Url::parse(&config.vonage_api_url)
        .map_err(|e| ConfigError::invalid("VONAGE_API_URL", e.to_string()))?;

    Ok(())
}

fn validate_public_scheme(scheme: &str) -> ConfigResult<()> {
    match scheme {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::invalid(
            "PUBLIC_SCHEME",
            format!("'{other}' (expected http or https)"),
        )),
    }
}

fn validate_audio(config: &ServerConfig) -> ConfigResult<()> {
    if !SUPPORTED_SAMPLE_RATES.contains(&config.sample_rate) {
        return Err(ConfigError::invalid(
            "SAMPLE_RATE",
            format!(
                "{} is outside {}..={}",
                config.sample_rate,
                SUPPORTED_SAMPLE_RATES.start(),
                SUPPORTED_SAMPLE_RATES.end()
            ),
        ));
    }
    // 16-bit samples: a frame must hold whole samples.
    if config.frame_size == 0 || config.frame_size % 2 != 0 {
        return Err(ConfigError::invalid(
            "FRAME_SIZE",
            format!("{} must be a positive even number of bytes", config.frame_size),
        ));
    }
    if config.keep_alive_seconds == 0 {
        return Err(ConfigError::invalid("KEEP_ALIVE_SECONDS", "must be positive"));
    }

    let name = &config.audio_file_name;
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if name.is_empty() || !plain || name.starts_with('.') {
        return Err(ConfigError::invalid(
            "AUDIO_FILE_NAME",
            format!("'{name}' must be a plain file name"),
        ));
    }
    if RESERVED_PATHS.contains(&name.as_str()) {
        return Err(ConfigError::invalid(
            "AUDIO_FILE_NAME",
            format!("'{name}' collides with a built-in route"),
        ));
    }
    Ok(())
}

fn validate_resilience(config: &ServerConfig) -> ConfigResult<()> {
    if config.call_timeout_seconds == 0 {
        return Err(ConfigError::invalid("CALL_TIMEOUT_SECONDS", "must be positive"));
    }
    if config.call_max_attempts == 0 {
        return Err(ConfigError::invalid("CALL_MAX_ATTEMPTS", "must be at least 1"));
    }
    Ok(())
}
