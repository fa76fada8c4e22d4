//! Environment first, YAML on top.

use super::ServerConfig;
use super::env::load_from_env;
use super::yaml::YamlConfig;
use crate::errors::config_error::ConfigResult;

pub(super) fn merge_config(yaml: Option<YamlConfig>) -> ConfigResult<ServerConfig> {
    let mut config = load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_host.is_some() {
            config.public_host = server.public_host;
        }
        if let Some(scheme) = server.public_scheme {
            config.public_scheme = scheme;
        }
    }

    if let Some(call) = yaml.call {
        if let Some(mode) = call.parsed_delivery_mode()? {
            config.delivery_mode = mode;
        }
        if let Some(language_code) = call.language_code {
            config.language_code = language_code;
        }
        if let Some(gender) = call.voice_gender {
            config.voice_gender = gender;
        }
        if call.voice_name.is_some() {
            config.voice_name = call.voice_name;
        }
        if let Some(sample_rate) = call.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(frame_size) = call.frame_size {
            config.frame_size = frame_size;
        }
        if let Some(seconds) = call.keep_alive_seconds {
            config.keep_alive_seconds = seconds;
        }
        if let Some(dir) = call.audio_dir {
            config.audio_dir = dir;
        }
        if let Some(name) = call.audio_file_name {
            config.audio_file_name = name;
        }
    }

    if let Some(providers) = yaml.providers {
        if providers.teneo_engine_url.is_some() {
            config.teneo_engine_url = providers.teneo_engine_url;
        }
        if providers.deepgram_api_key.is_some() {
            config.deepgram_api_key = providers.deepgram_api_key;
        }
        if providers.deepgram_model.is_some() {
            config.deepgram_model = providers.deepgram_model;
        }
        if providers.google_tts_api_key.is_some() {
            config.google_tts_api_key = providers.google_tts_api_key;
        }
        if providers.vonage_application_id.is_some() {
            config.vonage_application_id = providers.vonage_application_id;
        }
        if providers.vonage_private_key_path.is_some() {
            config.vonage_private_key_path = providers.vonage_private_key_path;
        }
        if let Some(url) = providers.vonage_api_url {
            config.vonage_api_url = url;
        }
    }

    if let Some(resilience) = yaml.resilience {
        if let Some(seconds) = resilience.timeout_seconds {
            config.call_timeout_seconds = seconds;
        }
        if let Some(attempts) = resilience.max_attempts {
            config.call_max_attempts = attempts;
        }
        if let Some(ms) = resilience.backoff_ms {
            config.call_backoff_ms = ms;
        }
    }

    Ok(config)
}
