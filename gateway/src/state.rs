//! Shared application state.

use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::audio::AudioFileStore;
use crate::core::dialogue::TeneoClient;
use crate::core::session::{CallServices, SessionRegistry, SessionSettings};
use crate::core::stt::{DeepgramSTT, DeepgramSTTConfig};
use crate::core::telephony::{VonageClient, VonageCredentials};
use crate::core::tts::GoogleTTS;
use crate::errors::app_error::AppResult;

/// State shared by every handler and call session.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<SessionRegistry>,
    pub services: CallServices,
    pub session_settings: Arc<SessionSettings>,
}

impl AppState {
    /// Build the production providers from `config`.
    ///
    /// # Errors
    /// Fails when a provider credential is missing or unusable.
    pub fn new(config: ServerConfig) -> AppResult<Arc<Self>> {
        let services = build_services(&config)?;
        Self::with_services(config, services)
    }

    /// Use a caller-supplied provider set.
    pub fn with_services(config: ServerConfig, services: CallServices) -> AppResult<Arc<Self>> {
        let session_settings = Arc::new(config.session_settings()?);

        info!(
            delivery = %session_settings.delivery_mode,
            language = %session_settings.language_code,
            sample_rate = session_settings.sample_rate,
            "Application state initialised"
        );

        Ok(Arc::new(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            services,
            session_settings,
        }))
    }
}

fn build_services(config: &ServerConfig) -> AppResult<CallServices> {
    let mut deepgram = DeepgramSTTConfig::new(ServerConfig::required(
        "DEEPGRAM_API_KEY",
        config.deepgram_api_key.as_deref(),
    )?);
    if let Some(model) = &config.deepgram_model {
        deepgram.model = model.clone();
    }
    let recognizer = DeepgramSTT::new(deepgram)?;

    let synthesizer = GoogleTTS::new(ServerConfig::required(
        "GOOGLE_TTS_API_KEY",
        config.google_tts_api_key.as_deref(),
    )?)?;

    let dialogue = TeneoClient::new(ServerConfig::required(
        "TENEO_ENGINE_URL",
        config.teneo_engine_url.as_deref(),
    )?)?;

    let credentials = VonageCredentials::from_key_file(
        ServerConfig::required(
            "VONAGE_APPLICATION_ID",
            config.vonage_application_id.as_deref(),
        )?,
        ServerConfig::required(
            "VONAGE_PRIVATE_KEY_PATH",
            config.vonage_private_key_path.as_deref(),
        )?,
    )?;
    let telephony = VonageClient::new(credentials, &config.vonage_api_url)?;

    Ok(CallServices {
        recognizer: Arc::new(recognizer),
        synthesizer: Arc::new(synthesizer),
        dialogue: Arc::new(dialogue),
        telephony: Arc::new(telephony),
        audio_store: Arc::new(AudioFileStore::new(config.audio_dir.clone())),
    })
}
