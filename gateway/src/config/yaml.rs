use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::session::DeliveryMode;
use crate::core::tts::VoiceGender;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// Complete YAML configuration structure
///
/// All fields are optional; anything set here overrides the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_host: "bot.example.com"
///   public_scheme: "https"
///
/// call:
///   language_code: "en-US"
///   voice_gender: "female"
///   delivery_mode: "stream"
///   sample_rate: 16000
///   frame_size: 640
///   keep_alive_seconds: 25
///   audio_dir: "/var/lib/callbridge/audio"
///   audio_file_name: "reply.mp3"
///
/// providers:
///   teneo_engine_url: "https://engine.example.com/my-bot/"
///   deepgram_api_key: "your-deepgram-key"
///   deepgram_model: "nova-2-phonecall"
///   google_tts_api_key: "your-google-key"
///   vonage_application_id: "aaaaaaaa-bbbb-cccc-dddd-0123456789ab"
///   vonage_private_key_path: "/etc/callbridge/private.key"
///
/// resilience:
///   timeout_seconds: 10
///   max_attempts: 2
///   backoff_ms: 200
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub call: Option<CallYaml>,
    pub providers: Option<ProvidersYaml>,
    pub resilience: Option<ResilienceYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub public_scheme: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub language_code: Option<String>,
    pub voice_gender: Option<VoiceGender>,
    pub voice_name: Option<String>,
    /// `stream` or `file`
    pub delivery_mode: Option<String>,
    pub sample_rate: Option<u32>,
    pub frame_size: Option<usize>,
    pub keep_alive_seconds: Option<u64>,
    pub audio_dir: Option<PathBuf>,
    pub audio_file_name: Option<String>,
}

impl CallYaml {
    pub fn parsed_delivery_mode(&self) -> ConfigResult<Option<DeliveryMode>> {
        self.delivery_mode
            .as_deref()
            .map(|raw| {
                raw.parse()
                    .map_err(|e: String| ConfigError::invalid("call.delivery_mode", e))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub teneo_engine_url: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: Option<String>,
    pub google_tts_api_key: Option<String>,
    pub vonage_application_id: Option<String>,
    pub vonage_private_key_path: Option<PathBuf>,
    pub vonage_api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ResilienceYaml {
    pub timeout_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

impl YamlConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> ConfigResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_host: "bot.example.com"

call:
  language_code: "nl-NL"
  voice_gender: "male"
  delivery_mode: "google-audio-file"
  sample_rate: 8000
  frame_size: 320

providers:
  teneo_engine_url: "https://engine.example.com/bot/"
  deepgram_api_key: "dg-key"
  vonage_private_key_path: "/etc/keys/private.key"

resilience:
  timeout_seconds: 5
  max_attempts: 3
"#;
        let config = YamlConfig::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.public_host.as_deref(), Some("bot.example.com"));

        let call = config.call.unwrap();
        assert_eq!(call.voice_gender, Some(VoiceGender::Male));
        assert_eq!(call.parsed_delivery_mode().unwrap(), Some(DeliveryMode::File));
        assert_eq!(call.sample_rate, Some(8000));
        assert_eq!(call.frame_size, Some(320));

        let providers = config.providers.unwrap();
        assert_eq!(providers.deepgram_api_key.as_deref(), Some("dg-key"));
        assert_eq!(
            providers.vonage_private_key_path,
            Some(PathBuf::from("/etc/keys/private.key"))
        );

        let resilience = config.resilience.unwrap();
        assert_eq!(resilience.timeout_seconds, Some(5));
        assert_eq!(resilience.max_attempts, Some(3));
        assert_eq!(resilience.backoff_ms, None);
    }

    #[test]
    fn test_yaml_config_empty() {
        let config = YamlConfig::from_str("").unwrap();
        assert!(config.server.is_none());
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_invalid_delivery_mode() {
        let config = YamlConfig::from_str("call:\n  delivery_mode: \"fax\"\n").unwrap();
        assert!(config.call.unwrap().parsed_delivery_mode().is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: 4000\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(4000));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = YamlConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server: [unclosed").unwrap();

        let result = YamlConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
