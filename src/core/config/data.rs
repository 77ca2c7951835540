use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::GenerationParameters;
use crate::core::chat::HistoryMode;
use crate::core::config::io::ConfigError;
use crate::core::dispatch::Endpoints;
use crate::core::gate::GatePolicy;
use crate::utils::url::{construct_api_url, is_http_url, normalize_base_url};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_CHAT_MODEL: &str = "microsoft/Orca-2-13b";
pub const DEFAULT_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "openai/whisper-large-v2";
pub const DEFAULT_VERIFY_URL: &str = "https://huggingface.co/api/whoami-v2";
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub transcription_model: String,
    pub verify_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            verify_url: DEFAULT_VERIFY_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    pub policy: GatePolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub history: HistoryMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            history: HistoryMode::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// Where generated images are written; defaults to the data directory
    pub output_dir: Option<PathBuf>,
}

/// User settings. The credential is deliberately not part of it.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub gate: GateConfig,
    pub chat: ChatConfig,
    pub image: ImageConfig,
}

/// Settable keys, in display order.
pub const CONFIG_KEYS: &[&str] = &[
    "api.base-url",
    "api.chat-model",
    "api.image-model",
    "api.transcription-model",
    "api.verify-url",
    "gate.policy",
    "chat.max-new-tokens",
    "chat.temperature",
    "chat.history",
    "image.output-dir",
];

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('_', "-")
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            chat: construct_api_url(&self.api.base_url, &self.api.chat_model),
            image: construct_api_url(&self.api.base_url, &self.api.image_model),
            transcription: construct_api_url(&self.api.base_url, &self.api.transcription_model),
            verify: self.api.verify_url.clone(),
        }
    }

    pub fn generation_parameters(&self) -> GenerationParameters {
        GenerationParameters {
            max_new_tokens: self.chat.max_new_tokens,
            temperature: self.chat.temperature,
        }
    }

    pub fn image_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.image.output_dir {
            return dir.clone();
        }
        super::io::project_dirs()
            .map(|dirs| dirs.data_dir().join("images"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn get_value(&self, key: &str) -> Result<String, ConfigError> {
        let normalized = normalize_key(key);
        let value = match normalized.as_str() {
            "api.base-url" => self.api.base_url.clone(),
            "api.chat-model" => self.api.chat_model.clone(),
            "api.image-model" => self.api.image_model.clone(),
            "api.transcription-model" => self.api.transcription_model.clone(),
            "api.verify-url" => self.api.verify_url.clone(),
            "gate.policy" => self.gate.policy.to_string(),
            "chat.max-new-tokens" => self.chat.max_new_tokens.to_string(),
            "chat.temperature" => self.chat.temperature.to_string(),
            "chat.history" => self.chat.history.to_string(),
            "image.output-dir" => path_display(self.image_output_dir()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let normalized = normalize_key(key);
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid(&normalized, "value cannot be empty"));
        }

        match normalized.as_str() {
            "api.base-url" => {
                if !is_http_url(value) {
                    return Err(invalid(&normalized, "expected an http(s) URL"));
                }
                self.api.base_url = normalize_base_url(value);
            }
            "api.chat-model" => self.api.chat_model = value.to_string(),
            "api.image-model" => self.api.image_model = value.to_string(),
            "api.transcription-model" => self.api.transcription_model = value.to_string(),
            "api.verify-url" => {
                if !is_http_url(value) {
                    return Err(invalid(&normalized, "expected an http(s) URL"));
                }
                self.api.verify_url = value.to_string();
            }
            "gate.policy" => {
                self.gate.policy = value
                    .parse()
                    .map_err(|message: String| invalid(&normalized, message))?;
            }
            "chat.max-new-tokens" => {
                let tokens: u32 = value
                    .parse()
                    .map_err(|_| invalid(&normalized, "expected a positive integer"))?;
                if tokens == 0 {
                    return Err(invalid(&normalized, "expected a positive integer"));
                }
                self.chat.max_new_tokens = tokens;
            }
            "chat.temperature" => {
                let temperature: f64 = value
                    .parse()
                    .map_err(|_| invalid(&normalized, "expected a number"))?;
                if !temperature.is_finite() || temperature < 0.0 {
                    return Err(invalid(&normalized, "expected a non-negative number"));
                }
                self.chat.temperature = temperature;
            }
            "chat.history" => {
                self.chat.history = value
                    .parse()
                    .map_err(|message: String| invalid(&normalized, message))?;
            }
            "image.output-dir" => self.image.output_dir = Some(PathBuf::from(value)),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Restores the default for `key`.
    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigError> {
        let normalized = normalize_key(key);
        let defaults = Config::default();
        match normalized.as_str() {
            "api.base-url" => self.api.base_url = defaults.api.base_url,
            "api.chat-model" => self.api.chat_model = defaults.api.chat_model,
            "api.image-model" => self.api.image_model = defaults.api.image_model,
            "api.transcription-model" => {
                self.api.transcription_model = defaults.api.transcription_model
            }
            "api.verify-url" => self.api.verify_url = defaults.api.verify_url,
            "gate.policy" => self.gate.policy = defaults.gate.policy,
            "chat.max-new-tokens" => self.chat.max_new_tokens = defaults.chat.max_new_tokens,
            "chat.temperature" => self.chat.temperature = defaults.chat.temperature,
            "chat.history" => self.chat.history = defaults.chat.history,
            "image.output-dir" => self.image.output_dir = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
