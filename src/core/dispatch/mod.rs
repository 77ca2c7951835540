//! Request dispatcher for the three hosted capabilities.
//!
//! Every call follows the same recipe: refuse an empty credential, attach the
//! credential verbatim as `Authorization`, send one POST to the capability's
//! endpoint, then pull the single field the endpoint is known to return. All
//! failures come back as a [`DispatchError`]; nothing here panics or retries.

mod error;

pub use error::DispatchError;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use crate::api::{ChatRequest, GenerationParameters, ImageRequest, TranscriptionResponse, WhoAmI};
use crate::core::audio::AudioClip;
use crate::core::config::Config;
use crate::core::credential::Credential;
use crate::core::gate::CredentialVerifier;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Fully composed endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: String,
    pub image: String,
    pub transcription: String,
    pub verify: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Chat,
    TextToImage,
    Transcription,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Chat,
        Capability::TextToImage,
        Capability::Transcription,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Capability::Chat => "AI Chat-bot",
            Capability::TextToImage => "Text-to-Image",
            Capability::Transcription => "Audio-to-Text",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Chat => "chat",
            Capability::TextToImage => "text-to-image",
            Capability::Transcription => "transcription",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPayload {
    /// Already shaped by the caller's history mode.
    pub inputs: String,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityRequest {
    Chat(ChatPayload),
    TextToImage { prompt: String },
    Transcription { audio: Option<AudioClip> },
}

impl CapabilityRequest {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityRequest::Chat(_) => Capability::Chat,
            CapabilityRequest::TextToImage { .. } => Capability::TextToImage,
            CapabilityRequest::Transcription { .. } => Capability::Transcription,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Output {
    Text(String),
    Image(Vec<u8>),
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Output::Image(bytes) => write!(f, "Image({} bytes)", bytes.len()),
        }
    }
}

/// Stateless HTTP front for the capability endpoints. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Default client pointed at the configured endpoints.
    pub fn from_config(config: &Config) -> Self {
        Self::new(reqwest::Client::new(), config.endpoints())
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub async fn invoke(
        &self,
        request: CapabilityRequest,
        credential: &Credential,
    ) -> Result<Output, DispatchError> {
        let capability = request.capability();
        let result = match request {
            CapabilityRequest::Chat(payload) => {
                self.chat(&payload, credential).await.map(Output::Text)
            }
            CapabilityRequest::TextToImage { prompt } => {
                self.text_to_image(&prompt, credential).await.map(Output::Image)
            }
            CapabilityRequest::Transcription { audio } => {
                self.transcribe(audio.as_ref(), credential)
                    .await
                    .map(Output::Text)
            }
        };

        if let Err(err) = &result {
            warn!(%capability, kind = err.kind(), "capability call failed");
        }
        result
    }

    pub async fn chat(
        &self,
        payload: &ChatPayload,
        credential: &Credential,
    ) -> Result<String, DispatchError> {
        ensure_credential(credential)?;

        let request = ChatRequest {
            inputs: payload.inputs.clone(),
            parameters: payload.parameters.clone(),
        };
        let response = self
            .client
            .post(&self.endpoints.chat)
            .header(AUTHORIZATION, credential.header_value())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        extract_generated_text(&body)
    }

    pub async fn text_to_image(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<Vec<u8>, DispatchError> {
        ensure_credential(credential)?;

        let request = ImageRequest {
            inputs: prompt.to_string(),
        };
        let response = self
            .client
            .post(&self.endpoints.image)
            .header(AUTHORIZATION, credential.header_value())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(DispatchError::remote(status, &body));
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "image received");
        Ok(bytes.to_vec())
    }

    pub async fn transcribe(
        &self,
        audio: Option<&AudioClip>,
        credential: &Credential,
    ) -> Result<String, DispatchError> {
        let audio = audio.ok_or(DispatchError::NoInputProvided)?;
        ensure_credential(credential)?;

        let response = self
            .client
            .post(&self.endpoints.transcription)
            .header(AUTHORIZATION, credential.header_value())
            .header(CONTENT_TYPE, audio.content_type.as_str())
            .body(audio.bytes.clone())
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|err| {
            DispatchError::UnexpectedResponseShape(format!("expected an object with \"text\": {err}"))
        })?;
        Ok(parsed.text)
    }

    /// Asks the account endpoint whether the credential is accepted.
    pub async fn verify_credential(&self, credential: &Credential) -> Result<WhoAmI, DispatchError> {
        ensure_credential(credential)?;

        let response = self
            .client
            .get(&self.endpoints.verify)
            .header(AUTHORIZATION, credential.bearer_value())
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let account: WhoAmI = serde_json::from_str(&body).unwrap_or_else(|err| {
            debug!(error = %err, "account body unreadable; treating as unnamed");
            WhoAmI::default()
        });
        info!(
            account = account.name.as_deref().unwrap_or("<unknown>"),
            "credential verified"
        );
        Ok(account)
    }
}

#[async_trait]
impl CredentialVerifier for Dispatcher {
    async fn verify(&self, credential: &Credential) -> Result<(), DispatchError> {
        self.verify_credential(credential).await.map(|_| ())
    }
}

fn ensure_credential(credential: &Credential) -> Result<(), DispatchError> {
    if credential.is_empty() {
        Err(DispatchError::EmptyCredential)
    } else {
        Ok(())
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, DispatchError> {
    let status: StatusCode = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(DispatchError::remote(status, &body))
    }
}

/// Pulls `[0].generated_text` out of a text-generation response.
pub(crate) fn extract_generated_text(body: &str) -> Result<String, DispatchError> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        DispatchError::UnexpectedResponseShape(format!("response is not JSON: {err}"))
    })?;

    let first = value
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| {
            DispatchError::UnexpectedResponseShape(
                "expected a non-empty array of generations".to_string(),
            )
        })?;

    first
        .get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            DispatchError::UnexpectedResponseShape(
                "missing \"generated_text\" in first generation".to_string(),
            )
        })
}

#[cfg(test)]
mod tests;
