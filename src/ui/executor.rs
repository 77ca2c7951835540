//! Runs [`AppCommand`]s on background tasks and reports back as actions.
//!
//! One task per command. Nothing is cancelled; a result for a tab that was
//! cleared in the meantime is discarded by the reducer.

use std::path::PathBuf;

use tracing::debug;

use crate::core::audio::AudioClip;
use crate::core::dispatch::{CapabilityRequest, DispatchError, Dispatcher, Output};
use crate::core::gate::CredentialVerifier;
use crate::core::image::{save_image, ImageDestination, ImageFormat};
use crate::ui::actions::{AppAction, AppActionDispatcher, AppCommand};
use crate::ui::state::SavedImage;

#[derive(Clone)]
pub struct CommandExecutor {
    dispatcher: Dispatcher,
    image_dir: PathBuf,
    actions: AppActionDispatcher,
}

impl CommandExecutor {
    pub fn new(dispatcher: Dispatcher, image_dir: PathBuf, actions: AppActionDispatcher) -> Self {
        Self {
            dispatcher,
            image_dir,
            actions,
        }
    }

    pub fn spawn(&self, command: AppCommand) -> tokio::task::JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move {
            let action = executor.run(command).await;
            executor.actions.dispatch(action);
        })
    }

    pub async fn run(&self, command: AppCommand) -> AppAction {
        match command {
            AppCommand::VerifyCredential(credential) => AppAction::VerificationFinished {
                outcome: self.dispatcher.verify(&credential).await,
            },
            AppCommand::SendChat {
                epoch,
                request_id,
                payload,
                credential,
            } => {
                debug!(request_id, "sending chat message");
                let result = self
                    .dispatcher
                    .invoke(CapabilityRequest::Chat(payload), &credential)
                    .await
                    .and_then(expect_text);
                AppAction::ChatReplied {
                    epoch,
                    request_id,
                    result,
                }
            }
            AppCommand::GenerateImage {
                epoch,
                prompt,
                credential,
            } => {
                let result = match self
                    .dispatcher
                    .invoke(CapabilityRequest::TextToImage { prompt }, &credential)
                    .await
                {
                    Ok(Output::Image(bytes)) => self.store_image(bytes).await,
                    Ok(Output::Text(_)) => Err(unexpected_output("image", "text")),
                    Err(err) => Err(err),
                };
                AppAction::ImageFinished { epoch, result }
            }
            AppCommand::Transcribe {
                epoch,
                audio_path,
                credential,
            } => {
                let result = match AudioClip::from_user_path(&audio_path).await {
                    Ok(audio) => self
                        .dispatcher
                        .invoke(CapabilityRequest::Transcription { audio }, &credential)
                        .await
                        .and_then(expect_text),
                    Err(err) => Err(err),
                };
                AppAction::TranscriptionFinished { epoch, result }
            }
        }
    }

    async fn store_image(&self, bytes: Vec<u8>) -> Result<SavedImage, DispatchError> {
        let destination = ImageDestination::Directory(self.image_dir.clone());
        let saved = tokio::task::spawn_blocking(move || {
            let format = ImageFormat::sniff(&bytes);
            save_image(&bytes, &destination).map(|path| SavedImage {
                path,
                bytes: bytes.len(),
                format,
            })
        })
        .await
        .map_err(|err| DispatchError::Io(format!("image writer stopped: {err}")))?;
        saved.map_err(|err| DispatchError::Io(format!("could not save image: {err}")))
    }
}

fn expect_text(output: Output) -> Result<String, DispatchError> {
    match output {
        Output::Text(text) => Ok(text),
        Output::Image(_) => Err(unexpected_output("text", "image")),
    }
}

fn unexpected_output(expected: &str, got: &str) -> DispatchError {
    DispatchError::UnexpectedResponseShape(format!("expected {expected} output, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GenerationParameters;
    use crate::core::credential::Credential;
    use crate::core::dispatch::{ChatPayload, Endpoints};
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor_for(server_uri: &str, image_dir: PathBuf) -> (CommandExecutor, mpsc::UnboundedReceiver<AppAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            reqwest::Client::builder().no_proxy().build().unwrap(),
            Endpoints {
                chat: format!("{server_uri}/chat"),
                image: format!("{server_uri}/image"),
                transcription: format!("{server_uri}/asr"),
                verify: format!("{server_uri}/whoami"),
            },
        );
        (
            CommandExecutor::new(dispatcher, image_dir, AppActionDispatcher::new(tx)),
            rx,
        )
    }

    #[tokio::test]
    async fn chat_reply_comes_back_tagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "hello"}])))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let (executor, mut rx) = executor_for(&server.uri(), dir.path().to_path_buf());

        executor
            .spawn(AppCommand::SendChat {
                epoch: 3,
                request_id: 7,
                payload: ChatPayload {
                    inputs: "hi".into(),
                    parameters: GenerationParameters {
                        max_new_tokens: 100,
                        temperature: 0.7,
                    },
                },
                credential: Credential::new("hf_t"),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(AppAction::ChatReplied {
                epoch,
                request_id,
                result,
            }) => {
                assert_eq!((epoch, request_id), (3, 7));
                assert_eq!(result, Ok("hello".to_string()));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[tokio::test]
    async fn generated_image_is_written_to_disk() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2];
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let (executor, _rx) = executor_for(&server.uri(), dir.path().join("out"));

        let action = executor
            .run(AppCommand::GenerateImage {
                epoch: 0,
                prompt: "fox".into(),
                credential: Credential::new("hf_t"),
            })
            .await;

        match action {
            AppAction::ImageFinished {
                result: Ok(saved), ..
            } => {
                assert_eq!(saved.format, ImageFormat::Png);
                assert_eq!(saved.bytes, png.len());
                assert_eq!(std::fs::read(&saved.path).unwrap(), png);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_audio_path_reports_missing_input_without_a_request() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let (executor, _rx) = executor_for(&server.uri(), dir.path().to_path_buf());

        let action = executor
            .run(AppCommand::Transcribe {
                epoch: 0,
                audio_path: "  ".into(),
                credential: Credential::new("hf_t"),
            })
            .await;

        match action {
            AppAction::TranscriptionFinished { result, .. } => {
                assert_eq!(result, Err(DispatchError::NoInputProvided));
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn unreadable_audio_file_is_an_error_message() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.wav");
        let (executor, _rx) = executor_for(&server.uri(), dir.path().to_path_buf());

        let action = executor
            .run(AppCommand::Transcribe {
                epoch: 0,
                audio_path: missing.display().to_string(),
                credential: Credential::new("hf_t"),
            })
            .await;

        match action {
            AppAction::TranscriptionFinished {
                result: Err(err), ..
            } => assert!(err.to_string().starts_with("Error: "), "{err}"),
            other => panic!("unexpected action {other:?}"),
        }
    }
}
