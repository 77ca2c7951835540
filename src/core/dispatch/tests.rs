use super::*;
use serde_json::json;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/models/microsoft/Orca-2-13b";
const IMAGE_PATH: &str = "/models/stabilityai/stable-diffusion-xl-base-1.0";
const TRANSCRIBE_PATH: &str = "/models/openai/whisper-large-v2";
const VERIFY_PATH: &str = "/api/whoami-v2";

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client")
}

fn dispatcher_for(base: &str) -> Dispatcher {
    Dispatcher::new(
        test_client(),
        Endpoints {
            chat: format!("{base}{CHAT_PATH}"),
            image: format!("{base}{IMAGE_PATH}"),
            transcription: format!("{base}{TRANSCRIBE_PATH}"),
            verify: format!("{base}{VERIFY_PATH}"),
        },
    )
}

fn chat_payload(inputs: &str) -> ChatPayload {
    ChatPayload {
        inputs: inputs.to_string(),
        parameters: GenerationParameters {
            max_new_tokens: 100,
            temperature: 0.7,
        },
    }
}

fn token() -> Credential {
    Credential::new("hf_test_token")
}

/// Base URL of a port that was just released, so connects are refused.
fn refused_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn chat_returns_generated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "hf_test_token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "inputs": "hi there",
            "parameters": {"max_new_tokens": 100, "temperature": 0.7}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"generated_text": "hello"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server.uri());
    let reply = dispatcher.chat(&chat_payload("hi there"), &token()).await;

    assert_eq!(reply, Ok("hello".to_string()));
}

#[tokio::test]
async fn invoke_routes_chat_to_text_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"generated_text": "hello"},
            {"generated_text": "ignored"}
        ])))
        .mount(&server)
        .await;

    let output = dispatcher_for(&server.uri())
        .invoke(CapabilityRequest::Chat(chat_payload("hi")), &token())
        .await;

    assert_eq!(output, Ok(Output::Text("hello".to_string())));
}

#[tokio::test]
async fn chat_without_generated_text_is_a_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"text": "hello"}])))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server.uri())
        .chat(&chat_payload("hi"), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::UnexpectedResponseShape(_)));
    assert!(err.to_string().starts_with("Error: "));
}

#[tokio::test]
async fn chat_with_empty_array_is_a_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server.uri())
        .chat(&chat_payload("hi"), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::UnexpectedResponseShape(_)));
}

#[tokio::test]
async fn remote_errors_carry_status_and_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Model microsoft/Orca-2-13b is currently loading",
            "estimated_time": 20.0
        })))
        .mount(&server)
        .await;

    let err = dispatcher_for(&server.uri())
        .chat(&chat_payload("hi"), &token())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DispatchError::Remote {
            status: 503,
            message: "Model microsoft/Orca-2-13b is currently loading".to_string()
        }
    );
}

#[tokio::test]
async fn image_bytes_pass_through_unmodified() {
    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 3];
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(header("authorization", "hf_test_token"))
        .and(body_json(json!({"inputs": "a red fox"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let output = dispatcher_for(&server.uri())
        .invoke(
            CapabilityRequest::TextToImage {
                prompt: "a red fox".to_string(),
            },
            &token(),
        )
        .await;

    assert_eq!(output, Ok(Output::Image(png)));
}

#[tokio::test]
async fn image_error_body_is_not_returned_as_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Authorization header is invalid"})),
        )
        .mount(&server)
        .await;

    let err = dispatcher_for(&server.uri())
        .text_to_image("fox", &token())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error: API request failed with status 400: Authorization header is invalid"
    );
}

#[tokio::test]
async fn transcription_without_audio_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "unused"})))
        .expect(0)
        .mount(&server)
        .await;

    let output = dispatcher_for(&server.uri())
        .invoke(CapabilityRequest::Transcription { audio: None }, &token())
        .await;

    let err = output.unwrap_err();
    assert_eq!(err, DispatchError::NoInputProvided);
    assert_eq!(err.to_string(), "No audio file provided");
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn transcription_posts_raw_audio_with_its_mime_type() {
    let audio = AudioClip::new(b"RIFF....WAVEfmt ".to_vec(), "audio/wav");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIBE_PATH))
        .and(header("authorization", "hf_test_token"))
        .and(header("content-type", "audio/wav"))
        .and(body_bytes(audio.bytes.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " hello world"})))
        .expect(1)
        .mount(&server)
        .await;

    let text = dispatcher_for(&server.uri())
        .transcribe(Some(&audio), &token())
        .await;

    assert_eq!(text, Ok(" hello world".to_string()));
}

#[tokio::test]
async fn transcription_without_text_field_is_a_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIBE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chunks": []})))
        .mount(&server)
        .await;

    let audio = AudioClip::new(vec![1, 2, 3], "audio/flac");
    let err = dispatcher_for(&server.uri())
        .transcribe(Some(&audio), &token())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::UnexpectedResponseShape(_)));
}

#[tokio::test]
async fn empty_credential_is_refused_before_any_request() {
    let server = MockServer::start().await;
    let dispatcher = dispatcher_for(&server.uri());
    let empty = Credential::default();

    assert_eq!(
        dispatcher.chat(&chat_payload("hi"), &empty).await,
        Err(DispatchError::EmptyCredential)
    );
    assert_eq!(
        dispatcher.text_to_image("fox", &empty).await,
        Err(DispatchError::EmptyCredential)
    );
    let audio = AudioClip::new(vec![0], "audio/wav");
    assert_eq!(
        dispatcher.transcribe(Some(&audio), &empty).await,
        Err(DispatchError::EmptyCredential)
    );
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn connection_refused_is_reported_for_every_capability() {
    let dispatcher = dispatcher_for(&refused_base());
    let requests = [
        CapabilityRequest::Chat(chat_payload("hi")),
        CapabilityRequest::TextToImage {
            prompt: "fox".to_string(),
        },
        CapabilityRequest::Transcription {
            audio: Some(AudioClip::new(vec![0, 1], "audio/wav")),
        },
    ];

    for request in requests {
        let capability = request.capability();
        let err = dispatcher.invoke(request, &token()).await.unwrap_err();
        assert!(
            matches!(err, DispatchError::Transport(_)),
            "{capability}: {err:?}"
        );
        assert!(err.to_string().starts_with("Error: "), "{capability}: {err}");
    }
}

/// Serves one response whose body stops short of its declared length.
async fn truncated_error_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.ends_with(b"}") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket
            .write_all(
                b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nContent-Length: 100\r\n\r\nModel is lo",
            )
            .await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn unreadable_image_error_body_is_a_transport_failure() {
    let base = truncated_error_server().await;
    let err = dispatcher_for(&base)
        .text_to_image("fox", &token())
        .await
        .unwrap_err();

    assert!(!matches!(err, DispatchError::Remote { .. }), "{err:?}");
    assert!(err.to_string().starts_with("Error: "), "{err}");
}

#[tokio::test]
async fn malformed_account_body_still_verifies_without_a_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let account = dispatcher_for(&server.uri())
        .verify_credential(&token())
        .await
        .expect("verified");
    assert_eq!(account.name, None);
}

#[tokio::test]
async fn verification_uses_bearer_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .and(header("authorization", "Bearer hf_test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ada", "type": "user"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials in Authorization header"})))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server.uri());
    let account = dispatcher.verify_credential(&token()).await.expect("verified");
    assert_eq!(account.name.as_deref(), Some("ada"));

    let err = dispatcher
        .verify(&Credential::new("hf_wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Remote { status: 401, .. }));
}

#[test]
fn extract_generated_text_rejects_non_json() {
    let err = extract_generated_text("<html>oops</html>").unwrap_err();
    assert!(matches!(err, DispatchError::UnexpectedResponseShape(_)));
}
