//! Wire payloads for the hosted inference endpoints.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub inputs: String,
    pub parameters: GenerationParameters,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub inputs: String,
}

#[derive(Deserialize, Debug)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Account details returned by the token verification endpoint.
#[derive(Deserialize, Debug, Default)]
pub struct WhoAmI {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_serializes_inference_parameters() {
        let request = ChatRequest {
            inputs: "hi".to_string(),
            parameters: GenerationParameters {
                max_new_tokens: 100,
                temperature: 0.5,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"inputs": "hi", "parameters": {"max_new_tokens": 100, "temperature": 0.5}})
        );
    }

    #[test]
    fn whoami_tolerates_missing_fields() {
        let parsed: WhoAmI = serde_json::from_str(r#"{"type":"user"}"#).unwrap();
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.kind.as_deref(), Some("user"));
    }
}
