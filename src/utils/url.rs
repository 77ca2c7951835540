//! URL helpers for composing model endpoints.

/// Strip trailing slashes so endpoint joins never produce `//`.
///
/// ```
/// use hfdeck::utils::url::normalize_base_url;
///
/// assert_eq!(
///     normalize_base_url("https://api-inference.huggingface.co/models/"),
///     "https://api-inference.huggingface.co/models"
/// );
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and a model id (which may itself contain `/`).
///
/// ```
/// use hfdeck::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://host/models/", "/openai/whisper-large-v2"),
///     "https://host/models/openai/whisper-large-v2"
/// );
/// ```
pub fn construct_api_url(base_url: &str, model: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let model = model.trim().trim_start_matches('/');
    format!("{normalized_base}/{model}")
}

pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.len() > scheme.len() && value.starts_with(scheme))
}
