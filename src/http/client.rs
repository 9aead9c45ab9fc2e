use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;

// Shared HTTP client instance.
lazy_static::lazy_static! {
    static ref CLIENT: Arc<reqwest::Client> = Arc::new(reqwest::Client::new());
}

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Environment variable 'tushare_token' not set")]
    TokenNotSet,
    #[error("HTTP error from {0}: {1}. Response body: {2}")]
    HttpError(String, u16, String),
    #[error("Error deserializing JSON: {0}")]
    JsonError(String),
    #[error("Other error: {0}")]
    Other(String),
}

/// Posts a JSON body to the given URL and deserializes the JSON response.
pub async fn post_json<B, T>(url: &str, body: &B) -> Result<T, RequestError>
where
    B: Serialize,
    T: DeserializeOwned,
{
    let response = CLIENT
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RequestError::Other(e.to_string()))?;

    // Get the response status code.
    let status = response.status();

    // Handle non-success status codes.
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))?;
        return Err(RequestError::HttpError(
            url.to_string(),
            status.as_u16(),
            body,
        ));
    }

    // Deserialize the JSON response.
    response
        .json()
        .await
        .map_err(|e| RequestError::JsonError(e.to_string()))
}
