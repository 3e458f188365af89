use super::credentials::{CredentialSource, API_KEY_NAME};
use super::error::CompletionError;
use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{ChatCompletionRequest, ChatMessage, ErrorEnvelope};
use crate::util::is_local_endpoint_url;
use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, CompletionError>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, messages: &[ChatMessage]) -> Result<ByteStream, CompletionError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    model: String,
    api_url: String,
    credentials: Arc<dyn CredentialSource>,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("logchat/", env!("CARGO_PKG_VERSION")));
        // A local server is never reached through a system proxy.
        if is_local_endpoint_url(&config.api_url) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            model: config.model.clone(),
            api_url: config.api_url.clone(),
            credentials,
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(
        mock_producer: Arc<dyn MockStreamProducer>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: "mock-model".to_string(),
            api_url: super::mock_client::MOCK_API_URL.to_string(),
            credentials,
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Resolve the bearer credential; absence is a precondition failure.
    pub fn api_key(&self) -> Result<String, CompletionError> {
        self.credentials
            .lookup(API_KEY_NAME)
            .ok_or_else(|| CompletionError::MissingCredential {
                name: API_KEY_NAME.to_string(),
            })
    }

    /// POST the conversation and return the event-stream body once the
    /// endpoint has accepted the request.
    pub async fn create_stream(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, CompletionError> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(messages);
            }
        }

        let request_url = self.api_url.clone();
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        if debug_payload_enabled() {
            if let Ok(value) = serde_json::to_value(&payload) {
                emit_debug_payload(&request_url, &value);
            }
        }

        let request = self
            .http
            .post(&request_url)
            .bearer_auth(api_key)
            .header("accept", "text/event-stream")
            .json(&payload);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
            response = request.send() => {
                response.map_err(|error| map_api_request_error(error, &request_url))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
                body = response.text() => body.unwrap_or_default(),
            };
            return Err(CompletionError::Rejected {
                url: request_url,
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }
}

/// Prefer the server's `error.message`, then the raw body, then the reason
/// phrase.
pub fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope
            .error
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
        {
            return message;
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Failed to get AI response")
        .to_string()
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> CompletionError {
    let url = request_url.to_string();
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return CompletionError::Unreachable {
            url,
            detail: format!(
                "{error}. Start your local server or update {}.",
                crate::config::API_URL_ENV
            ),
        };
    }
    if error.is_connect() {
        return CompletionError::Unreachable {
            url,
            detail: error.to_string(),
        };
    }
    if error.is_timeout() {
        return CompletionError::TimedOut {
            url,
            detail: error.to_string(),
        };
    }
    CompletionError::Transport {
        url,
        detail: error.to_string(),
    }
}
