use crate::api::client::{ByteStream, MockStreamProducer};
use crate::api::error::CompletionError;
use crate::types::ChatMessage;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};

pub const MOCK_API_URL: &str = "http://localhost:8000/v1/chat/completions";

/// Scripted outcome of one mocked completion request.
pub enum MockResponse {
    /// Body chunks followed by a normal end of stream.
    Stream(Vec<String>),
    /// Non-success status with the given error body.
    Reject { status: u16, body: String },
    /// Body chunks followed by a transport failure.
    Interrupted { chunks: Vec<String>, detail: String },
    /// Body chunks after which the stream never yields again.
    Stalled(Vec<String>),
}

#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Message lists received so far, in request order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

/// A complete `data:` frame carrying `text` as its delta.
pub fn sse_frame(text: &str) -> String {
    let frame = serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
    });
    format!("data: {frame}\n\n")
}

pub fn sse_done() -> String {
    "data: [DONE]\n\n".to_string()
}

fn byte_chunks(chunks: Vec<String>) -> Vec<Result<Bytes, CompletionError>> {
    chunks.into_iter().map(|s| Ok(Bytes::from(s))).collect()
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, messages: &[ChatMessage]) -> Result<ByteStream, CompletionError> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(CompletionError::Transport {
                url: MOCK_API_URL.to_string(),
                detail: "MockApiClient: No more responses configured".to_string(),
            });
        }

        match responses_guard.remove(0) {
            MockResponse::Stream(chunks) => Ok(Box::pin(stream::iter(byte_chunks(chunks)))),
            MockResponse::Reject { status, body } => {
                let status = reqwest::StatusCode::from_u16(status)
                    .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                Err(CompletionError::Rejected {
                    url: MOCK_API_URL.to_string(),
                    status: status.as_u16(),
                    message: crate::api::client::rejection_message(status, &body),
                })
            }
            MockResponse::Interrupted { chunks, detail } => {
                let failure = Err(CompletionError::Transport {
                    url: MOCK_API_URL.to_string(),
                    detail,
                });
                Ok(Box::pin(
                    stream::iter(byte_chunks(chunks)).chain(stream::once(async move { failure })),
                ))
            }
            MockResponse::Stalled(chunks) => Ok(Box::pin(
                stream::iter(byte_chunks(chunks)).chain(stream::pending()),
            )),
        }
    }
}
