mod api;

pub use api::{
    ChatCompletionRequest, ChatMessage, ChunkChoice, ChunkDelta, ErrorBody, ErrorEnvelope, Role,
    StreamChunk,
};
