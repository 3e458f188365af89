use super::logging::emit_frame_parse_error;
use crate::types::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Bytes of the last incomplete line, carried between `decode_chunk` calls.
///
/// Kept as raw bytes so a multi-byte UTF-8 sequence split across two chunks
/// is only decoded once it is whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderCarry {
    pending: Vec<u8>,
}

impl DecoderCarry {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Decode one chunk of an event-stream body into text deltas.
///
/// Every complete line is interpreted; the trailing partial line is returned
/// in the new carry and prefixed onto the next chunk.
pub fn decode_chunk(chunk: &[u8], carry: DecoderCarry) -> (Vec<String>, DecoderCarry) {
    let mut buffer = carry.pending;
    buffer.extend_from_slice(chunk);

    let mut deltas = Vec::new();
    let mut start = 0;
    while let Some(offset) = buffer[start..].iter().position(|byte| *byte == b'\n') {
        let line_end = start + offset;
        if let Some(delta) = decode_line(&buffer[start..line_end]) {
            deltas.push(delta);
        }
        start = line_end + 1;
    }

    buffer.drain(..start);
    (deltas, DecoderCarry { pending: buffer })
}

/// Decode whatever is left in the carry once the transport has ended.
pub fn finish(carry: DecoderCarry) -> Vec<String> {
    if carry.pending.is_empty() {
        return Vec::new();
    }
    decode_line(&carry.pending).into_iter().collect()
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.strip_suffix('\r').unwrap_or(&line);
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();

    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(frame) => {
            if let Some(reason) = frame.finish_reason() {
                tracing::debug!(reason, "completion finished");
            }
            Some(frame.text_delta().to_string())
        }
        Err(error) => {
            emit_frame_parse_error(payload, &error);
            None
        }
    }
}
