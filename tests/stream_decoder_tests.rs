use logchat::api::stream::{decode_chunk, finish, DecoderCarry};

fn frame(text: &str) -> String {
    let payload = serde_json::json!({ "choices": [{ "delta": { "content": text } }] });
    format!("data: {payload}\n\n")
}

fn decode_all(pieces: &[&[u8]]) -> Vec<String> {
    let mut carry = DecoderCarry::default();
    let mut deltas = Vec::new();
    for piece in pieces {
        let (decoded, next) = decode_chunk(piece, carry);
        deltas.extend(decoded);
        carry = next;
    }
    deltas.extend(finish(carry));
    deltas
}

#[test]
fn test_every_split_offset_yields_same_deltas() {
    let body = format!(
        "{}{}{}data: [DONE]\n\n",
        frame("Be"),
        frame("cause é"),
        frame(" X")
    );
    let bytes = body.as_bytes();
    let whole = decode_all(&[bytes]);
    assert_eq!(whole, vec!["Be", "cause é", " X"]);

    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        assert_eq!(decode_all(&[head, tail]), whole, "split at byte {split}");
    }
}

#[test]
fn test_single_byte_chunks_reassemble() {
    let body = format!("{}{}", frame("Hello, "), frame("wörld"));
    let pieces: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
    assert_eq!(decode_all(&pieces), vec!["Hello, ", "wörld"]);
}

#[test]
fn test_done_sentinel_alone_yields_nothing() {
    let (deltas, carry) = decode_chunk(b"data: [DONE]\n\n", DecoderCarry::default());
    assert!(deltas.is_empty());
    assert!(carry.is_empty());
}

#[test]
fn test_malformed_frame_between_valid_frames_is_skipped() {
    let body = format!("{}data: {{not json\n\n{}", frame("A"), frame("B"));
    assert_eq!(decode_all(&[body.as_bytes()]), vec!["A", "B"]);
}

#[test]
fn test_non_data_lines_are_ignored() {
    let body = format!(
        ": keep-alive\nevent: message\nid: 7\nretry: 1000\n\n{}",
        frame("ok")
    );
    assert_eq!(decode_all(&[body.as_bytes()]), vec!["ok"]);
}

#[test]
fn test_frame_without_content_yields_empty_delta() {
    let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n";
    let (deltas, _) = decode_chunk(body.as_bytes(), DecoderCarry::default());
    assert_eq!(deltas, vec![String::new()]);
}

#[test]
fn test_crlf_line_endings() {
    let body = frame("crlf").replace('\n', "\r\n");
    assert_eq!(decode_all(&[body.as_bytes()]), vec!["crlf"]);
}

#[test]
fn test_incomplete_line_is_carried() {
    let body = frame("later");
    let cut = body.len() / 2;
    let (deltas, carry) = decode_chunk(&body.as_bytes()[..cut], DecoderCarry::default());
    assert!(deltas.is_empty());
    assert_eq!(carry.len(), cut);

    let (deltas, carry) = decode_chunk(&body.as_bytes()[cut..], carry);
    assert_eq!(deltas, vec!["later"]);
    assert!(carry.is_empty());
}

#[test]
fn test_finish_decodes_unterminated_last_line() {
    let body = frame("tail");
    let unterminated = body.trim_end();
    let (deltas, carry) = decode_chunk(unterminated.as_bytes(), DecoderCarry::default());
    assert!(deltas.is_empty());
    assert_eq!(finish(carry), vec!["tail"]);
}
