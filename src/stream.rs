use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::Response;
use futures_util::StreamExt;
use serde::Serialize;

use crate::repositories::engine_client::LineStream;

/// Multiplexed log frame tag for stdout.
pub const STDOUT_STREAM: u8 = 1;

#[derive(Serialize)]
struct StreamRecord<'a> {
    stream: &'a str,
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    error: &'a str,
}

/// One progress line in the Docker JSON-lines format: the payload keeps its
/// trailing newline and the record itself is newline-terminated.
pub fn stream_record(line: &str) -> Bytes {
    let payload = format!("{}\n", line);
    let mut record = serde_json::to_vec(&StreamRecord { stream: &payload })
        .unwrap_or_else(|_| b"{}".to_vec());
    record.push(b'\n');
    Bytes::from(record)
}

/// A terminal error record in the same JSON-lines format. Emitted in-band so
/// the client sees the failure even though the status line already went out.
pub fn error_record(message: &str) -> Bytes {
    let mut record = serde_json::to_vec(&ErrorRecord { error: message })
        .unwrap_or_else(|_| b"{}".to_vec());
    record.push(b'\n');
    Bytes::from(record)
}

/// Wraps a subprocess line stream as a chunked JSON-lines progress response.
pub fn progress_response(lines: LineStream) -> Response {
    let body = lines.map(|item| {
        Ok::<Bytes, std::convert::Infallible>(match item {
            Ok(line) => stream_record(&line),
            Err(e) => error_record(&e.to_string()),
        })
    });
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(body))
        .unwrap_or_default()
}

/// Frames one log payload in the Docker multiplexed stream format: a tag
/// byte, three zero bytes, a big-endian length, then the payload itself.
pub fn mux_frame(payload: &[u8]) -> Bytes {
    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.push(STDOUT_STREAM);
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Bytes::from(frame)
}
