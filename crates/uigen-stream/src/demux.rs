//! Stream Demultiplexer
//!
//! Sans-IO decoder for the OpenAI-compatible Server-Sent Events body. Bytes
//! go in as they arrive from the socket, in chunks of any size; decoded
//! [`StreamEvent`]s come out. Buffering is byte-level, so neither a line nor
//! a UTF-8 sequence split across reads is ever decoded in part.

use crate::event::{FinishReason, StreamError, StreamEvent};
use serde::Deserialize;

const DATA_TAG: &str = "data:";
const TERMINATOR: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemuxState {
    Open,
    Terminated,
    Failed,
}

/// Decoder for one call's event stream
#[derive(Debug)]
pub struct StreamDemultiplexer {
    buffer: Vec<u8>,
    finish: Option<FinishReason>,
    state: DemuxState,
}

impl Default for StreamDemultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDemultiplexer {
    /// Create decoder in the open state
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
            finish: None,
            state: DemuxState::Open,
        }
    }

    /// Whether the terminator, an error, or end of input was seen
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state != DemuxState::Open
    }

    /// Feed bytes; returns the events completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.is_closed() {
            return events;
        }

        let mut searched = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        while let Some(offset) = self.buffer[searched..].iter().position(|&b| b == b'\n') {
            let line_end = searched + offset;
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            self.decode_line(&line[..line.len() - 1], &mut events);
            if self.is_closed() {
                self.buffer.clear();
                break;
            }
            searched = 0;
        }
        events
    }

    /// Signal end of input
    ///
    /// A trailing line without terminator is decoded. If no `[DONE]` was
    /// seen, a finish reason recorded from a chunk is still emitted.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.is_closed() {
            return events;
        }
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut events);
        }
        if !self.is_closed() {
            if let Some(reason) = self.finish.take() {
                events.push(StreamEvent::FinishReason(reason));
            }
            self.state = DemuxState::Terminated;
        }
        events
    }

    /// Signal that reading the body failed
    ///
    /// A buffered partial line is dropped rather than decoded.
    pub fn interrupt(&mut self, cause: impl Into<String>) -> Vec<StreamEvent> {
        if self.is_closed() {
            return Vec::new();
        }
        self.buffer.clear();
        self.state = DemuxState::Failed;
        vec![StreamEvent::StreamError(StreamError::Interrupted(cause.into()))]
    }

    fn fail(&mut self, error: StreamError, events: &mut Vec<StreamEvent>) {
        tracing::debug!(%error, "event stream failed");
        self.state = DemuxState::Failed;
        events.push(StreamEvent::StreamError(error));
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Ok(line) = std::str::from_utf8(raw) else {
            self.fail(StreamError::InvalidUtf8, events);
            return;
        };

        // event:, id:, retry:, comments and blank separators carry nothing
        let Some(payload) = line.strip_prefix(DATA_TAG) else {
            if !line.is_empty() {
                tracing::trace!(line, "ignored event line");
            }
            return;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == TERMINATOR {
            let reason = self.finish.take().unwrap_or(FinishReason::Stop);
            events.push(StreamEvent::FinishReason(reason));
            self.state = DemuxState::Terminated;
            return;
        }

        let chunk: ChunkPayload = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                let error = StreamError::MalformedPayload {
                    payload: payload.to_string(),
                    message: e.to_string(),
                };
                self.fail(error, events);
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.fail(StreamError::Service(error.to_string()), events);
            return;
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };
        if let Some(content) = choice.delta.and_then(|d| d.content) {
            if !content.is_empty() {
                events.push(StreamEvent::Delta(content));
            }
        }
        if let Some(reason) = choice.finish_reason {
            self.finish = Some(FinishReason::from_wire(&reason));
        }
    }
}

/// Decode a complete body in one go
#[must_use]
pub fn decode_all(body: &[u8]) -> Vec<StreamEvent> {
    let mut demux = StreamDemultiplexer::new();
    let mut events = demux.feed(body);
    events.extend(demux.finish());
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content }, "finish_reason": null }] })
        )
    }

    fn finish_chunk(reason: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": {}, "finish_reason": reason }] })
        )
    }

    #[test]
    fn deltas_then_terminator() {
        let body = format!("{}{}data: [DONE]\n\n", chunk("const a"), chunk(" = 1;"));
        assert_eq!(
            decode_all(body.as_bytes()),
            vec![
                StreamEvent::Delta("const a".into()),
                StreamEvent::Delta(" = 1;".into()),
                StreamEvent::FinishReason(FinishReason::Stop),
            ]
        );
    }

    #[test]
    fn recorded_finish_reason_is_emitted_at_terminator() {
        let body = format!("{}{}data: [DONE]\n", chunk("x"), finish_chunk("length"));
        let events = decode_all(body.as_bytes());
        assert_eq!(
            events.last(),
            Some(&StreamEvent::FinishReason(FinishReason::Length))
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, StreamEvent::FinishReason(_)))
                .count(),
            1
        );
    }

    #[test]
    fn noise_lines_are_discarded() {
        let body = format!(
            ": keep-alive\nevent: message\nid: 7\nretry: 100\n\n{}data: [DONE]\n",
            chunk("a")
        );
        assert_eq!(
            decode_all(body.as_bytes()),
            vec![
                StreamEvent::Delta("a".into()),
                StreamEvent::FinishReason(FinishReason::Stop),
            ]
        );
    }

    #[test]
    fn crlf_and_no_space_after_tag() {
        let body = "data:{\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\r\n\r\ndata:[DONE]\r\n";
        assert_eq!(
            decode_all(body.as_bytes()),
            vec![
                StreamEvent::Delta("hi".into()),
                StreamEvent::FinishReason(FinishReason::Stop),
            ]
        );
    }

    #[test]
    fn split_line_is_buffered() {
        let body = chunk("hello");
        let (a, b) = body.as_bytes().split_at(17);
        let mut demux = StreamDemultiplexer::new();
        assert!(demux.feed(a).is_empty());
        assert_eq!(demux.feed(b), vec![StreamEvent::Delta("hello".into())]);
    }

    #[test]
    fn split_utf8_sequence_is_reassembled() {
        let body = chunk("héllo ✓");
        let bytes = body.as_bytes();
        let mut demux = StreamDemultiplexer::new();
        let mut events = Vec::new();
        for byte in bytes {
            events.extend(demux.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(events, vec![StreamEvent::Delta("héllo ✓".into())]);
    }

    #[test]
    fn malformed_payload_keeps_earlier_deltas_and_stops() {
        let body = format!("{}data: {{not json\n\n{}", chunk("kept"), chunk("dropped"));
        let events = decode_all(body.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Delta("kept".into()));
        assert!(matches!(
            events[1],
            StreamEvent::StreamError(StreamError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn end_without_terminator() {
        assert_eq!(
            decode_all(chunk("a").as_bytes()),
            vec![StreamEvent::Delta("a".into())]
        );

        let body = format!("{}{}", chunk("a"), finish_chunk("stop"));
        assert_eq!(
            decode_all(body.as_bytes()).last(),
            Some(&StreamEvent::FinishReason(FinishReason::Stop))
        );
    }

    #[test]
    fn trailing_line_without_newline_is_decoded() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"z\"}}]}";
        assert_eq!(decode_all(body.as_bytes()), vec![StreamEvent::Delta("z".into())]);
    }

    #[test]
    fn error_object_is_stream_error() {
        let events = decode_all(b"data: {\"error\":{\"message\":\"overloaded\"}}\n");
        assert!(matches!(
            events.as_slice(),
            [StreamEvent::StreamError(StreamError::Service(_))]
        ));
    }

    #[test]
    fn interrupt_drops_partial_line() {
        let mut demux = StreamDemultiplexer::new();
        let body = chunk("full");
        let mut events = demux.feed(body.as_bytes());
        events.extend(demux.feed(b"data: {\"choi"));
        events.extend(demux.interrupt("connection reset"));
        assert_eq!(events[0], StreamEvent::Delta("full".into()));
        assert!(matches!(
            events[1],
            StreamEvent::StreamError(StreamError::Interrupted(_))
        ));
        assert!(demux.feed(b"\n").is_empty());
    }

    #[test]
    fn input_after_terminator_is_ignored() {
        let body = format!("data: [DONE]\n{}", chunk("late"));
        assert_eq!(
            decode_all(body.as_bytes()),
            vec![StreamEvent::FinishReason(FinishReason::Stop)]
        );
    }
}
