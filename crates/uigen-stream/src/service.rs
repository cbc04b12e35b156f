//! Generation Service interface

use crate::demux::StreamDemultiplexer;
use crate::error::TransportError;
use crate::event::StreamEvent;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Events of one call, in arrival order
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions
    System,
    /// Requester
    User,
    /// Generation service
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Input of one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,
    /// Output length ceiling, in tokens
    pub max_output_tokens: u32,
}

/// Remote service that streams an answer to a conversation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Start one call
    ///
    /// # Errors
    /// Returns error if the call cannot be started; failures after the
    /// first byte arrive as [`StreamEvent::StreamError`].
    async fn open(&self, request: &ServiceRequest) -> Result<EventStream, TransportError>;
}

/// Decode a byte stream of any chunking into events
pub fn event_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (
        Box::pin(bytes),
        StreamDemultiplexer::new(),
        VecDeque::new(),
    );
    stream::unfold(state, |(mut bytes, mut demux, mut pending)| async move {
        loop {
            if let Some(event) = pending.pop_front() {
                return Some((event, (bytes, demux, pending)));
            }
            if demux.is_closed() {
                return None;
            }
            let events = match bytes.next().await {
                Some(Ok(chunk)) => demux.feed(chunk.as_ref()),
                Some(Err(e)) => demux.interrupt(e.to_string()),
                None => demux.finish(),
            };
            pending.extend(events);
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FinishReason, StreamError};

    #[tokio::test]
    async fn byte_stream_is_decoded() {
        let parts: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\nda"),
            Ok(b"ta: [DONE]\n\n"),
        ];
        let events: Vec<_> = event_stream(stream::iter(parts)).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("a".into()),
                StreamEvent::FinishReason(FinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn read_error_becomes_stream_error() {
        let parts: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Err("reset".to_string()),
            Ok(b"data: [DONE]\n"),
        ];
        let events: Vec<_> = event_stream(stream::iter(parts)).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            StreamEvent::StreamError(StreamError::Interrupted("reset".into()))
        );
    }

    #[test]
    fn role_wire_names() {
        let json = serde_json::to_string(&ChatMessage::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }
}
