//! UIGEN Stream
//!
//! Client side of the generation service.
//!
//! - **StreamDemultiplexer**: sans-IO decoder turning Server-Sent Event bytes
//!   into ordered [`StreamEvent`]s, independent of read boundaries
//! - **GenerationService**: the call seam the orchestrator drives
//! - **HttpGenerationService**: `reqwest` implementation for
//!   OpenAI-compatible chat-completion endpoints
//!
//! # Example
//!
//! ```rust
//! use uigen_stream::{FinishReason, StreamDemultiplexer, StreamEvent};
//!
//! let mut demux = StreamDemultiplexer::new();
//! let mut events = demux.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"<div/>\"}}]}\n");
//! events.extend(demux.feed(b"data: [DONE]\n"));
//!
//! assert_eq!(events[0], StreamEvent::Delta("<div/>".to_string()));
//! assert_eq!(events[1], StreamEvent::FinishReason(FinishReason::Stop));
//! ```

#![warn(missing_docs)]

pub mod demux;
pub mod error;
pub mod event;
pub mod http;
pub mod service;

// Re-exports
pub use demux::{decode_all, StreamDemultiplexer};
pub use error::TransportError;
pub use event::{FinishReason, StreamError, StreamEvent};
pub use http::{HttpGenerationService, ServiceConfig};
pub use service::{
    event_stream, ChatMessage, EventStream, GenerationService, Role, ServiceRequest,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a generation service
    pub use crate::{
        ChatMessage, EventStream, FinishReason, GenerationService, ServiceRequest, StreamEvent,
        TransportError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
