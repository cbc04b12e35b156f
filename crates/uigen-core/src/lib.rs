//! UIGEN Core - Continuation & Compliance Orchestrator
//!
//! Turns a natural-language requirement into a complete, syntactically valid
//! TSX component that imports only allow-listed modules:
//! - Streams the answer from an OpenAI-compatible chat service
//! - Detects answers cut off by the output ceiling and asks for the rest
//! - Detects malformed answers and asks for a clean rewrite
//! - Rejects disallowed imports and asks for a rewrite without them
//!
//! Continuations and rewrites draw from one request-wide budget, so a
//! request makes at most `max_continuations + max_rewrites + 1` calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uigen_core::{ContinuationOrchestrator, GeneratorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeneratorConfig::from_file("uigen.toml")?;
//! let service = Arc::new(config.http_service()?);
//! let orchestrator = ContinuationOrchestrator::new(service, &config)?;
//!
//! let artifact = orchestrator
//!     .generate("A todo list with add and remove buttons", config.budgets)
//!     .await?;
//! println!("{}", artifact.source);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod budget;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod review;
pub mod splice;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use budget::{AttemptBudget, Budgets};
pub use config::GeneratorConfig;
pub use error::{ConfigError, FailureReason, GenerationFailure};
pub use orchestrator::{terminal_signal, ContinuationOrchestrator};
pub use review::{extract_overall_score, Score, ScoreSource};
pub use splice::splice_continuation;
pub use state::{allowed_transitions, validate_transition, IllegalTransition, OrchestratorState};
pub use telemetry::init_tracing;
pub use types::{
    AttemptKind, AttemptRecord, FinalArtifact, GenerationRequest, RequestId, RewriteCause,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving generation
    pub use crate::{
        Budgets, ContinuationOrchestrator, FailureReason, FinalArtifact, GenerationFailure,
        GeneratorConfig,
    };
    pub use tokio_util::sync::CancellationToken;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
