//! Error types for the policy gate

/// Allow-list construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Entry is empty or whitespace
    #[error("allow-list entry {index} is empty")]
    EmptyIdentifier {
        /// Position in the configured list
        index: usize,
    },

    /// Entry is not a usable module identifier
    #[error("invalid allow-list configuration: {0}")]
    Config(String),
}
