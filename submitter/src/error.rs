use std::time::Duration;

use crate::operation::{Address, BlockHash};

#[derive(Debug, thiserror::Error)]
pub enum SubmitterError {
    /// Included in a block, but the ledger attached a failure event
    #[error("Operation {address}#{nonce} failed in block {block:?}: {failure}")]
    SemanticFailure {
        address: Address,
        nonce: u64,
        block: BlockHash,
        failure: serde_json::Value,
    },
    /// Refused by the node without inclusion
    #[error("Invalid operation {address}#{nonce}: {reason}")]
    InvalidOperation {
        address: Address,
        nonce: u64,
        reason: String,
    },
    #[error("No terminal status for operation {address}#{nonce} after {timeout:?}")]
    LifecycleTimeout {
        address: Address,
        nonce: u64,
        timeout: Duration,
    },
    #[error("Status subscription for operation {address}#{nonce} closed before a terminal status")]
    SubscriptionClosed { address: Address, nonce: u64 },
    #[error("No nonce left to hand out for {address}")]
    NonceExhausted { address: Address },
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("{0}")]
    EyreError(#[from] eyre::Report),
}

impl SubmitterError {
    /// Whether the ledger may have consumed the nonce, i.e. chain state may
    /// have been mutated by the failed submission.
    pub fn may_have_mutated_state(&self) -> bool {
        use SubmitterError::*;

        match self {
            InvalidOperation { .. } | SigningError(_) | NonceExhausted { .. } => false,
            SemanticFailure { .. }
            | LifecycleTimeout { .. }
            | SubscriptionClosed { .. }
            | UnexpectedStatus(_)
            | NetworkError(_)
            | EyreError(_) => true,
        }
    }

    pub fn to_metrics_label(&self) -> String {
        use SubmitterError::*;

        match self {
            SemanticFailure { .. } => "SemanticFailure",
            InvalidOperation { .. } => "InvalidOperation",
            LifecycleTimeout { .. } => "LifecycleTimeout",
            SubscriptionClosed { .. } => "SubscriptionClosed",
            NonceExhausted { .. } => "NonceExhausted",
            UnexpectedStatus(_) => "UnexpectedStatus",
            SigningError(_) => "SigningError",
            NetworkError(_) => "NetworkError",
            EyreError(_) => "EyreError",
        }
        .to_string()
    }
}
