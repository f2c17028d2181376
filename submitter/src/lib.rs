//! Ordered submission of signed operations to an eventually-consistent ledger.
//!
//! `SubmissionQueue` hands out nonces per signer, dispatches operations and
//! follows their lifecycle (broadcast, inclusion, finality) until a terminal
//! outcome. Waiting for the effects of an operation to become visible in
//! ledger state is left to the `poller` crate.

#![deny(clippy::unwrap_used, clippy::panic)]
#![deny(clippy::arithmetic_side_effects)]

pub use client::{LedgerClient, Signer, StatusSubscription};
pub use error::SubmitterError;
pub use metrics::SubmitterMetrics;
pub use nonce::NonceManager;
pub use operation::{
    Address, BlockHash, ChainEvent, EventKey, Operation, OperationUuid, SignedOperation,
    StatusEvent, SubmissionOutcome,
};
pub use queue::{Entrypoint, SubmissionQueue, SubmitterSettings};

mod client;
mod error;
mod metrics;
mod nonce;
mod operation;
mod queue;
#[cfg(test)]
mod test_utils;
