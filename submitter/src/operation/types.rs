use std::fmt::{Debug, Display};

use derive_new::new;
use primitive_types::H256;
use uuid::Uuid;

pub type BlockHash = H256;

/// Unique identifier of an operation, used to correlate log lines across its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct OperationUuid(Uuid);

impl OperationUuid {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for OperationUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable address of a signing account. The submitter never interprets it,
/// it is only used as the nonce tracking key and forwarded to the ledger client.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Unsigned operation descriptor built by the caller
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Operation {
    pub uuid: OperationUuid,
    /// to be printed in logs for easier debugging
    pub metadata: String,
    /// encoded call, opaque to the submitter
    pub call: Vec<u8>,
}

impl Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("uuid", &self.uuid)
            .field("metadata", &self.metadata)
            .field("call_len", &self.call.len())
            .finish()
    }
}

impl Operation {
    pub fn new(metadata: impl Into<String>, call: Vec<u8>) -> Self {
        Self {
            uuid: OperationUuid::random(),
            metadata: metadata.into(),
            call,
        }
    }

    /// Bytes the signer authorizes: the encoded call followed by the
    /// little-endian nonce.
    pub fn signing_payload(&self, nonce: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.call.len().saturating_add(8));
        payload.extend_from_slice(&self.call);
        payload.extend_from_slice(&nonce.to_le_bytes());
        payload
    }
}

/// Operation authorized by a signer for a specific nonce, ready to be dispatched
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct SignedOperation {
    pub operation: Operation,
    pub address: Address,
    pub nonce: u64,
    pub signature: Vec<u8>,
}

/// Key identifying an event emitted by the ledger, e.g. `system.ExtrinsicFailed`
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct EventKey {
    pub section: String,
    pub method: String,
}

impl EventKey {
    pub fn new(section: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            method: method.into(),
        }
    }
}

impl Default for EventKey {
    fn default() -> Self {
        Self::new("system", "ExtrinsicFailed")
    }
}

impl Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.method)
    }
}

/// Event emitted by the ledger while including an operation
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ChainEvent {
    pub section: String,
    pub method: String,
    /// decoded event payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ChainEvent {
    pub fn new(
        section: impl Into<String>,
        method: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            section: section.into(),
            method: method.into(),
            data,
        }
    }

    pub fn matches(&self, key: &EventKey) -> bool {
        self.section == key.section && self.method == key.method
    }
}

/// Lifecycle status update pushed by the ledger client for a dispatched operation
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum StatusEvent {
    /// gossiped to peers, waiting in the pool
    Broadcast,
    /// included in a block, together with the events emitted during inclusion
    InBlock {
        block: BlockHash,
        events: Vec<ChainEvent>,
    },
    /// the inclusion block was retracted, the operation is back in the pool
    Retracted { block: BlockHash },
    Finalized { block: BlockHash },
    /// refused by the node, e.g. stale nonce or unpayable fees
    Invalid { reason: String },
}

/// Successful terminal outcome of a submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub uuid: OperationUuid,
    pub address: Address,
    pub nonce: u64,
    /// block the operation was included in
    pub block: BlockHash,
    pub events: Vec<ChainEvent>,
    /// only set when the caller asked to wait for finalization
    pub finalized_block: Option<BlockHash>,
}
