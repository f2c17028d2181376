use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::client::{LedgerClient, Signer, StatusSubscription};
use crate::error::SubmitterError;
use crate::operation::{Address, BlockHash, ChainEvent, SignedOperation, StatusEvent};

mockall::mock! {
    pub Ledger {}

    #[async_trait]
    impl LedgerClient for Ledger {
        async fn next_account_index(&self, address: &Address) -> Result<u64, SubmitterError>;

        async fn submit_and_watch(
            &self,
            operation: SignedOperation,
        ) -> Result<StatusSubscription, SubmitterError>;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TestSigner {
    pub address: Address,
    pub fail: bool,
}

impl TestSigner {
    pub(crate) fn new(address: &str) -> Self {
        Self {
            address: Address::new(address),
            fail: false,
        }
    }

    pub(crate) fn failing(address: &str) -> Self {
        Self {
            address: Address::new(address),
            fail: true,
        }
    }
}

impl Signer for TestSigner {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SubmitterError> {
        if self.fail {
            return Err(SubmitterError::SigningError("key unavailable".to_string()));
        }
        Ok(payload.iter().rev().copied().collect())
    }
}

/// What the ledger does with the next dispatched operation
pub(crate) enum Script {
    Events(Vec<StatusEvent>),
    Refuse(String),
}

/// Ledger which replays a scripted list of status events for every dispatched
/// operation and records what was accepted
#[derive(Default)]
pub(crate) struct ScriptedLedger {
    pub remote_next_nonce: Mutex<u64>,
    pub scripts: Mutex<VecDeque<Script>>,
    pub dispatched: Mutex<Vec<SignedOperation>>,
    pub senders: Mutex<Vec<mpsc::Sender<StatusEvent>>>,
}

impl ScriptedLedger {
    pub(crate) fn new(remote_next_nonce: u64) -> Arc<Self> {
        Arc::new(Self {
            remote_next_nonce: Mutex::new(remote_next_nonce),
            ..Default::default()
        })
    }

    pub(crate) fn script(&self, events: Vec<StatusEvent>) {
        self.scripts.lock().push_back(Script::Events(events));
    }

    pub(crate) fn refuse(&self, reason: &str) {
        self.scripts
            .lock()
            .push_back(Script::Refuse(reason.to_string()));
    }

    pub(crate) fn dispatched_nonces(&self) -> Vec<u64> {
        self.dispatched.lock().iter().map(|op| op.nonce).collect()
    }

    /// Whether every subscription handed out was torn down by the submitter
    pub(crate) fn all_subscriptions_closed(&self) -> bool {
        self.senders.lock().iter().all(|sender| sender.is_closed())
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn next_account_index(&self, _address: &Address) -> Result<u64, SubmitterError> {
        Ok(*self.remote_next_nonce.lock())
    }

    async fn submit_and_watch(
        &self,
        operation: SignedOperation,
    ) -> Result<StatusSubscription, SubmitterError> {
        let events = match self.scripts.lock().pop_front() {
            Some(Script::Events(events)) => events,
            Some(Script::Refuse(reason)) => {
                return Err(SubmitterError::InvalidOperation {
                    address: operation.address,
                    nonce: operation.nonce,
                    reason,
                })
            }
            None => vec![],
        };
        self.dispatched.lock().push(operation);
        let (sender, subscription) = StatusSubscription::channel(events.len().saturating_add(4));
        for event in events {
            sender
                .try_send(event)
                .map_err(|err| SubmitterError::NetworkError(err.to_string()))?;
        }
        // keep the sender alive so the subscription stays open
        self.senders.lock().push(sender);
        Ok(subscription)
    }
}

/// Ledger whose node accepts connections but never answers a dispatch
pub(crate) struct HangingLedger {
    pub remote_next_nonce: u64,
}

#[async_trait]
impl LedgerClient for HangingLedger {
    async fn next_account_index(&self, _address: &Address) -> Result<u64, SubmitterError> {
        Ok(self.remote_next_nonce)
    }

    async fn submit_and_watch(
        &self,
        _operation: SignedOperation,
    ) -> Result<StatusSubscription, SubmitterError> {
        std::future::pending().await
    }
}

pub(crate) fn block(n: u64) -> BlockHash {
    BlockHash::from_low_u64_be(n)
}

pub(crate) fn extrinsic_success() -> ChainEvent {
    ChainEvent::new("system", "ExtrinsicSuccess", serde_json::json!({}))
}

pub(crate) fn extrinsic_failed() -> ChainEvent {
    ChainEvent::new(
        "system",
        "ExtrinsicFailed",
        serde_json::json!({ "module": { "index": 6, "error": "InsufficientBalance" } }),
    )
}
