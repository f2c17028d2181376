use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SubmitterError;
use crate::operation::{Address, SignedOperation, StatusEvent};

/// Remote ledger node the submitter talks to
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next account index (nonce) the node expects for the address.
    /// It may lag behind operations which were dispatched but are not included yet.
    async fn next_account_index(&self, address: &Address) -> Result<u64, SubmitterError>;

    /// Dispatch a signed operation and subscribe to its lifecycle status updates.
    /// A refusal at dispatch time should be reported as `SubmitterError::InvalidOperation`.
    async fn submit_and_watch(
        &self,
        operation: SignedOperation,
    ) -> Result<StatusSubscription, SubmitterError>;
}

/// Identity authorizing operations
pub trait Signer: Send + Sync + Debug {
    fn address(&self) -> Address;

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SubmitterError>;
}

/// Receiving side of the lifecycle status channel of one dispatched operation.
///
/// The ledger client keeps the sending side and stops producing updates once
/// `Sender::is_closed` reports the subscription was torn down.
#[derive(Debug)]
pub struct StatusSubscription {
    events: mpsc::Receiver<StatusEvent>,
}

impl StatusSubscription {
    pub fn new(events: mpsc::Receiver<StatusEvent>) -> Self {
        Self { events }
    }

    /// Creates a subscription together with the sender the client pushes updates into
    pub fn channel(capacity: usize) -> (mpsc::Sender<StatusEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self::new(receiver))
    }

    /// Next status update, `None` once the client dropped the sender
    pub async fn next_event(&mut self) -> Option<StatusEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.events.close();
    }
}
