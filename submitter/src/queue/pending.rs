use std::time::Duration;

use tracing::{info, warn};

use crate::error::SubmitterError;
use crate::operation::{
    Address, BlockHash, ChainEvent, EventKey, OperationUuid, StatusEvent, SubmissionOutcome,
};

/// Lifecycle state of a dispatched operation
#[derive(Debug)]
pub(crate) enum OperationState {
    Allocated,
    Broadcast,
    Included {
        block: BlockHash,
        events: Vec<ChainEvent>,
    },
    Resolved(SubmissionOutcome),
    Rejected(SubmitterError),
}

impl OperationState {
    fn name(&self) -> &'static str {
        match self {
            OperationState::Allocated => "Allocated",
            OperationState::Broadcast => "Broadcast",
            OperationState::Included { .. } => "Included",
            OperationState::Resolved(_) => "Resolved",
            OperationState::Rejected(_) => "Rejected",
        }
    }
}

/// State machine of one operation in flight, identified by (signer address, nonce).
/// Driven by the status events of its subscription until it reaches
/// `Resolved` or `Rejected`.
#[derive(Debug)]
pub(crate) struct PendingOperation {
    uuid: OperationUuid,
    address: Address,
    nonce: u64,
    wait_for_finalization: bool,
    failure_event: EventKey,
    state: OperationState,
}

impl PendingOperation {
    pub(crate) fn new(
        uuid: OperationUuid,
        address: Address,
        nonce: u64,
        wait_for_finalization: bool,
        failure_event: EventKey,
    ) -> Self {
        Self {
            uuid,
            address,
            nonce,
            wait_for_finalization,
            failure_event,
            state: OperationState::Allocated,
        }
    }

    pub(crate) fn address(&self) -> &Address {
        &self.address
    }

    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &OperationState {
        &self.state
    }

    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            OperationState::Resolved(_) | OperationState::Rejected(_)
        )
    }

    /// Whether the ledger refused the operation outright, freeing its nonce
    pub(crate) fn is_invalid(&self) -> bool {
        matches!(
            self.state,
            OperationState::Rejected(SubmitterError::InvalidOperation { .. })
        )
    }

    pub(crate) fn mark_broadcast(&mut self) {
        if matches!(self.state, OperationState::Allocated) {
            self.state = OperationState::Broadcast;
        }
    }

    pub(crate) fn reject(&mut self, err: SubmitterError) {
        if !self.is_terminal() {
            self.state = OperationState::Rejected(err);
        }
    }

    /// The node stopped sending updates before a terminal status
    pub(crate) fn reject_closed(&mut self) {
        let err = SubmitterError::SubscriptionClosed {
            address: self.address.clone(),
            nonce: self.nonce,
        };
        self.reject(err);
    }

    pub(crate) fn reject_timed_out(&mut self, timeout: Duration) {
        let err = SubmitterError::LifecycleTimeout {
            address: self.address.clone(),
            nonce: self.nonce,
            timeout,
        };
        self.reject(err);
    }

    /// Applies a status update. Updates arriving after a terminal state are ignored.
    pub(crate) fn apply(&mut self, event: StatusEvent) {
        use OperationState::*;

        if self.is_terminal() {
            warn!(
                uuid = %self.uuid,
                address = ?self.address,
                nonce = self.nonce,
                ?event,
                "Status update after terminal state, ignoring"
            );
            return;
        }

        let previous = std::mem::replace(&mut self.state, Allocated);
        let previous_name = previous.name();
        self.state = match (previous, event) {
            (Allocated | Broadcast, StatusEvent::Broadcast) => Broadcast,
            // re-gossip of an included operation carries no information
            (state @ Included { .. }, StatusEvent::Broadcast) => state,
            (Allocated | Broadcast | Included { .. }, StatusEvent::InBlock { block, events }) => {
                self.on_in_block(block, events)
            }
            (Included { block, .. }, StatusEvent::Retracted { block: retracted })
                if block == retracted =>
            {
                Broadcast
            }
            (state, StatusEvent::Retracted { block }) => {
                warn!(?block, "Retracted block is not the inclusion block, ignoring");
                state
            }
            (Included { block, events }, StatusEvent::Finalized { block: finalized }) => {
                Resolved(self.outcome(block, events, Some(finalized)))
            }
            // once seen in a block the nonce counts as consumed, a reorg arrives as `Retracted` first
            (Allocated | Broadcast, StatusEvent::Invalid { reason }) => {
                Rejected(SubmitterError::InvalidOperation {
                    address: self.address.clone(),
                    nonce: self.nonce,
                    reason,
                })
            }
            (state, event) => Rejected(SubmitterError::UnexpectedStatus(format!(
                "{event:?} while operation {}#{} is {}",
                self.address,
                self.nonce,
                state.name()
            ))),
        };

        info!(
            uuid = %self.uuid,
            address = ?self.address,
            nonce = self.nonce,
            previous_state = previous_name,
            next_state = self.state.name(),
            "Operation status updated"
        );
    }

    fn on_in_block(&self, block: BlockHash, events: Vec<ChainEvent>) -> OperationState {
        if let Some(failure) = events.iter().find(|e| e.matches(&self.failure_event)) {
            return OperationState::Rejected(SubmitterError::SemanticFailure {
                address: self.address.clone(),
                nonce: self.nonce,
                block,
                failure: failure.data.clone(),
            });
        }
        if self.wait_for_finalization {
            OperationState::Included { block, events }
        } else {
            OperationState::Resolved(self.outcome(block, events, None))
        }
    }

    fn outcome(
        &self,
        block: BlockHash,
        events: Vec<ChainEvent>,
        finalized_block: Option<BlockHash>,
    ) -> SubmissionOutcome {
        SubmissionOutcome {
            uuid: self.uuid,
            address: self.address.clone(),
            nonce: self.nonce,
            block,
            events,
            finalized_block,
        }
    }

    /// Terminal result, or `None` while the operation is still in flight
    pub(crate) fn into_result(self) -> Option<Result<SubmissionOutcome, SubmitterError>> {
        match self.state {
            OperationState::Resolved(outcome) => Some(Ok(outcome)),
            OperationState::Rejected(err) => Some(Err(err)),
            _ => None,
        }
    }
}
