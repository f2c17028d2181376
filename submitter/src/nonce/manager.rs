use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::client::LedgerClient;
use crate::error::SubmitterError;
use crate::metrics::SubmitterMetrics;
use crate::operation::Address;

use super::state::{NonceEntry, NonceManagerState};

/// Hands out nonces per signer address, keeping a local cache ahead of the
/// ledger's view for operations which are dispatched but not included yet.
#[derive(Clone)]
pub struct NonceManager {
    client: Arc<dyn LedgerClient>,
    state: Arc<NonceManagerState>,
    metrics: SubmitterMetrics,
}

impl NonceManager {
    pub fn new(client: Arc<dyn LedgerClient>, metrics: SubmitterMetrics) -> Self {
        Self {
            client,
            state: Arc::new(NonceManagerState::new()),
            metrics,
        }
    }

    /// `max(cached next nonce, remote next account index)` without reserving it
    pub async fn next_nonce(&self, address: &Address) -> Result<u64, SubmitterError> {
        let entry = self.state.entry(address);
        let guard = entry.lock().await;
        let remote_next_nonce = self.client.next_account_index(address).await?;
        let next_nonce = guard.next_nonce(remote_next_nonce);
        debug!(
            ?address,
            remote_next_nonce,
            cached_nonce = ?guard.cached(),
            next_nonce,
            "Calculated next nonce"
        );
        Ok(next_nonce)
    }

    /// Reserves the next nonce and advances the cache past it.
    ///
    /// The reservation keeps the address locked until it is dropped, so that
    /// the caller can dispatch the operation before any later nonce of the
    /// same signer is handed out.
    pub(crate) async fn reserve_nonce(
        &self,
        address: &Address,
    ) -> Result<NonceReservation, SubmitterError> {
        let mut guard = self.state.entry(address).lock_owned().await;
        let remote_next_nonce = self.client.next_account_index(address).await?;
        let nonce = guard
            .reserve(remote_next_nonce)
            .ok_or_else(|| SubmitterError::NonceExhausted {
                address: address.clone(),
            })?;

        if let Some(cached) = guard.cached() {
            self.metrics
                .set_cached_nonce_metric(address.as_str(), cached);
        }
        info!(?address, nonce, remote_next_nonce, "Reserved nonce");

        Ok(NonceReservation {
            address: address.clone(),
            nonce,
            guard,
            metrics: self.metrics.clone(),
        })
    }

    /// Frees `nonce` after the ledger refused the operation which used it.
    /// The cache only ever moves down here. Returns whether it changed.
    pub async fn rollback(&self, address: &Address, nonce: u64) -> bool {
        let entry = self.state.entry(address);
        let mut guard = entry.lock().await;
        let previous = guard.cached();
        let rolled_back = guard.roll_back(nonce);

        if rolled_back {
            self.metrics.update_nonce_rollbacks_metric(address.as_str());
            self.metrics.set_cached_nonce_metric(address.as_str(), nonce);
            warn!(
                ?address,
                nonce,
                ?previous,
                "Rolled back cached nonce after invalid operation"
            );
        } else {
            info!(
                ?address,
                nonce,
                ?previous,
                "Cached nonce is not ahead of the failed nonce, no rollback needed"
            );
        }
        rolled_back
    }

    pub async fn cached_nonce(&self, address: &Address) -> Option<u64> {
        self.state.cached_nonce(address).await
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &NonceManagerState {
        &self.state
    }
}

/// Nonce reserved for one operation. Holds the signer's lock until dropped.
pub(crate) struct NonceReservation {
    address: Address,
    nonce: u64,
    guard: OwnedMutexGuard<NonceEntry>,
    metrics: SubmitterMetrics,
}

impl NonceReservation {
    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Gives the nonce back when the operation never left the process
    pub(crate) fn release_unused(mut self) {
        if self.guard.roll_back(self.nonce) {
            self.metrics
                .set_cached_nonce_metric(self.address.as_str(), self.nonce);
            info!(address = ?self.address, nonce = self.nonce, "Released unused nonce");
        }
    }

    /// Frees the nonce after the ledger refused the operation at dispatch.
    /// The address is still locked, so no later nonce was handed out meanwhile.
    pub(crate) fn roll_back_refused(mut self) {
        if self.guard.roll_back(self.nonce) {
            self.metrics
                .update_nonce_rollbacks_metric(self.address.as_str());
            self.metrics
                .set_cached_nonce_metric(self.address.as_str(), self.nonce);
            warn!(
                address = ?self.address,
                nonce = self.nonce,
                "Rolled back cached nonce after invalid operation"
            );
        }
    }
}
