use std::sync::Arc;

use prometheus::IntGauge;
use tracing::{error, info, warn};

use crate::client::{LedgerClient, StatusSubscription};
use crate::error::SubmitterError;
use crate::metrics::SubmitterMetrics;
use crate::nonce::NonceManager;
use crate::operation::SubmissionOutcome;

use super::pending::PendingOperation;
use super::settings::SubmitterSettings;

pub const RESOLVED_OUTCOME: &str = "Resolved";

/// Submits signed operations to the ledger, one nonce sequence per signer.
///
/// Cloning is cheap and clones share the nonce cache, so a queue can be
/// handed to many tasks.
#[derive(Clone)]
pub struct SubmissionQueue {
    pub(crate) client: Arc<dyn LedgerClient>,
    pub(crate) nonce_manager: NonceManager,
    pub(crate) settings: SubmitterSettings,
    pub(crate) metrics: SubmitterMetrics,
}

impl SubmissionQueue {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        settings: SubmitterSettings,
        metrics: SubmitterMetrics,
    ) -> Self {
        let nonce_manager = NonceManager::new(client.clone(), metrics.clone());
        Self {
            client,
            nonce_manager,
            settings,
            metrics,
        }
    }

    pub fn nonce_manager(&self) -> &NonceManager {
        &self.nonce_manager
    }

    pub fn settings(&self) -> &SubmitterSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &SubmitterMetrics {
        &self.metrics
    }

    /// Feeds status updates into the operation until it is terminal, the
    /// subscription closes or the lifecycle timeout elapses. The subscription
    /// is torn down in every case.
    pub(crate) async fn watch(
        &self,
        mut pending: PendingOperation,
        mut subscription: StatusSubscription,
    ) -> PendingOperation {
        let timeout = self.settings.lifecycle_timeout();

        let in_flight = InFlightGuard::new(&self.metrics.in_flight_operations);
        let watched = tokio::time::timeout(timeout, async {
            while let Some(event) = subscription.next_event().await {
                pending.apply(event);
                if pending.is_terminal() {
                    return;
                }
            }
            pending.reject_closed();
        })
        .await;
        drop(in_flight);

        subscription.unsubscribe();

        if watched.is_err() {
            error!(
                address = ?pending.address(),
                nonce = pending.nonce(),
                ?timeout,
                "Timed out waiting for a terminal status"
            );
            pending.reject_timed_out(timeout);
        }
        pending
    }

    /// Turns an operation watched after dispatch into the caller-visible
    /// result, rolling the nonce back if the ledger reported it invalid.
    pub(crate) async fn finish(
        &self,
        pending: PendingOperation,
    ) -> Result<SubmissionOutcome, SubmitterError> {
        if pending.is_invalid() {
            self.nonce_manager
                .rollback(pending.address(), pending.nonce())
                .await;
        }
        self.resolve(pending)
    }

    /// Caller-visible result of a terminal operation. Nonce bookkeeping is
    /// left to the caller.
    pub(crate) fn resolve(
        &self,
        pending: PendingOperation,
    ) -> Result<SubmissionOutcome, SubmitterError> {
        let address = pending.address().clone();
        let nonce = pending.nonce();

        let result = pending.into_result().unwrap_or_else(|| {
            Err(SubmitterError::UnexpectedStatus(format!(
                "operation {address}#{nonce} finished without a terminal status"
            )))
        });

        match &result {
            Ok(outcome) => {
                self.metrics
                    .update_operation_outcomes_metric(RESOLVED_OUTCOME);
                info!(
                    ?address,
                    nonce,
                    block = ?outcome.block,
                    finalized_block = ?outcome.finalized_block,
                    events = outcome.events.len(),
                    "Operation resolved"
                );
            }
            Err(err) => {
                self.metrics
                    .update_operation_outcomes_metric(&err.to_metrics_label());
                warn!(?address, nonce, ?err, "Operation rejected");
            }
        }
        result
    }
}

/// Counts an operation as in flight until dropped, also when the submitting
/// future is dropped mid-wait
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}
