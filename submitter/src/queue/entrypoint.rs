use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::client::Signer;
use crate::error::SubmitterError;
use crate::operation::{Address, Operation, SignedOperation, SubmissionOutcome};

use super::core::SubmissionQueue;
use super::pending::PendingOperation;

#[async_trait]
pub trait Entrypoint: Send + Sync {
    /// Signs the operation with the next nonce of the signer, dispatches it and
    /// waits until it is included (or finalized, if `wait_for_finalization`).
    async fn submit(
        &self,
        operation: Operation,
        signer: &dyn Signer,
        wait_for_finalization: bool,
    ) -> Result<SubmissionOutcome, SubmitterError>;

    async fn next_nonce(&self, address: &Address) -> Result<u64, SubmitterError>;
}

#[async_trait]
impl Entrypoint for SubmissionQueue {
    #[instrument(
        skip_all,
        name = "SubmissionQueue::submit",
        fields(uuid = %operation.uuid, metadata = %operation.metadata, wait_for_finalization = wait_for_finalization)
    )]
    async fn submit(
        &self,
        operation: Operation,
        signer: &dyn Signer,
        wait_for_finalization: bool,
    ) -> Result<SubmissionOutcome, SubmitterError> {
        let address = signer.address();

        // the address stays locked until the operation is dispatched, so the
        // ledger sees operations of one signer in nonce order
        let reservation = self.nonce_manager.reserve_nonce(&address).await?;
        let nonce = reservation.nonce();

        let mut pending = PendingOperation::new(
            operation.uuid,
            address.clone(),
            nonce,
            wait_for_finalization,
            self.settings.failure_event.clone(),
        );

        let signature = match signer.sign(&operation.signing_payload(nonce)) {
            Ok(signature) => signature,
            Err(err) => {
                error!(?address, nonce, ?err, "Failed to sign operation");
                reservation.release_unused();
                pending.reject(err);
                return self.resolve(pending);
            }
        };

        let signed = SignedOperation::new(operation, address.clone(), nonce, signature);
        let dispatch_timeout = self.settings.dispatch_timeout();
        let dispatched =
            tokio::time::timeout(dispatch_timeout, self.client.submit_and_watch(signed)).await;

        let subscription = match dispatched {
            Ok(Ok(subscription)) => {
                drop(reservation);
                subscription
            }
            Ok(Err(err)) => {
                error!(?address, nonce, ?err, "Failed to dispatch operation");
                if matches!(err, SubmitterError::InvalidOperation { .. }) {
                    reservation.roll_back_refused();
                } else {
                    drop(reservation);
                }
                pending.reject(err);
                return self.resolve(pending);
            }
            Err(_) => {
                // the node may have received the operation, its nonce stays consumed
                drop(reservation);
                error!(
                    ?address,
                    nonce,
                    timeout = ?dispatch_timeout,
                    "Timed out dispatching operation"
                );
                pending.reject_timed_out(dispatch_timeout);
                return self.resolve(pending);
            }
        };

        pending.mark_broadcast();
        self.metrics
            .update_operation_submissions_metric(address.as_str());
        info!(?address, nonce, "Operation dispatched to ledger");

        let pending = self.watch(pending, subscription).await;
        self.finish(pending).await
    }

    async fn next_nonce(&self, address: &Address) -> Result<u64, SubmitterError> {
        self.nonce_manager.next_nonce(address).await
    }
}
