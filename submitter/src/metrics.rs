use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_gauge_with_registry,
    register_int_gauge_vec_with_registry, IntCounterVec, IntGauge, IntGaugeVec, Registry,
};

const METRICS_NAMESPACE: &str = "ledger_submitter";

fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

/// Metrics of the submission queue
#[derive(Clone, Debug)]
pub struct SubmitterMetrics {
    /// Metrics registry for adding new metrics and gathering reports
    registry: Registry,

    pub operation_submissions: IntCounterVec,
    // with a label for the terminal outcome, e.g. "Resolved", "InvalidOperation"
    pub operation_outcomes: IntCounterVec,
    pub nonce_rollbacks: IntCounterVec,
    /// Next nonce the queue will hand out for each signer
    cached_nonce: IntGaugeVec,
    pub in_flight_operations: IntGauge,
}

impl SubmitterMetrics {
    pub fn new(registry: Registry) -> eyre::Result<Self> {
        let operation_submissions = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("operation_submissions"),
                "The number of operations dispatched to the ledger",
            ),
            &["signer",],
            registry.clone()
        )?;
        let operation_outcomes = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("operation_outcomes"),
                "The number of operations which reached a terminal outcome",
            ),
            &["outcome",],
            registry.clone()
        )?;
        let nonce_rollbacks = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("nonce_rollbacks"),
                "The number of times the cached nonce was rolled back after an invalid operation",
            ),
            &["signer",],
            registry.clone()
        )?;
        let cached_nonce = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("cached_nonce"),
                "Next nonce cached locally for each signer",
            ),
            &["signer",],
            registry.clone()
        )?;
        let in_flight_operations = register_int_gauge_with_registry!(
            opts!(
                namespaced("in_flight_operations"),
                "The number of operations waiting for a terminal status",
            ),
            registry.clone()
        )?;
        Ok(Self {
            registry,
            operation_submissions,
            operation_outcomes,
            nonce_rollbacks,
            cached_nonce,
            in_flight_operations,
        })
    }

    pub fn update_operation_submissions_metric(&self, signer: &str) {
        self.operation_submissions
            .with_label_values(&[signer])
            .inc();
    }

    pub fn update_operation_outcomes_metric(&self, outcome: &str) {
        self.operation_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn update_nonce_rollbacks_metric(&self, signer: &str) {
        self.nonce_rollbacks.with_label_values(&[signer]).inc();
    }

    pub fn set_cached_nonce_metric(&self, signer: &str, nonce: u64) {
        self.cached_nonce
            .with_label_values(&[signer])
            .set(i64::try_from(nonce).unwrap_or(i64::MAX));
    }

    pub fn get_cached_nonce(&self, signer: &str) -> IntGauge {
        self.cached_nonce.with_label_values(&[signer]).clone()
    }

    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        let collected_metrics = self.registry.gather();
        let mut out_buf = Vec::with_capacity(1024 * 64);
        let encoder = prometheus::TextEncoder::new();
        prometheus::Encoder::encode(&encoder, &collected_metrics, &mut out_buf)?;
        Ok(out_buf)
    }

    #[cfg(test)]
    pub fn dummy_instance() -> Self {
        let registry = Registry::new();
        let instance = Self::new(registry.clone());
        instance.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::SubmitterMetrics;

    #[test]
    fn test_gather_exports_namespaced_metrics() {
        let metrics = SubmitterMetrics::dummy_instance();
        metrics.update_operation_submissions_metric("alice");
        metrics.update_operation_outcomes_metric("Resolved");
        metrics.set_cached_nonce_metric("alice", 7);

        let report = String::from_utf8(metrics.gather().unwrap()).unwrap();
        assert!(report.contains("ledger_submitter_operation_submissions{signer=\"alice\"} 1"));
        assert!(report.contains("ledger_submitter_operation_outcomes{outcome=\"Resolved\"} 1"));
        assert!(report.contains("ledger_submitter_cached_nonce{signer=\"alice\"} 7"));
        assert_eq!(metrics.get_cached_nonce("alice").get(), 7);
    }

    #[test]
    fn test_cached_nonce_saturates_on_overflow() {
        let metrics = SubmitterMetrics::dummy_instance();
        metrics.set_cached_nonce_metric("alice", u64::MAX);
        assert_eq!(metrics.get_cached_nonce("alice").get(), i64::MAX);
    }
}
