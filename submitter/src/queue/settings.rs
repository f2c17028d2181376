//! Load `SubmitterSettings` from an optional config file and the environment.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use eyre::{Context, Result};

use crate::operation::EventKey;

const ENV_PREFIX: &str = "SUBMITTER";

/// Settings for `SubmissionQueue`
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SubmitterSettings {
    /// How long to wait for a terminal status after dispatching an operation
    pub lifecycle_timeout_secs: u64,
    /// How long the node may take to accept an operation. The signer's nonce
    /// sequence is locked meanwhile.
    pub dispatch_timeout_secs: u64,
    /// Event which marks an included operation as failed
    pub failure_event: EventKey,
}

impl Default for SubmitterSettings {
    fn default() -> Self {
        Self {
            lifecycle_timeout_secs: 300,
            dispatch_timeout_secs: 60,
            failure_event: EventKey::default(),
        }
    }
}

impl SubmitterSettings {
    pub fn lifecycle_timeout(&self) -> Duration {
        Duration::from_secs(self.lifecycle_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    /// Defaults, overridden by the config file (if any), overridden by
    /// `SUBMITTER_*` environment variables, e.g. `SUBMITTER_LIFECYCLE_TIMEOUT_SECS=60`
    /// or `SUBMITTER_FAILURE_EVENT__METHOD=Trapped`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build submitter config")?
            .try_deserialize::<SubmitterSettings>()
            .context("Failed to deserialize submitter settings")?;

        Ok(settings)
    }
}
