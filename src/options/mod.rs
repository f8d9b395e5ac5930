//! Applying design option selections back through the provider
//!
//! Option-set calls are issued one at a time with a fixed pause between them
//! so a large design does not flood the provider.

use crate::config::OptionsConfig;
use crate::designs::Design;
use crate::provider::ModProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// One option group that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOption {
    pub directory_id: String,
    pub group: String,
    pub error: String,
}

/// Outcome of applying option selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// `directory_id/group` for every group that was set
    pub applied: Vec<String>,
    pub failed: Vec<FailedOption>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: ApplyReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
    }
}

/// Paced option-set client
pub struct OptionApplier {
    provider: Arc<dyn ModProvider>,
    delay: Duration,
}

impl OptionApplier {
    pub fn new(provider: Arc<dyn ModProvider>, config: &OptionsConfig) -> Self {
        Self {
            provider,
            delay: config.pacing_delay(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set every option group of one mod. Failures are collected, not raised.
    pub async fn apply(
        &self,
        collection_id: &str,
        directory_id: &str,
        groups: &BTreeMap<String, Vec<String>>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (index, (group, options)) in groups.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.set_one(collection_id, directory_id, group, options).await {
                Ok(()) => {
                    tracing::debug!("Set {}/{} = {:?}", directory_id, group, options);
                    report.applied.push(format!("{}/{}", directory_id, group));
                }
                Err(error) => {
                    tracing::warn!("Failed to set {}/{}: {}", directory_id, group, error);
                    report.failed.push(FailedOption {
                        directory_id: directory_id.to_string(),
                        group: group.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Apply the options of every enabled item of a design
    pub async fn apply_design(&self, collection_id: &str, design: &Design) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut first = true;

        for state in design.items.values().filter(|s| s.enabled && !s.options.is_empty()) {
            if !first && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            first = false;
            report.merge(self.apply(collection_id, &state.mod_directory, &state.options).await);
        }

        tracing::info!(
            "Applied design '{}': {} group(s) set, {} failed",
            design.name,
            report.applied.len(),
            report.failed.len()
        );
        report
    }

    /// Run one blocking provider call off the async worker threads
    async fn set_one(
        &self,
        collection_id: &str,
        directory_id: &str,
        group: &str,
        options: &[String],
    ) -> Result<(), String> {
        let provider = Arc::clone(&self.provider);
        let (collection_id, directory_id, group, options) = (
            collection_id.to_string(),
            directory_id.to_string(),
            group.to_string(),
            options.to_vec(),
        );

        let handle = tokio::task::spawn_blocking(move || {
            provider.set_mod_setting(&collection_id, &directory_id, &group, &options)
        });

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("option task failed: {}", e)),
        }
    }
}
