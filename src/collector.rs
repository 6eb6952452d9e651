//! The collection seam between the worker protocol and the rendering layer.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{SelectionSettings, Settings};
use crate::tree::{rebuild, DocNode};
use crate::worker::classify::classify;
use crate::worker::protocol::CollectRequest;
use crate::worker::{CollectionResult, WorkerClient};

/// Collects one documentation tree per identifier.
///
/// This is the boundary the rendering collaborator consumes: one `collect`
/// per "autodoc" instruction, one `teardown` when the run ends.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Collect the documentation tree for `identifier`.
    ///
    /// `options` are selection overrides merged over the collector's
    /// defaults and forwarded to the worker verbatim.
    async fn collect(
        &self,
        identifier: &str,
        options: Map<String, Value>,
    ) -> CollectionResult<DocNode>;

    /// Release the resources backing this collector.
    fn teardown(&self);
}

/// [`Collector`] backed by one persistent extraction worker.
///
/// # Example
///
/// ```ignore
/// let settings = Settings::load()?;
/// let collector = WorkerCollector::from_settings(&settings).await?;
///
/// let node = collector.collect("pkg.Foo", Map::new()).await?;
/// collector.teardown();
/// ```
pub struct WorkerCollector {
    client: WorkerClient,
    defaults: Map<String, Value>,
}

impl WorkerCollector {
    /// Create a collector over an already-spawned worker.
    pub fn new(client: WorkerClient, selection: &SelectionSettings) -> Self {
        Self {
            client,
            defaults: selection.to_options(),
        }
    }

    /// Spawn the configured worker and wrap it in a collector.
    ///
    /// # Errors
    ///
    /// Returns a spawn error if the worker executable cannot be launched;
    /// nothing is left running in that case.
    pub async fn from_settings(settings: &Settings) -> CollectionResult<Self> {
        let client = WorkerClient::spawn_with_settings(&settings.worker).await?;
        Ok(Self::new(client, &settings.selection))
    }

    /// Merge the default selection options with caller overrides.
    /// Overrides win key-by-key.
    fn merged_options(&self, overrides: Map<String, Value>) -> Map<String, Value> {
        merge_options(&self.defaults, overrides)
    }

    /// The underlying worker client.
    pub fn client(&self) -> &WorkerClient {
        &self.client
    }
}

fn merge_options(defaults: &Map<String, Value>, overrides: Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    merged.extend(overrides);
    merged
}

#[async_trait]
impl Collector for WorkerCollector {
    async fn collect(
        &self,
        identifier: &str,
        options: Map<String, Value>,
    ) -> CollectionResult<DocNode> {
        debug!(identifier, "collecting documentation tree");
        let request = CollectRequest::new(identifier, self.merged_options(options));

        let line = self.client.exchange(&request).await?;

        let classified = classify(&line)?;
        for warning in &classified.warnings {
            warn!(identifier, "{warning}");
        }

        debug!(identifier, "rebuilding category and children lists");
        rebuild(classified.object)
    }

    fn teardown(&self) {
        self.client.terminate();
    }
}
