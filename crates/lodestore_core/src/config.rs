//! Configuration for the persistence coordinator.

use lodestore_protocol::ResourceUri;

/// Configuration threaded into the coordinator at construction.
///
/// There is no process-wide state: two coordinators with different
/// configurations coexist without interfering.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Container under which new resources are created.
    pub base_container: ResourceUri,
    /// Whether secondary-index synchronization fires on save/delete.
    pub index_sync: bool,
}

impl CoordinatorConfig {
    /// Creates a configuration with index synchronization enabled.
    pub fn new(base_container: ResourceUri) -> Self {
        Self {
            base_container,
            index_sync: true,
        }
    }

    /// Sets whether index synchronization fires.
    #[must_use]
    pub fn with_index_sync(mut self, enabled: bool) -> Self {
        self.index_sync = enabled;
        self
    }
}
