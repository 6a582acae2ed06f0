//! Everything a sync component needs, passed explicitly.

use crate::clock::{ServerClock, SystemClock};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::event_loop::Scheduler;
use crate::lifecycle::LifecycleScope;
use crate::path::PathResolver;
use crate::remote::RemoteStore;
use crate::sync::{CollectionSync, DocumentSync};
use std::sync::Arc;

/// Store, scheduler, clock and tenant shared by the sync components of one
/// tenant.
#[derive(Clone)]
pub struct SyncContext {
    store: Arc<dyn RemoteStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn ServerClock>,
    config: SyncConfig,
    resolver: PathResolver,
}

impl SyncContext {
    /// Build a context using the system clock.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        scheduler: Arc<dyn Scheduler>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.check()?;
        let resolver = PathResolver::new(&config.tenant_collection, &config.tenant_id);
        Ok(Self {
            store,
            scheduler,
            clock: Arc::new(SystemClock),
            config,
            resolver,
        })
    }

    /// Replace the clock that stamps writes.
    pub fn with_clock(mut self, clock: Arc<dyn ServerClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn clock(&self) -> &Arc<dyn ServerClock> {
        &self.clock
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Mirror a collection resource within `scope`.
    pub fn collection(&self, resource: &str, scope: &LifecycleScope) -> CollectionSync {
        CollectionSync::new(self, resource, scope)
    }

    /// Mirror the default document of a resource within `scope`.
    pub fn document(&self, resource: &str, scope: &LifecycleScope) -> DocumentSync {
        DocumentSync::new(self, resource, scope)
    }
}
