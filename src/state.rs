//! Shared application state threaded through the HTTP handlers.

use std::sync::Arc;

use crate::config::EmberConfig;
use crate::kv::StoreBackend;
use crate::notes::NoteStore;
use crate::rate_limit::RateLimiter;

/// Handles shared by every request handler.
///
/// Cheap to clone; all fields are handles over shared data. Nothing here
/// carries per-process note or limiter state, so multiple instances over
/// one store stay interchangeable.
#[derive(Clone)]
pub struct AppState {
    config: Arc<EmberConfig>,
    backend: Arc<dyn StoreBackend>,
    notes: NoteStore,
    limiter: RateLimiter,
}

impl AppState {
    /// Assemble the service state over `backend`.
    pub fn new(config: EmberConfig, backend: Arc<dyn StoreBackend>) -> Self {
        let notes = NoteStore::new(backend.clone(), config.note_limits());
        let limiter = RateLimiter::new(backend.clone());
        Self {
            config: Arc::new(config),
            backend,
            notes,
            limiter,
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &EmberConfig {
        &self.config
    }

    /// Raw store handle, used by the liveness probe.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Note lifecycle operations.
    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    /// Shared-store rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
