//! Shared application state.

use aula_cache::{EntityCache, TenantCache};

/// State available to all route handlers. Cloning is cheap; everything
/// inside is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub cache: TenantCache,
    pub entities: EntityCache,
}

impl AppState {
    pub fn new(cache: TenantCache) -> Self {
        let entities = EntityCache::new(cache.clone());
        Self { cache, entities }
    }
}
