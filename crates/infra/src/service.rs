//! InventoryService: orchestration of store, read cache and event publisher.
//!
//! Every mutating operation follows the same order:
//!
//! ```text
//! validate → check invariants against the store → store mutation
//!          → cache overwrite / invalidation → event emit → response
//! ```
//!
//! ## Concurrency
//!
//! Read-modify-write paths (update, soft delete, stock changes) read the record
//! from the store and write it back with `ExpectedVersion::Exact(read_version)`.
//! If another writer got there first the store reports a version mismatch and
//! the operation re-reads and re-applies, up to `max_write_attempts` times.
//! When the caller pins a version (`ProductPatch::expected_version`) there is
//! no retry: a mismatch is a `Conflict`.
//!
//! ## Events
//!
//! Publication is best-effort and at-most-once: it runs after the store commit
//! and a publish failure never fails the operation (see
//! [`ProductEventPublisher::emit`]).

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use stockroom_core::{
    AggregateRoot, DomainError, DomainResult, ExpectedVersion, FieldViolation, ProductId,
};
use stockroom_events::{EventBus, EventEnvelope};
use stockroom_products::{
    NewProduct, Page, PageRequest, Product, ProductEvent, ProductFilter, ProductPatch,
    ProductView, positive_quantity,
};

use crate::cache::{CacheStats, ReadCache};
use crate::config::AppConfig;
use crate::publisher::{ProductEventPublisher, PublisherStats};
use crate::store::{ProductStore, StoreError};

/// Tunables the service needs from the process configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub low_stock_threshold: u32,
    pub max_write_attempts: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            low_stock_threshold: config.low_stock_threshold,
            max_write_attempts: config.max_write_attempts.max(1),
        }
    }
}

/// Cache and publisher counters, for diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ServiceStats {
    pub entity_cache: CacheStats,
    pub listing_cache: CacheStats,
    pub events: PublisherStats,
}

pub struct InventoryService<S, B> {
    store: S,
    cache: ReadCache,
    publisher: ProductEventPublisher<B>,
    settings: ServiceSettings,
}

impl<S, B> InventoryService<S, B>
where
    S: ProductStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        store: S,
        cache: ReadCache,
        publisher: ProductEventPublisher<B>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub fn publisher(&self) -> &ProductEventPublisher<B> {
        &self.publisher
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            entity_cache: self.cache.entity_stats(),
            listing_cache: self.cache.listing_stats(),
            events: self.publisher.stats(),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// All products (active or not), one page at a time. Cached per page key.
    #[instrument(skip(self, page), fields(page = page.page, size = page.size))]
    pub fn list_products(&self, page: PageRequest) -> DomainResult<Page<ProductView>> {
        if page.size == 0 || page.size > self.settings.max_page_size {
            return Err(DomainError::invalid_fields(vec![FieldViolation::new(
                "size",
                page.size,
                format!("size must be between 1 and {}", self.settings.max_page_size),
            )]));
        }

        if let Some(cached) = self.cache.get_listing(page.key()) {
            debug!("listing cache hit");
            return Ok(cached);
        }

        let (items, total) = self.store.list(&ProductFilter::all(), page)?;
        let listing = Page::new(items.iter().map(Product::view).collect(), page, total);
        self.cache.put_listing(page.key(), listing.clone());
        Ok(listing)
    }

    pub fn list_active(&self) -> DomainResult<Vec<ProductView>> {
        self.find(&ProductFilter::active())
    }

    /// Cache-aside read by id. Inactive products are still returned.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn get_product(&self, id: ProductId) -> DomainResult<ProductView> {
        if let Some(cached) = self.cache.get_entity(id) {
            debug!("entity cache hit");
            return Ok(cached.view());
        }

        let product = self
            .store
            .get(id)?
            .ok_or_else(|| DomainError::from(StoreError::NotFound(id)))?;
        self.cache.put_entity(product.clone());
        Ok(product.view())
    }

    #[instrument(skip(self))]
    pub fn get_by_sku(&self, sku: &str) -> DomainResult<ProductView> {
        self.store
            .get_by_sku(sku.trim())?
            .map(|p| p.view())
            .ok_or_else(|| DomainError::not_found(format!("product with sku '{sku}' not found")))
    }

    /// Active products whose name contains `fragment`, ignoring case.
    pub fn search_by_name(&self, fragment: &str) -> DomainResult<Vec<ProductView>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(DomainError::invalid_fields(vec![FieldViolation::new(
                "name",
                fragment,
                "name must not be blank",
            )]));
        }
        self.find(&ProductFilter::active().with_name_containing(fragment))
    }

    /// Active products in `category`, ignoring case.
    pub fn by_category(&self, category: &str) -> DomainResult<Vec<ProductView>> {
        self.find(&ProductFilter::active().with_category(category.trim()))
    }

    /// Active products priced within `[min, max]`.
    pub fn by_price_range(&self, min: Decimal, max: Decimal) -> DomainResult<Vec<ProductView>> {
        let mut violations = Vec::new();
        if min < Decimal::ZERO {
            violations.push(FieldViolation::new("min_price", min.to_string(), "min_price must not be negative"));
        }
        if max < Decimal::ZERO {
            violations.push(FieldViolation::new("max_price", max.to_string(), "max_price must not be negative"));
        }
        if min > max {
            violations.push(FieldViolation::new(
                "min_price",
                min.to_string(),
                "min_price must not exceed max_price",
            ));
        }
        if !violations.is_empty() {
            return Err(DomainError::invalid_fields(violations));
        }
        self.find(&ProductFilter::active().with_price_between(min, max))
    }

    /// Active products with at least one unit in stock.
    pub fn list_available(&self) -> DomainResult<Vec<ProductView>> {
        self.find(&ProductFilter::available())
    }

    /// Active products with `quantity_in_stock <= threshold`. Defaults to the
    /// configured threshold.
    pub fn low_stock(&self, threshold: Option<i64>) -> DomainResult<Vec<ProductView>> {
        let threshold = match threshold {
            None => self.settings.low_stock_threshold,
            Some(t) if t < 0 => {
                return Err(DomainError::invalid_fields(vec![FieldViolation::new(
                    "threshold",
                    t,
                    "threshold must not be negative",
                )]));
            }
            Some(t) => u32::try_from(t).unwrap_or(u32::MAX),
        };
        self.find(&ProductFilter::active().with_max_stock(threshold))
    }

    fn find(&self, filter: &ProductFilter) -> DomainResult<Vec<ProductView>> {
        Ok(self.store.find(filter)?.iter().map(Product::view).collect())
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    #[instrument(skip(self, new), fields(sku = ?new.sku))]
    pub fn create_product(&self, new: NewProduct) -> DomainResult<ProductView> {
        let draft = new.validate()?;

        if let Some(sku) = &draft.sku {
            if self.store.exists_by_sku(sku)? {
                return Err(StoreError::DuplicateSku(sku.clone()).into());
            }
        }

        let product = self.store.insert(draft)?;

        self.cache.put_entity(product.clone());
        self.cache.evict_all_listings();

        let view = product.view();
        self.publisher
            .emit(ProductEvent::created(view.clone(), product.updated_at()));

        info!(product_id = %view.id, "product created");
        Ok(view)
    }

    /// Partial update: only fields present in `patch` change.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub fn update_product(&self, id: ProductId, patch: ProductPatch) -> DomainResult<ProductView> {
        patch.validate()?;
        let new_sku = patch.normalized_sku();

        let saved = self.modify(id, patch.expected_version, |product| {
            if let Some(sku) = &new_sku {
                if self.store.exists_by_sku_excluding(sku, id)? {
                    return Err(StoreError::DuplicateSku(sku.clone()).into());
                }
            }
            product.apply_patch(&patch)
        })?;

        self.cache.evict_all_listings();
        self.cache.put_entity(saved.clone());

        let view = saved.view();
        self.publisher
            .emit(ProductEvent::updated(view.clone(), saved.updated_at()));

        info!(version = saved.version(), "product updated");
        Ok(view)
    }

    /// Mark inactive; the record stays in the store and remains mutable.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn soft_delete(&self, id: ProductId) -> DomainResult<ProductView> {
        let saved = self.modify(id, None, |product| {
            product.deactivate();
            Ok(())
        })?;

        self.cache.evict_all_listings();
        self.cache.evict_entity(id);

        let view = saved.view();
        self.publisher
            .emit(ProductEvent::deleted(view.clone(), saved.updated_at()));

        info!(version = saved.version(), "product soft-deleted");
        Ok(view)
    }

    /// Remove irreversibly. Emits `deleted` only if the record was still
    /// active; a soft-deleted record already announced its deletion. The event
    /// carries the next version so it sorts after every earlier event.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn hard_delete(&self, id: ProductId) -> DomainResult<()> {
        let removed = match self.store.delete(id) {
            Ok(removed) => removed,
            Err(StoreError::NotFound(_)) => {
                self.cache.forget_entity(id);
                return Err(StoreError::NotFound(id).into());
            }
            Err(e) => return Err(e.into()),
        };

        self.cache.evict_all_listings();
        self.cache.forget_entity(id);

        if removed.is_active() {
            let mut view = removed.view();
            view.version += 1;
            self.publisher.emit(ProductEvent::deleted(view, Utc::now()));
        }

        info!(was_active = removed.is_active(), "product hard-deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub fn increase_stock(&self, id: ProductId, quantity: i64) -> DomainResult<ProductView> {
        let quantity = positive_quantity(quantity)?;
        let saved = self.modify(id, None, |product| product.increase_stock(quantity))?;
        Ok(self.after_stock_change(saved))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub fn decrease_stock(&self, id: ProductId, quantity: i64) -> DomainResult<ProductView> {
        let quantity = positive_quantity(quantity)?;
        let saved = self.modify(id, None, |product| product.decrease_stock(quantity))?;
        Ok(self.after_stock_change(saved))
    }

    fn after_stock_change(&self, saved: Product) -> ProductView {
        self.cache.evict_all_listings();
        self.cache.put_entity(saved.clone());

        let view = saved.view();
        self.publisher
            .emit(ProductEvent::updated(view.clone(), saved.updated_at()));

        info!(
            stock = view.quantity_in_stock,
            version = view.version,
            "stock changed"
        );
        view
    }

    /// Read the record from the store, apply `mutate`, write it back under an
    /// exact version check. Retries lost races unless the caller pinned a version.
    fn modify<F>(
        &self,
        id: ProductId,
        pinned_version: Option<u64>,
        mut mutate: F,
    ) -> DomainResult<Product>
    where
        F: FnMut(&mut Product) -> DomainResult<()>,
    {
        let attempts = match pinned_version {
            Some(_) => 1,
            None => self.settings.max_write_attempts.max(1),
        };

        for attempt in 1..=attempts {
            let mut product = self
                .store
                .get(id)?
                .ok_or_else(|| DomainError::from(StoreError::NotFound(id)))?;

            let expected = pinned_version.unwrap_or(product.version());
            ExpectedVersion::Exact(expected).check(product.version())?;

            mutate(&mut product)?;

            match self.store.update(product, ExpectedVersion::Exact(expected)) {
                Ok(saved) => return Ok(saved),
                Err(StoreError::VersionMismatch { actual, .. })
                    if pinned_version.is_none() && attempt < attempts =>
                {
                    debug!(attempt, expected, actual, "lost write race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::conflict(format!(
            "product {id} kept changing concurrently; gave up after {attempts} attempts"
        )))
    }
}
