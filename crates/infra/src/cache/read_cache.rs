use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use stockroom_core::{AggregateRoot, ProductId};
use stockroom_products::{Page, PageKey, Product, ProductView};

use super::keyed::{CacheStats, InMemoryCache, KeyedCache};

type EntityCache = Box<dyn KeyedCache<ProductId, Product>>;
type ListingCache = Box<dyn KeyedCache<PageKey, Page<ProductView>>>;

/// The two product caches: one entry per product, one per listing page.
///
/// The caches are independent; evicting a product does not touch listings and
/// vice versa.
///
/// Entity writes are ordered by product version, and ids removed with
/// [`forget_entity`](Self::forget_entity) are never cached again. A reader that
/// loaded a record before a concurrent write or delete cannot park it in the
/// cache afterwards.
pub struct ReadCache {
    entities: EntityCache,
    listings: ListingCache,
    /// Hard-deleted ids. Guards every entity write.
    deleted: Mutex<HashSet<ProductId>>,
}

impl ReadCache {
    pub fn new(entities: EntityCache, listings: ListingCache) -> Self {
        Self {
            entities,
            listings,
            deleted: Mutex::new(HashSet::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryCache::new()), Box::new(InMemoryCache::new()))
    }

    pub fn get_entity(&self, id: ProductId) -> Option<Product> {
        self.entities.get(&id)
    }

    /// Cache `product` unless its id was hard-deleted or a newer version is
    /// already cached.
    pub fn put_entity(&self, product: Product) {
        let id = product.id_typed();
        let deleted = self.deleted.lock().unwrap_or_else(PoisonError::into_inner);
        if deleted.contains(&id) {
            return;
        }
        if self
            .entities
            .peek(&id)
            .is_some_and(|cached| cached.version() > product.version())
        {
            return;
        }
        self.entities.put(id, product);
    }

    /// Evict `id` for good: later `put_entity` calls for it are ignored.
    pub fn forget_entity(&self, id: ProductId) {
        let mut deleted = self.deleted.lock().unwrap_or_else(PoisonError::into_inner);
        deleted.insert(id);
        self.entities.evict(&id);
    }

    pub fn evict_entity(&self, id: ProductId) {
        self.entities.evict(&id);
    }

    pub fn get_listing(&self, key: PageKey) -> Option<Page<ProductView>> {
        self.listings.get(&key)
    }

    pub fn put_listing(&self, key: PageKey, page: Page<ProductView>) {
        self.listings.put(key, page);
    }

    pub fn evict_all_listings(&self) {
        self.listings.clear();
    }

    pub fn entity_stats(&self) -> CacheStats {
        self.entities.stats()
    }

    pub fn listing_stats(&self) -> CacheStats {
        self.listings.stats()
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl core::fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadCache")
            .field("entities", &self.entity_stats())
            .field("listings", &self.listing_stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use stockroom_products::{NewProduct, PageRequest};

    use super::*;

    fn product() -> Product {
        let draft = NewProduct::new("Widget", Decimal::from_str("9.99").unwrap(), 5)
            .validate()
            .unwrap();
        Product::create(ProductId::new(), draft, Utc::now())
    }

    #[test]
    fn entity_and_listing_caches_are_independent() {
        let cache = ReadCache::in_memory();
        let p = product();
        let key = PageRequest::new(0, 20);

        cache.put_entity(p.clone());
        cache.put_listing(key, Page::new(vec![p.view()], key, 1));

        cache.evict_all_listings();
        assert_eq!(cache.get_entity(p.id_typed()), Some(p.clone()));
        assert!(cache.get_listing(key).is_none());

        cache.put_listing(key, Page::new(vec![p.view()], key, 1));
        cache.evict_entity(p.id_typed());
        assert!(cache.get_entity(p.id_typed()).is_none());
        assert!(cache.get_listing(key).is_some());
    }

    #[test]
    fn forgotten_ids_are_never_cached_again() {
        let cache = ReadCache::in_memory();
        let p = product();

        cache.put_entity(p.clone());
        cache.forget_entity(p.id_typed());
        assert!(cache.get_entity(p.id_typed()).is_none());

        cache.put_entity(p.clone());
        assert!(cache.get_entity(p.id_typed()).is_none());
    }

    #[test]
    fn older_versions_do_not_replace_newer_ones() {
        let cache = ReadCache::in_memory();
        let old = product();
        let mut newer = old.clone();
        newer.increase_stock(1).unwrap();
        newer.record_write(old.version(), Utc::now());

        cache.put_entity(newer.clone());
        cache.put_entity(old);
        assert_eq!(cache.get_entity(newer.id_typed()), Some(newer));
    }

    #[test]
    fn evict_all_listings_drops_every_page() {
        let cache = ReadCache::in_memory();
        for page in 0..3 {
            let key = PageRequest::new(page, 10);
            cache.put_listing(key, Page::new(vec![], key, 0));
        }
        cache.evict_all_listings();
        assert_eq!(cache.listing_stats().entries, 0);
    }
}
