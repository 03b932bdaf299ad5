use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::Utc;

use stockroom_core::{AggregateRoot, ExpectedVersion, ProductId};
use stockroom_products::{PageRequest, Product, ProductDraft, ProductFilter};

use super::r#trait::{ProductStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    rows: BTreeMap<ProductId, Product>,
    sku_index: HashMap<String, ProductId>,
}

/// In-memory product store.
///
/// Intended for tests/dev. One `RwLock` guards rows and the sku index, so
/// every check-then-act (sku uniqueness, version check) runs under a single
/// write lock.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    tables: RwLock<Tables>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}

impl ProductStore for InMemoryProductStore {
    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables.rows.get(&id).cloned())
    }

    fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables
            .sku_index
            .get(sku)
            .and_then(|id| tables.rows.get(id))
            .cloned())
    }

    fn exists_by_sku(&self, sku: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables.sku_index.contains_key(sku))
    }

    fn exists_by_sku_excluding(&self, sku: &str, id: ProductId) -> Result<bool, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables.sku_index.get(sku).is_some_and(|owner| *owner != id))
    }

    fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        let matching: Vec<&Product> = tables.rows.values().filter(|p| filter.matches(p)).collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    fn find(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables
            .rows
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    fn insert(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;

        if let Some(sku) = &draft.sku {
            if tables.sku_index.contains_key(sku) {
                return Err(StoreError::DuplicateSku(sku.clone()));
            }
        }

        let product = Product::create(ProductId::new(), draft, Utc::now());
        if let Some(sku) = product.sku() {
            tables.sku_index.insert(sku.to_string(), product.id_typed());
        }
        tables.rows.insert(product.id_typed(), product.clone());
        Ok(product)
    }

    fn update(&self, mut product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        let id = product.id_typed();
        let mut tables = self.tables.write().map_err(Self::poisoned)?;

        let (stored_version, old_sku) = match tables.rows.get(&id) {
            Some(stored) => (stored.version(), stored.sku().map(str::to_string)),
            None => return Err(StoreError::NotFound(id)),
        };

        if !expected.matches(stored_version) {
            return Err(StoreError::VersionMismatch {
                id,
                expected,
                actual: stored_version,
            });
        }

        if let Some(sku) = product.sku() {
            if tables.sku_index.get(sku).is_some_and(|owner| *owner != id) {
                return Err(StoreError::DuplicateSku(sku.to_string()));
            }
        }

        product.record_write(stored_version, Utc::now());

        if old_sku.as_deref() != product.sku() {
            if let Some(old) = old_sku {
                tables.sku_index.remove(&old);
            }
            if let Some(new) = product.sku() {
                tables.sku_index.insert(new.to_string(), id);
            }
        }
        tables.rows.insert(id, product.clone());
        Ok(product)
    }

    fn delete(&self, id: ProductId) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        let removed = tables.rows.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(sku) = removed.sku() {
            tables.sku_index.remove(sku);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use stockroom_products::NewProduct;

    use super::*;

    fn draft(name: &str, sku: Option<&str>, qty: i64) -> ProductDraft {
        let mut new = NewProduct::new(name, Decimal::from_str("9.99").unwrap(), qty);
        if let Some(s) = sku {
            new = new.with_sku(s);
        }
        new.validate().unwrap()
    }

    #[test]
    fn insert_assigns_identity_and_indexes_sku() {
        let store = InMemoryProductStore::new();
        let p = store.insert(draft("Widget", Some("W-1"), 5)).unwrap();

        assert_eq!(p.version(), 1);
        assert_eq!(store.get(p.id_typed()).unwrap(), Some(p.clone()));
        assert_eq!(store.get_by_sku("W-1").unwrap(), Some(p.clone()));
        assert!(store.exists_by_sku("W-1").unwrap());
        assert!(!store.exists_by_sku_excluding("W-1", p.id_typed()).unwrap());
    }

    #[test]
    fn insert_rejects_duplicate_sku() {
        let store = InMemoryProductStore::new();
        store.insert(draft("Widget", Some("W-1"), 5)).unwrap();
        let err = store.insert(draft("Other", Some("W-1"), 1)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateSku("W-1".into()));
    }

    #[test]
    fn products_without_sku_do_not_collide() {
        let store = InMemoryProductStore::new();
        store.insert(draft("One", None, 1)).unwrap();
        store.insert(draft("Two", None, 1)).unwrap();
        assert_eq!(store.find(&ProductFilter::all()).unwrap().len(), 2);
    }

    #[test]
    fn update_checks_version_and_bumps_it() {
        let store = InMemoryProductStore::new();
        let p = store.insert(draft("Widget", None, 5)).unwrap();

        let mut changed = p.clone();
        changed.increase_stock(3).unwrap();
        let saved = store.update(changed, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(saved.version(), 2);
        assert_eq!(saved.quantity_in_stock(), 8);
        assert!(saved.updated_at() >= p.updated_at());
        assert_eq!(saved.created_at(), p.created_at());

        let mut stale = p;
        stale.increase_stock(1).unwrap();
        let err = store.update(stale, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { actual: 2, .. }));
        assert_eq!(store.get(saved.id_typed()).unwrap().unwrap().quantity_in_stock(), 8);
    }

    #[test]
    fn update_moves_the_sku_index() {
        let store = InMemoryProductStore::new();
        let a = store.insert(draft("A", Some("A-1"), 1)).unwrap();
        let b = store.insert(draft("B", Some("B-1"), 1)).unwrap();

        let mut renamed = a.clone();
        renamed
            .apply_patch(&stockroom_products::ProductPatch {
                sku: Some("A-2".into()),
                ..Default::default()
            })
            .unwrap();
        store.update(renamed, ExpectedVersion::Any).unwrap();
        assert!(!store.exists_by_sku("A-1").unwrap());
        assert!(store.exists_by_sku("A-2").unwrap());

        let mut clash = b;
        clash
            .apply_patch(&stockroom_products::ProductPatch {
                sku: Some("A-2".into()),
                ..Default::default()
            })
            .unwrap();
        let err = store.update(clash, ExpectedVersion::Any).unwrap_err();
        assert_eq!(err, StoreError::DuplicateSku("A-2".into()));
    }

    #[test]
    fn delete_is_irreversible_and_frees_sku() {
        let store = InMemoryProductStore::new();
        let p = store.insert(draft("Widget", Some("W-1"), 5)).unwrap();

        let removed = store.delete(p.id_typed()).unwrap();
        assert_eq!(removed.id_typed(), p.id_typed());
        assert_eq!(store.get(p.id_typed()).unwrap(), None);
        assert!(!store.exists_by_sku("W-1").unwrap());
        assert_eq!(store.delete(p.id_typed()).unwrap_err(), StoreError::NotFound(p.id_typed()));
    }

    #[test]
    fn list_pages_in_creation_order_with_total() {
        let store = InMemoryProductStore::new();
        let ids: Vec<ProductId> = (0..5)
            .map(|i| store.insert(draft(&format!("P{i}"), None, 1)).unwrap().id_typed())
            .collect();

        let (items, total) = store.list(&ProductFilter::all(), PageRequest::new(1, 2)).unwrap();
        assert_eq!(total, 5);
        let got: Vec<ProductId> = items.iter().map(|p| p.id_typed()).collect();
        assert_eq!(got, ids[2..4].to_vec());

        let (tail, _) = store.list(&ProductFilter::all(), PageRequest::new(2, 2)).unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn concurrent_inserts_with_same_sku_admit_exactly_one() {
        let store = Arc::new(InMemoryProductStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.insert(draft(&format!("P{i}"), Some("SAME"), 1)))
            })
            .collect();

        let ok = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(ok, 1);
    }
}
