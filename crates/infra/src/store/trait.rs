use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{DomainError, ExpectedVersion, ProductId};
use stockroom_products::{PageRequest, Product, ProductDraft, ProductFilter};

/// Store operation error.
///
/// These are **infrastructure errors** (missing rows, uniqueness, concurrency,
/// backend health) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("product with sku '{0}' already exists")]
    DuplicateSku(String),

    #[error("product {id} changed concurrently (expected {expected:?}, found {actual})")]
    VersionMismatch {
        id: ProductId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => DomainError::not_found(err.to_string()),
            StoreError::DuplicateSku(_) | StoreError::VersionMismatch { .. } => {
                DomainError::conflict(err.to_string())
            }
            StoreError::Unavailable(_) => DomainError::internal(err.to_string()),
        }
    }
}

/// Keyed product storage.
///
/// ## Semantics
///
/// - Every call observes an atomic snapshot; no call sees a half-applied write.
/// - `insert` assigns id, `version = 1` and both timestamps, and rejects a
///   duplicate non-null sku in the same atomic step.
/// - `update` checks `expected` against the stored version and the sku against
///   every other row, then stores the record with `version + 1` and a fresh
///   `updated_at`.
/// - `delete` is hard and irreversible; it returns the removed record.
/// - Scans (`list`, `find`) return rows in id order, which is creation order.
pub trait ProductStore: Send + Sync {
    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError>;

    fn exists_by_sku(&self, sku: &str) -> Result<bool, StoreError>;

    /// True if any product other than `id` carries `sku`.
    fn exists_by_sku_excluding(&self, sku: &str, id: ProductId) -> Result<bool, StoreError>;

    /// One page of matching rows plus the total number of matches.
    fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), StoreError>;

    fn find(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError>;

    fn insert(&self, draft: ProductDraft) -> Result<Product, StoreError>;

    fn update(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError>;

    fn delete(&self, id: ProductId) -> Result<Product, StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get(id)
    }

    fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        (**self).get_by_sku(sku)
    }

    fn exists_by_sku(&self, sku: &str) -> Result<bool, StoreError> {
        (**self).exists_by_sku(sku)
    }

    fn exists_by_sku_excluding(&self, sku: &str, id: ProductId) -> Result<bool, StoreError> {
        (**self).exists_by_sku_excluding(sku, id)
    }

    fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), StoreError> {
        (**self).list(filter, page)
    }

    fn find(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        (**self).find(filter)
    }

    fn insert(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        (**self).insert(draft)
    }

    fn update(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        (**self).update(product, expected)
    }

    fn delete(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).delete(id)
    }
}
