use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DomainError, DomainResult, ProductId};

use crate::price::Price;
use crate::validation::{
    CATEGORY_MAX_CHARS, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS, NAME_MIN_CHARS, SKU_MAX_CHARS,
    Violations, non_blank,
};

/// Aggregate root: Product.
///
/// Instances are only produced by a store (`Product::create`) and mutated
/// through the methods below, which keep `quantity_in_stock` non-negative.
/// Persisting a mutation is the store's job; it calls [`Product::record_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Price,
    quantity_in_stock: u32,
    category: Option<String>,
    sku: Option<String>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Materialize a validated draft as a freshly inserted record (version 1).
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            quantity_in_stock: draft.quantity_in_stock,
            category: draft.category,
            sku: draft.sku,
            active: draft.active,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity_in_stock(&self) -> u32 {
        self.quantity_in_stock
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sellable right now: active and at least one unit on hand.
    pub fn is_available(&self) -> bool {
        self.active && self.quantity_in_stock > 0
    }

    pub fn increase_stock(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than 0"));
        }
        self.quantity_in_stock = self.quantity_in_stock.checked_add(quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "stock of product {} cannot exceed {}",
                self.id,
                u32::MAX
            ))
        })?;
        Ok(())
    }

    pub fn decrease_stock(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than 0"));
        }
        if quantity > self.quantity_in_stock {
            return Err(DomainError::invalid_state(format!(
                "insufficient stock for product {}: available {}, requested {}",
                self.id, self.quantity_in_stock, quantity
            )));
        }
        self.quantity_in_stock -= quantity;
        Ok(())
    }

    /// Soft delete. The record is kept and stays mutable.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Overwrite every field present in `patch`. Nothing changes if the patch
    /// is invalid.
    pub fn apply_patch(&mut self, patch: &ProductPatch) -> DomainResult<()> {
        patch.validate()?;

        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = non_blank(Some(description));
        }
        if let Some(price) = patch.price {
            self.price = Price::new(price)?;
        }
        if let Some(quantity) = patch.quantity_in_stock {
            self.quantity_in_stock = u32::try_from(quantity)
                .map_err(|_| DomainError::validation("quantity_in_stock is out of range"))?;
        }
        if let Some(category) = &patch.category {
            self.category = non_blank(Some(category));
        }
        if let Some(sku) = &patch.sku {
            self.sku = non_blank(Some(sku));
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    /// Stamp a persisted mutation on top of the version the store holds.
    /// Called by stores on every successful update.
    pub fn record_write(&mut self, stored_version: u64, now: DateTime<Utc>) {
        self.version = stored_version + 1;
        self.updated_at = now;
    }

    pub fn view(&self) -> ProductView {
        ProductView::from(self)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Create payload as received. Every field is optional here so that missing
/// required fields surface as field violations rather than parse errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity_in_stock: Option<i64>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub active: Option<bool>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal, quantity_in_stock: i64) -> Self {
        Self {
            name: Some(name.into()),
            price: Some(price),
            quantity_in_stock: Some(quantity_in_stock),
            ..Self::default()
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Check every rule and normalize into an insertable draft.
    pub fn validate(self) -> DomainResult<ProductDraft> {
        let mut v = Violations::new();

        match self.name.as_deref().map(str::trim) {
            None | Some("") => v.push("name", self.name.clone(), "name is required"),
            Some(name) => v.check_len("name", name, NAME_MIN_CHARS, NAME_MAX_CHARS),
        }
        if let Some(description) = &self.description {
            v.check_len("description", description, 0, DESCRIPTION_MAX_CHARS);
        }
        let price = match self.price {
            None => {
                v.push("price", None::<String>, "price is required");
                None
            }
            Some(p) => match Price::problem(p) {
                Some(msg) => {
                    v.push("price", p.to_string(), msg);
                    None
                }
                None => Price::new(p).ok(),
            },
        };
        let quantity = match self.quantity_in_stock {
            None => {
                v.push("quantity_in_stock", None::<i64>, "quantity_in_stock is required");
                None
            }
            Some(q) => match u32::try_from(q) {
                Ok(q) => Some(q),
                Err(_) if q < 0 => {
                    v.push("quantity_in_stock", q, "quantity_in_stock must not be negative");
                    None
                }
                Err(_) => {
                    v.push("quantity_in_stock", q, "quantity_in_stock is too large");
                    None
                }
            },
        };
        if let Some(category) = &self.category {
            v.check_len("category", category, 0, CATEGORY_MAX_CHARS);
        }
        if let Some(sku) = &self.sku {
            v.check_len("sku", sku.trim(), 0, SKU_MAX_CHARS);
        }

        v.into_result()?;
        match (self.name, price, quantity) {
            (Some(name), Some(price), Some(quantity_in_stock)) => Ok(ProductDraft {
                name: name.trim().to_string(),
                description: non_blank(self.description.as_deref()),
                price,
                quantity_in_stock,
                category: non_blank(self.category.as_deref()),
                sku: non_blank(self.sku.as_deref()),
                active: self.active.unwrap_or(true),
            }),
            _ => Err(DomainError::internal("validated product draft lost a required field")),
        }
    }
}

/// A validated create payload, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub quantity_in_stock: u32,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub active: bool,
}

/// Partial update: only present fields are applied.
///
/// Blank `description`, `category` or `sku` clear the field. When
/// `expected_version` is set, the write only succeeds against that version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity_in_stock: Option<i64>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub active: Option<bool>,
    pub expected_version: Option<u64>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        let mut v = Violations::new();

        if let Some(name) = &self.name {
            v.check_len("name", name.trim(), NAME_MIN_CHARS, NAME_MAX_CHARS);
        }
        if let Some(description) = &self.description {
            v.check_len("description", description, 0, DESCRIPTION_MAX_CHARS);
        }
        if let Some(price) = self.price {
            if let Some(msg) = Price::problem(price) {
                v.push("price", price.to_string(), msg);
            }
        }
        if let Some(q) = self.quantity_in_stock {
            if q < 0 {
                v.push("quantity_in_stock", q, "quantity_in_stock must not be negative");
            } else if u32::try_from(q).is_err() {
                v.push("quantity_in_stock", q, "quantity_in_stock is too large");
            }
        }
        if let Some(category) = &self.category {
            v.check_len("category", category, 0, CATEGORY_MAX_CHARS);
        }
        if let Some(sku) = &self.sku {
            v.check_len("sku", sku.trim(), 0, SKU_MAX_CHARS);
        }

        v.into_result()
    }

    /// The sku this patch would set, after normalization. `None` if the patch
    /// leaves the sku alone or clears it.
    pub fn normalized_sku(&self) -> Option<String> {
        non_blank(self.sku.as_deref())
    }
}

/// Outward representation of a product (responses, event payloads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub quantity_in_stock: u32,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub active: bool,
    pub available: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price,
            quantity_in_stock: p.quantity_in_stock,
            category: p.category.clone(),
            sku: p.sku.clone(),
            active: p.active,
            available: p.is_available(),
            version: p.version,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
