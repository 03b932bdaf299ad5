//! Filters and paging over the product catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, FieldViolation};

use crate::product::Product;

/// Conjunctive filter; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub active_only: bool,
    /// Case-insensitive exact match.
    pub category: Option<String>,
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// `quantity_in_stock <= max_stock`.
    pub max_stock: Option<u32>,
    pub available_only: bool,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn available() -> Self {
        Self {
            available_only: true,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_name_containing(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    pub fn with_price_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    pub fn with_max_stock(mut self, threshold: u32) -> Self {
        self.max_stock = Some(threshold);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.active_only && !product.is_active() {
            return false;
        }
        if self.available_only && !product.is_available() {
            return false;
        }
        if let Some(category) = &self.category {
            match product.category() {
                Some(c) if c.to_lowercase() == category.to_lowercase() => {}
                _ => return false,
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !product.name().to_lowercase().contains(&fragment.to_lowercase()) {
                return false;
            }
        }
        let price = product.price().amount();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        if self.max_stock.is_some_and(|t| product.quantity_in_stock() > t) {
            return false;
        }
        true
    }
}

/// Zero-based page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

/// Listing cache key.
pub type PageKey = PageRequest;

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Build from untrusted input. Missing values fall back to page 0 and
    /// `default_size`; `size` must be within `1..=max_size`.
    pub fn checked(
        page: Option<i64>,
        size: Option<i64>,
        default_size: u32,
        max_size: u32,
    ) -> DomainResult<Self> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(i64::from(default_size));
        let mut violations = Vec::new();

        if page < 0 || page > i64::from(u32::MAX) {
            violations.push(FieldViolation::new(
                "page",
                page,
                format!("page must be between 0 and {}", u32::MAX),
            ));
        }
        if size < 1 || size > i64::from(max_size) {
            violations.push(FieldViolation::new(
                "size",
                size,
                format!("size must be between 1 and {max_size}"),
            ));
        }
        if !violations.is_empty() {
            return Err(DomainError::invalid_fields(violations));
        }
        Ok(Self::new(page as u32, size as u32))
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }

    pub fn key(&self) -> PageKey {
        *self
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages: total_items.div_ceil(size),
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
