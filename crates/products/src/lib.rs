//! Products domain module.
//!
//! This crate contains business rules for the product catalog, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod event;
pub mod price;
pub mod product;
pub mod query;
pub mod validation;

pub use event::{CHANNELS, ProductChanged, ProductEvent};
pub use price::Price;
pub use product::{NewProduct, Product, ProductDraft, ProductPatch, ProductView};
pub use query::{Page, PageKey, PageRequest, ProductFilter};
pub use validation::positive_quantity;
