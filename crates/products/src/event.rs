use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_events::Event;

use crate::product::ProductView;

pub const CREATED_CHANNEL: &str = "product.created";
pub const UPDATED_CHANNEL: &str = "product.updated";
pub const DELETED_CHANNEL: &str = "product.deleted";

/// Every channel product events are published on.
pub const CHANNELS: [&str; 3] = [CREATED_CHANNEL, UPDATED_CHANNEL, DELETED_CHANNEL];

/// Snapshot of a product at the moment it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanged {
    pub product: ProductView,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    Created(ProductChanged),
    Updated(ProductChanged),
    /// Soft or hard delete. For a hard delete the snapshot is the last
    /// persisted state.
    Deleted(ProductChanged),
}

impl ProductEvent {
    pub fn created(product: ProductView, occurred_at: DateTime<Utc>) -> Self {
        Self::Created(ProductChanged { product, occurred_at })
    }

    pub fn updated(product: ProductView, occurred_at: DateTime<Utc>) -> Self {
        Self::Updated(ProductChanged { product, occurred_at })
    }

    pub fn deleted(product: ProductView, occurred_at: DateTime<Utc>) -> Self {
        Self::Deleted(ProductChanged { product, occurred_at })
    }

    fn changed(&self) -> &ProductChanged {
        match self {
            Self::Created(c) | Self::Updated(c) | Self::Deleted(c) => c,
        }
    }

    pub fn product(&self) -> &ProductView {
        &self.changed().product
    }

    pub fn into_product(self) -> ProductView {
        match self {
            Self::Created(c) | Self::Updated(c) | Self::Deleted(c) => c.product,
        }
    }

    /// Entity version the event was produced at.
    pub fn sequence_number(&self) -> u64 {
        self.product().version
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => CREATED_CHANNEL,
            Self::Updated(_) => UPDATED_CHANNEL,
            Self::Deleted(_) => DELETED_CHANNEL,
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.changed().occurred_at
    }

    fn partition_key(&self) -> String {
        self.product().id.to_string()
    }
}
