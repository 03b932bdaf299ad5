use std::sync::Arc;

use stockroom_infra::cache::ReadCache;
use stockroom_infra::event_bus::{BusError, ConfiguredEventBus};
use stockroom_infra::publisher::ProductEventPublisher;
use stockroom_infra::store::InMemoryProductStore;
use stockroom_infra::{AppConfig, InventoryService, ServiceSettings};

pub type ProductService = InventoryService<Arc<InMemoryProductStore>, ConfiguredEventBus>;

/// Shared application services.
pub struct AppServices {
    pub products: ProductService,
}

impl AppServices {
    pub fn event_backend(&self) -> &'static str {
        self.products.publisher().bus().backend_name()
    }
}

pub fn build_services(config: &AppConfig) -> Result<AppServices, BusError> {
    let bus = ConfiguredEventBus::from_config(config)?;
    let products = InventoryService::new(
        Arc::new(InMemoryProductStore::new()),
        ReadCache::in_memory(),
        ProductEventPublisher::new(bus),
        ServiceSettings::from(config),
    );
    Ok(AppServices { products })
}
