//! Integration tests for the full write path.
//!
//! Tests: InventoryService → ProductStore → ReadCache → InMemoryBroker → subscriber
//!
//! Verifies:
//! - Every committed mutation reaches subscribers on its lifecycle channel
//! - Events for one product stay on one partition, in version order
//! - Concurrent stock changes never lose an update

#[cfg(test)]
mod tests {
    use core::str::FromStr;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::Value as JsonValue;

    use stockroom_core::DomainError;
    use stockroom_events::{EventBus, EventEnvelope, InMemoryBroker, partition_for};
    use stockroom_products::{NewProduct, ProductPatch};

    use crate::cache::ReadCache;
    use crate::config::AppConfig;
    use crate::publisher::ProductEventPublisher;
    use crate::service::{InventoryService, ServiceSettings};
    use crate::store::InMemoryProductStore;

    type Service = InventoryService<Arc<InMemoryProductStore>, Arc<InMemoryBroker>>;

    fn setup() -> (Arc<Service>, Arc<InMemoryBroker>) {
        let config = AppConfig::default();
        let broker = Arc::new(InMemoryBroker::new(config.channel_configs()));
        let service = InventoryService::new(
            Arc::new(InMemoryProductStore::new()),
            ReadCache::in_memory(),
            ProductEventPublisher::new(broker.clone()),
            ServiceSettings::from(&config),
        );
        (Arc::new(service), broker)
    }

    fn widget(sku: &str) -> NewProduct {
        NewProduct::new("Widget", Decimal::from_str("9.99").unwrap(), 5).with_sku(sku)
    }

    #[test]
    fn subscriber_thread_sees_every_lifecycle_event() {
        let (service, broker) = setup();

        // Subscribe BEFORE any events are published
        let (ready_tx, ready_rx) = mpsc::channel::<()>();
        let (seen_tx, seen_rx) = mpsc::channel::<EventEnvelope<JsonValue>>();
        let bus = broker.clone();
        thread::spawn(move || {
            let sub = bus.subscribe();
            let _ = ready_tx.send(());
            while let Ok(env) = sub.recv() {
                if seen_tx.send(env).is_err() {
                    break;
                }
            }
        });
        ready_rx.recv_timeout(Duration::from_secs(1)).unwrap();

        let p = service.create_product(widget("W-1")).unwrap();
        service
            .update_product(
                p.id,
                ProductPatch {
                    price: Some(Decimal::from_str("12.50").unwrap()),
                    ..ProductPatch::default()
                },
            )
            .unwrap();
        service.soft_delete(p.id).unwrap();

        let seen: Vec<EventEnvelope<JsonValue>> = (0..3)
            .map(|_| seen_rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();

        let channels: Vec<&str> = seen.iter().map(|e| e.channel()).collect();
        assert_eq!(channels, vec!["product.created", "product.updated", "product.deleted"]);
        assert!(seen.iter().all(|e| e.key() == p.id.to_string()));
        assert_eq!(seen[1].payload()["price"], "12.50");
        assert_eq!(seen[2].payload()["active"], false);
    }

    #[test]
    fn one_product_stays_on_one_partition_in_version_order() {
        let (service, broker) = setup();
        let p = service.create_product(widget("W-1")).unwrap();
        for _ in 0..4 {
            service.increase_stock(p.id, 1).unwrap();
        }

        let key = p.id.to_string();
        let partition = partition_for(&key, AppConfig::default().event_partitions);
        let records = broker.read("product.updated", partition, 0).unwrap();

        let versions: Vec<u64> = records
            .iter()
            .filter(|r| r.message.key() == key)
            .map(|r| r.message.sequence_number())
            .collect();
        assert_eq!(versions, vec![2, 3, 4, 5]);
    }

    #[test]
    fn concurrent_stock_changes_are_serialized() {
        let (service, broker) = setup();
        let p = service.create_product(widget("W-1")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                thread::spawn(move || {
                    let mut applied = 0u32;
                    for _ in 0..10 {
                        match service.increase_stock(p.id, 1) {
                            Ok(_) => applied += 1,
                            Err(DomainError::Conflict(_)) => {}
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    applied
                })
            })
            .collect();
        let applied: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        let current = service.get_product(p.id).unwrap();
        assert_eq!(current.quantity_in_stock, 5 + applied);
        assert_eq!(current.version, 1 + u64::from(applied));
        assert_eq!(
            broker.stats("product.updated").unwrap().records,
            applied as usize
        );
    }

    #[test]
    fn sku_is_free_again_after_hard_delete() {
        let (service, _broker) = setup();
        let p = service.create_product(widget("W-1")).unwrap();
        service.hard_delete(p.id).unwrap();

        let again = service.create_product(widget("W-1")).unwrap();
        assert_ne!(again.id, p.id);
        assert_eq!(service.get_by_sku("W-1").unwrap().id, again.id);
    }
}
