//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, cache, event bus, service)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and query parameters
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroom_infra::AppConfig;
use stockroom_infra::event_bus::BusError;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: AppConfig) -> Result<Router, BusError> {
    let services = Arc::new(services::build_services(&config)?);

    tracing::info!(
        event_backend = services.event_backend(),
        partitions = config.event_partitions,
        "services wired"
    );

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new()))
}
