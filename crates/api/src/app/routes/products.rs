use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, OriginalUri, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch},
};
use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, FieldViolation, ProductId};
use stockroom_products::{NewProduct, PageRequest, ProductPatch};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/active", get(list_active))
        .route("/available", get(list_available))
        .route("/search", get(search_by_name))
        .route("/low-stock", get(low_stock))
        .route("/price-range", get(by_price_range))
        .route("/sku/:sku", get(get_by_sku))
        .route("/category/:category", get(by_category))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(soft_delete),
        )
        .route("/:id/hard", delete(hard_delete))
        .route("/:id/stock/increase", patch(increase_stock))
        .route("/:id/stock/decrease", patch(decrease_stock))
}

fn respond<T: Serialize>(result: DomainResult<T>, status: StatusCode, path: &str) -> axum::response::Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::domain_error_to_response(e, path),
    }
}

fn no_content(result: DomainResult<impl Sized>, path: &str) -> axum::response::Response {
    match result {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e, path),
    }
}

fn parse_id(raw: &str) -> DomainResult<ProductId> {
    raw.parse()
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<dto::PageParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let settings = services.products.settings();
    let result = PageRequest::checked(
        params.page,
        params.size,
        settings.default_page_size,
        settings.max_page_size,
    )
    .and_then(|page| services.products.list_products(page));
    respond(result, StatusCode::OK, uri.path())
}

pub async fn list_active(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
) -> axum::response::Response {
    respond(services.products.list_active(), StatusCode::OK, uri.path())
}

pub async fn list_available(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
) -> axum::response::Response {
    respond(services.products.list_available(), StatusCode::OK, uri.path())
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = parse_id(&id).and_then(|id| services.products.get_product(id));
    respond(result, StatusCode::OK, uri.path())
}

pub async fn get_by_sku(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(sku): Path<String>,
) -> axum::response::Response {
    respond(services.products.get_by_sku(&sku), StatusCode::OK, uri.path())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    respond(services.products.create_product(body), StatusCode::CREATED, uri.path())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let result = parse_id(&id).and_then(|id| services.products.update_product(id, body));
    respond(result, StatusCode::OK, uri.path())
}

pub async fn soft_delete(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = parse_id(&id).and_then(|id| services.products.soft_delete(id));
    no_content(result, uri.path())
}

pub async fn hard_delete(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = parse_id(&id).and_then(|id| services.products.hard_delete(id));
    no_content(result, uri.path())
}

pub async fn search_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<dto::SearchParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let name = params.name.unwrap_or_default();
    respond(services.products.search_by_name(&name), StatusCode::OK, uri.path())
}

pub async fn by_category(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(category): Path<String>,
) -> axum::response::Response {
    respond(services.products.by_category(&category), StatusCode::OK, uri.path())
}

pub async fn by_price_range(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<dto::PriceRangeParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let result = match (params.min_price, params.max_price) {
        (Some(min), Some(max)) => services.products.by_price_range(min, max),
        (min, max) => {
            let mut missing = Vec::new();
            if min.is_none() {
                missing.push(FieldViolation::new("min_price", serde_json::Value::Null, "min_price is required"));
            }
            if max.is_none() {
                missing.push(FieldViolation::new("max_price", serde_json::Value::Null, "max_price is required"));
            }
            Err(DomainError::invalid_fields(missing))
        }
    };
    respond(result, StatusCode::OK, uri.path())
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<dto::LowStockParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    respond(services.products.low_stock(params.threshold), StatusCode::OK, uri.path())
}

pub async fn increase_stock(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    body: Result<Json<dto::StockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let result = parse_id(&id)
        .and_then(|id| Ok((id, required_quantity(body.quantity)?)))
        .and_then(|(id, quantity)| services.products.increase_stock(id, quantity));
    respond(result, StatusCode::OK, uri.path())
}

pub async fn decrease_stock(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    body: Result<Json<dto::StockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e, uri.path()),
    };
    let result = parse_id(&id)
        .and_then(|id| Ok((id, required_quantity(body.quantity)?)))
        .and_then(|(id, quantity)| services.products.decrease_stock(id, quantity));
    respond(result, StatusCode::OK, uri.path())
}

fn required_quantity(quantity: Option<i64>) -> DomainResult<i64> {
    quantity.ok_or_else(|| {
        DomainError::invalid_fields(vec![FieldViolation::new(
            "quantity",
            serde_json::Value::Null,
            "quantity is required",
        )])
    })
}
