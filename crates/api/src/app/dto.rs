use rust_decimal::Decimal;
use serde::Deserialize;

// -------------------------
// Request DTOs
// -------------------------
//
// Create and update bodies deserialize straight into `NewProduct` and
// `ProductPatch`; validation happens in the service.

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub quantity: Option<i64>,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceRangeParams {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i64>,
}
