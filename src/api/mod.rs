pub mod handlers;
pub mod sessions;

pub use handlers::*;
pub use sessions::SessionStore;

use crate::models::CostStructure;
use crate::service::{
    AiReceiptScanner, CatalogService, CheckoutService, PurchaseService, ReportService,
};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub purchase: Arc<PurchaseService>,
    pub checkout: Arc<CheckoutService>,
    pub reports: Arc<ReportService>,
    pub sessions: SessionStore,
    pub scanner: Option<Arc<AiReceiptScanner>>,
    pub costs: Arc<CostStructure>,
}

impl AppState {
    pub fn new(pool: PgPool, scanner: Option<AiReceiptScanner>, costs: CostStructure) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(pool.clone())),
            purchase: Arc::new(PurchaseService::new(pool.clone())),
            checkout: Arc::new(CheckoutService::new(pool.clone())),
            reports: Arc::new(ReportService::new(pool)),
            sessions: SessionStore::new(),
            scanner: scanner.map(Arc::new),
            costs: Arc::new(costs),
        }
    }
}

/// 统一响应信封
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/api/products", get(handlers::list_products).post(handlers::create_product))
        .route("/api/products/:id", axum::routing::delete(handlers::deactivate_product))
        .route("/api/products/:id/prices", post(handlers::record_price))
        .route("/api/products/:id/stock", post(handlers::adjust_stock));

    let pricing_routes = Router::new()
        .route("/api/pricing/calculate", post(handlers::calculate_price))
        .route("/api/pricing/break-even", get(handlers::break_even));

    let purchase_routes = Router::new()
        .route("/api/purchase/orders", get(sessions::recent_orders))
        .route("/api/purchase/sessions", post(sessions::create_session))
        .route("/api/purchase/sessions/scan", post(sessions::scan_session))
        .route(
            "/api/purchase/sessions/:id",
            get(sessions::get_session).delete(sessions::cancel_session),
        )
        .route("/api/purchase/sessions/:id/actions", post(sessions::session_action))
        .route("/api/purchase/sessions/:id/save", post(sessions::save_session));

    let sales_routes = Router::new()
        .route("/api/checkout", post(handlers::checkout))
        .route("/api/reports/sales", get(handlers::sales_report))
        .route("/api/reports/products", get(handlers::product_report))
        .route("/api/reports/products.csv", get(handlers::product_report_csv));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(catalog_routes)
        .merge(pricing_routes)
        .merge(purchase_routes)
        .merge(sales_routes)
        .with_state(state)
}
