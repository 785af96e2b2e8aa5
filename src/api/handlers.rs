use crate::api::{ApiResponse, AppState};
use crate::error::AppError;
use crate::models::{
    BreakEven, CatalogProduct, CheckoutReceipt, CheckoutRequest, NewPrice, NewProduct,
    PricingInputs, PricingResult, ProductPrice, ProductProfit, ProductWithPrice, ReportRange,
    ReportTotals, SalesDay, StockAdjustment,
};
use crate::service::pricing::{self, PricingCalculator};
use crate::service::reports;
use axum::{
    extract::{Json, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

// ---- 商品目录 ----

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductWithPrice>>>, AppError> {
    let products = state.catalog.list().await?;
    Ok(ApiResponse::ok(format!("{} products", products.len()), products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<NewProduct>,
) -> Result<Json<ApiResponse<CatalogProduct>>, AppError> {
    let product = state.catalog.create(&req).await?;
    Ok(ApiResponse::ok("product created", product))
}

pub async fn record_price(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(req): Json<NewPrice>,
) -> Result<Json<ApiResponse<ProductPrice>>, AppError> {
    let price = state.catalog.record_price(product_id, &req).await?;
    Ok(ApiResponse::ok("price recorded", price))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(req): Json<StockAdjustment>,
) -> Result<Json<ApiResponse<CatalogProduct>>, AppError> {
    let product = state.catalog.adjust_stock(product_id, &req.delta).await?;
    Ok(ApiResponse::ok("stock adjusted", product))
}

pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>, AppError> {
    state.catalog.deactivate(product_id).await?;
    Ok(ApiResponse::ok("product deactivated", product_id))
}

// ---- 定价 ----

/// 定价请求: 未给出 markup_pct 时按配置的成本结构计算;
/// 给出 product_id 时把含税售价写入价格历史
#[derive(Debug, Deserialize)]
pub struct PriceCalculationRequest {
    #[serde(flatten)]
    pub inputs: PricingInputs,
    #[serde(default)]
    pub markup_pct: Option<f64>,
    #[serde(default)]
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PriceCalculationResponse {
    pub result: PricingResult,
    pub saved_price: Option<ProductPrice>,
}

pub async fn calculate_price(
    State(state): State<AppState>,
    Json(req): Json<PriceCalculationRequest>,
) -> Result<Json<ApiResponse<PriceCalculationResponse>>, AppError> {
    let calculator = match req.markup_pct {
        Some(markup) => PricingCalculator::new(markup, state.costs.hourly_labor_cost),
        None => PricingCalculator::from_costs(&state.costs)?,
    };

    let response = match req.product_id {
        Some(product_id) => {
            let (result, saved) = state
                .catalog
                .apply_pricing(product_id, &calculator, &req.inputs)
                .await?;
            PriceCalculationResponse {
                result,
                saved_price: Some(saved),
            }
        }
        None => PriceCalculationResponse {
            result: calculator.calculate(&req.inputs)?,
            saved_price: None,
        },
    };

    Ok(ApiResponse::ok("price calculated", response))
}

pub async fn break_even(State(state): State<AppState>) -> Result<Json<ApiResponse<BreakEven>>, AppError> {
    let result = pricing::break_even(&state.costs)?;
    Ok(ApiResponse::ok("break-even calculated", result))
}

// ---- 收银与报表 ----

pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutReceipt>>, AppError> {
    let receipt = state.checkout.checkout(&req).await?;
    Ok(ApiResponse::ok(
        format!("receipt {} created", receipt.receipt.id),
        receipt,
    ))
}

pub async fn sales_report(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<Json<ApiResponse<Vec<SalesDay>>>, AppError> {
    let days = state.reports.sales_by_day(&range).await?;
    Ok(ApiResponse::ok(format!("{} days", days.len()), days))
}

#[derive(Debug, Serialize)]
pub struct ProductReport {
    pub rows: Vec<ProductProfit>,
    pub totals: ReportTotals,
}

pub async fn product_report(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<Json<ApiResponse<ProductReport>>, AppError> {
    let rows = state.reports.product_profit(&range).await?;
    let totals = reports::totals(&rows);
    Ok(ApiResponse::ok(
        format!("{} products", rows.len()),
        ProductReport { rows, totals },
    ))
}

pub async fn product_report_csv(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<Response, AppError> {
    let rows = state.reports.product_profit(&range).await?;
    let mut body = Vec::new();
    reports::write_product_csv(&rows, &mut body)?;

    let disposition = format!(
        "attachment; filename=\"winst-{}-{}.csv\"",
        range.from, range.to
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
