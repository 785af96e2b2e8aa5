use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 报表日期区间 (含首尾)
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// 每日销售汇总
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SalesDay {
    pub day: NaiveDate,
    pub receipt_count: i64,
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub profit: BigDecimal,
}

/// 单品利润
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductProfit {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: BigDecimal,
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub profit: BigDecimal,
}

/// 报表合计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTotals {
    pub revenue: BigDecimal,
    pub cost: BigDecimal,
    pub profit: BigDecimal,
    pub margin_pct: f64,
}
