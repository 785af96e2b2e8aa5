use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 销售类型 (写入 receipts.sale_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Cash,
    Card,
    /// 损耗出库, 不计营业额
    Waste,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Cash => "cash",
            SaleType::Card => "card",
            SaleType::Waste => "waste",
        }
    }
}

/// 收银请求
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub sale_type: SaleType,
    pub lines: Vec<CheckoutLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
    pub product_id: i64,
    pub quantity: BigDecimal,
}

/// 小票 (receipts)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Receipt {
    pub id: i64,
    pub sale_type: String,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// 小票明细 (receipt_lines)
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub product_id: i64,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub purchase_cost: BigDecimal,
    pub line_total: BigDecimal,
}

/// 收银结果
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub receipt: Receipt,
    pub lines: Vec<ReceiptLine>,
}
