use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 计量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Piece,
    WeightKg,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "PIECE",
            Unit::WeightKg => "WEIGHT_KG",
        }
    }

    /// 数据库文本值, 未知值按件计
    pub fn from_db(value: &str) -> Self {
        match value {
            "WEIGHT_KG" => Unit::WeightKg,
            _ => Unit::Piece,
        }
    }
}

/// 商品目录快照 (只读)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    pub unit: Unit,
    pub active: bool,
    pub stock_quantity: BigDecimal,
}

/// products 表行
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub active: bool,
    pub stock_quantity: BigDecimal,
}

impl From<ProductRow> for CatalogProduct {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            unit: Unit::from_db(&row.unit),
            active: row.active,
            stock_quantity: row.stock_quantity,
        }
    }
}

/// 新建商品请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit: Unit,
    #[serde(default)]
    pub stock_quantity: Option<BigDecimal>,
}

/// 价格历史 (product_prices)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductPrice {
    pub product_id: i64,
    pub purchase_cost: BigDecimal,
    pub selling_price: BigDecimal,
    pub vat_rate: BigDecimal,
    pub valid_from: DateTime<Utc>,
}

/// 新价格请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrice {
    pub purchase_cost: BigDecimal,
    pub selling_price: BigDecimal,
    pub vat_rate: BigDecimal,
}

/// 商品 + 当前价格 (列表接口)
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithPrice {
    #[serde(flatten)]
    pub product: CatalogProduct,
    pub price: Option<ProductPrice>,
}

/// 库存调整请求
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub delta: BigDecimal,
}
