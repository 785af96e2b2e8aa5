use crate::models::money::{at_least, round2};
use crate::models::CatalogProduct;
use bigdecimal::{BigDecimal, One, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 进货税率 (固定 9%)
pub fn purchase_tax_rate() -> BigDecimal {
    BigDecimal::new(9.into(), 2)
}

/// 扫描识别条目 (AI 或手工录入, 未校验)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedEntry {
    pub raw_name: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
}

/// 进货明细行
///
/// `line_total` 始终等于 `round2(total_units * unit_price)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub product_name: String,
    pub box_count: BigDecimal,
    pub units_per_box: i64,
    pub total_units: BigDecimal,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
    pub matched: bool,
}

impl LineItem {
    /// box_count、units_per_box 下限 1, unit_price 下限 0
    pub fn new(
        product: &CatalogProduct,
        box_count: BigDecimal,
        units_per_box: i64,
        unit_price: BigDecimal,
    ) -> Self {
        let box_count = at_least(&box_count, &BigDecimal::one());
        let units_per_box = units_per_box.max(1);
        let unit_price = at_least(&unit_price, &BigDecimal::zero());
        let total_units = &box_count * BigDecimal::from(units_per_box);
        let line_total = round2(&(&total_units * &unit_price));
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            box_count,
            units_per_box,
            total_units,
            unit_price,
            line_total,
            matched: true,
        }
    }

    /// 由扫描结果直接生成: 每箱 1 件, 总数 = 扫描数量
    pub fn from_scan(product: &CatalogProduct, quantity: &BigDecimal, price: &BigDecimal) -> Self {
        let unit_price = at_least(price, &BigDecimal::zero());
        let total_units = quantity.clone();
        let line_total = round2(&(&total_units * &unit_price));
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            box_count: quantity.clone(),
            units_per_box: 1,
            total_units,
            unit_price,
            line_total,
            matched: true,
        }
    }

    pub fn with_units_per_box(&self, value: i64) -> Self {
        let mut next = self.clone();
        next.units_per_box = value.max(1);
        next.total_units = &next.box_count * BigDecimal::from(next.units_per_box);
        next.recompute();
        next
    }

    /// 直接修改总数, 与 units_per_box 解耦 (箱内数量不一致时手工修正)
    pub fn with_total_units(&self, value: &BigDecimal) -> Self {
        let mut next = self.clone();
        next.total_units = at_least(value, &BigDecimal::one());
        next.recompute();
        next
    }

    fn recompute(&mut self) {
        self.line_total = round2(&(&self.total_units * &self.unit_price));
    }
}

/// 未匹配条目, 等待用户选择或跳过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedEntry {
    pub scanned_name: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub suggestions: Vec<CatalogProduct>,
}

/// 进货汇总 (每次变更后重新计算)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseTotals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_incl_tax: BigDecimal,
}

impl PurchaseTotals {
    pub fn from_items(items: &[LineItem]) -> Self {
        let subtotal = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.line_total);
        let rate = purchase_tax_rate();
        let tax = &subtotal * &rate;
        let total_incl_tax = &subtotal * (BigDecimal::one() + rate);
        Self {
            subtotal,
            tax,
            total_incl_tax,
        }
    }
}

/// 进货单 (purchase_orders)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseOrder {
    pub id: i64,
    pub supplier: Option<String>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_incl_tax: BigDecimal,
    pub line_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 已保存的进货单
#[derive(Debug, Clone, Serialize)]
pub struct SavedOrder {
    pub order_id: i64,
    pub line_count: usize,
    pub skipped_unmatched: usize,
    pub totals: PurchaseTotals,
}
