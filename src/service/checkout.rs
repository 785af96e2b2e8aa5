use crate::db::{queries, queries_sales};
use crate::error::AppError;
use crate::models::{
    round2, CatalogProduct, CheckoutReceipt, CheckoutRequest, ProductPrice, SaleType, Unit,
};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;

/// 收银车明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub unit: Unit,
    pub quantity: BigDecimal,
    /// 含税售价
    pub unit_price: BigDecimal,
    /// 下单时的进货成本 (利润报表用)
    pub purchase_cost: BigDecimal,
    pub vat_rate: BigDecimal,
    pub line_total: BigDecimal,
}

/// 加入收银车时的价格快照
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrice {
    pub unit_price: BigDecimal,
    pub purchase_cost: BigDecimal,
    pub vat_rate: BigDecimal,
}

impl LinePrice {
    /// 损耗出库按零售价 0 计
    pub fn for_sale(price: &ProductPrice, sale_type: SaleType) -> Self {
        let unit_price = match sale_type {
            SaleType::Waste => BigDecimal::zero(),
            SaleType::Cash | SaleType::Card => price.selling_price.clone(),
        };
        Self {
            unit_price,
            purchase_cost: price.purchase_cost.clone(),
            vat_rate: price.vat_rate.clone(),
        }
    }
}

/// 收银车 (按加入顺序, 同一商品合并)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cart {
    lines: IndexMap<i64, CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入商品, 已存在则累加数量
    pub fn add(&mut self, product: &CatalogProduct, quantity: &BigDecimal, price: &LinePrice) {
        let line = self.lines.entry(product.id).or_insert_with(|| CartLine {
            product_id: product.id,
            name: product.name.clone(),
            unit: product.unit,
            quantity: BigDecimal::zero(),
            unit_price: price.unit_price.clone(),
            purchase_cost: price.purchase_cost.clone(),
            vat_rate: price.vat_rate.clone(),
            line_total: BigDecimal::zero(),
        });
        line.quantity = &line.quantity + quantity;
        line.line_total = round2(&(&line.quantity * &line.unit_price));
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total(&self) -> BigDecimal {
        self.lines
            .values()
            .fold(BigDecimal::zero(), |acc, line| acc + &line.line_total)
    }
}

/// 收银服务
pub struct CheckoutService {
    pool: PgPool,
}

impl CheckoutService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按当前售价组装收银车, 原子写入小票并扣减库存
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, AppError> {
        if request.lines.is_empty() {
            return Err(AppError::Validation("cart is empty".to_string()));
        }
        if let Some(line) = request.lines.iter().find(|l| l.quantity <= BigDecimal::zero()) {
            return Err(AppError::Validation(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }

        let catalog: HashMap<i64, CatalogProduct> = queries::list_active_products(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let prices = queries::current_prices(&self.pool).await?;

        let mut cart = Cart::new();
        for line in &request.lines {
            let product = catalog
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("product {}", line.product_id)))?;
            let price = prices
                .get(&line.product_id)
                .ok_or_else(|| AppError::Validation(format!("product '{}' has no price", product.name)))?;
            cart.add(product, &line.quantity, &LinePrice::for_sale(price, request.sale_type));
        }

        let receipt = queries_sales::create_receipt(&self.pool, request.sale_type, &cart).await?;
        tracing::info!(
            "收银完成: 小票 {}, 类型 {}, {} 行, 合计 {}",
            receipt.receipt.id,
            request.sale_type.as_str(),
            cart.line_count(),
            receipt.receipt.total
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn price(unit_price: &str, purchase_cost: &str) -> LinePrice {
        LinePrice {
            unit_price: dec(unit_price),
            purchase_cost: dec(purchase_cost),
            vat_rate: dec("0.09"),
        }
    }

    fn product(id: i64, name: &str, unit: Unit) -> CatalogProduct {
        CatalogProduct {
            id,
            name: name.to_string(),
            unit,
            active: true,
            stock_quantity: dec("10"),
        }
    }

    #[test]
    fn adding_same_product_merges_lines() {
        let mut cart = Cart::new();
        let appel = product(1, "Appel", Unit::Piece);
        cart.add(&appel, &dec("2"), &price("0.45", "0.20"));
        cart.add(&appel, &dec("3"), &price("0.45", "0.20"));
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total(), dec("2.25"));
    }

    #[test]
    fn weighed_products_round_to_cents() {
        let mut cart = Cart::new();
        let kaas = product(2, "Oude Kaas", Unit::WeightKg);
        cart.add(&kaas, &dec("0.347"), &price("18.95", "11.00"));
        assert_eq!(cart.lines().next().unwrap().line_total, dec("6.58"));
    }

    #[test]
    fn waste_lines_carry_cost_but_no_revenue() {
        let stored = ProductPrice {
            product_id: 1,
            purchase_cost: dec("0.20"),
            selling_price: dec("0.45"),
            vat_rate: dec("0.09"),
            valid_from: chrono::Utc::now(),
        };
        let waste = LinePrice::for_sale(&stored, SaleType::Waste);
        assert_eq!(waste.unit_price, dec("0"));
        assert_eq!(waste.purchase_cost, dec("0.20"));
        assert_eq!(LinePrice::for_sale(&stored, SaleType::Card).unit_price, dec("0.45"));
    }

    #[test]
    fn lines_keep_first_insertion_order() {
        let mut cart = Cart::new();
        cart.add(&product(3, "Kiwi", Unit::Piece), &dec("1"), &price("3", "1.5"));
        cart.add(&product(1, "Appel", Unit::Piece), &dec("1"), &price("1", "0.5"));
        cart.add(&product(3, "Kiwi", Unit::Piece), &dec("1"), &price("3", "1.5"));

        let ids: Vec<i64> = cart.lines().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(cart.total(), dec("7"));
    }
}
