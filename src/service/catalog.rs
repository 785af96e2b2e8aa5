use crate::db::queries;
use crate::error::AppError;
use crate::models::{
    money, CatalogProduct, NewPrice, NewProduct, PricingInputs, PricingResult, ProductPrice,
    ProductWithPrice,
};
use crate::service::pricing::PricingCalculator;
use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use std::str::FromStr;

/// 商品目录维护
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<ProductWithPrice>, AppError> {
        let products = queries::list_active_products(&self.pool).await?;
        let mut prices = queries::current_prices(&self.pool).await?;
        Ok(products
            .into_iter()
            .map(|product| {
                let price = prices.remove(&product.id);
                ProductWithPrice { product, price }
            })
            .collect())
    }

    pub async fn create(&self, product: &NewProduct) -> Result<CatalogProduct, AppError> {
        if product.name.trim().is_empty() {
            return Err(AppError::Validation("product name must not be empty".to_string()));
        }
        let created = queries::insert_product(&self.pool, product).await?;
        tracing::info!("新商品 {} '{}'", created.id, created.name);
        Ok(created)
    }

    pub async fn record_price(&self, product_id: i64, price: &NewPrice) -> Result<ProductPrice, AppError> {
        validate_price(price)?;
        self.require(product_id).await?;
        Ok(queries::insert_price(&self.pool, product_id, price).await?)
    }

    /// 按定价计算结果写入新售价 (取整到分)
    pub async fn apply_pricing(
        &self,
        product_id: i64,
        calculator: &PricingCalculator,
        inputs: &PricingInputs,
    ) -> Result<(PricingResult, ProductPrice), AppError> {
        let result = calculator.calculate(inputs)?;
        let price = NewPrice {
            purchase_cost: to_cents(inputs.purchase_cost, "purchase_cost")?,
            selling_price: to_cents(result.selling_price_incl_vat, "selling_price")?,
            vat_rate: rate_from_f64(inputs.vat_rate)?,
        };
        let saved = self.record_price(product_id, &price).await?;
        Ok((result, saved))
    }

    pub async fn adjust_stock(&self, product_id: i64, delta: &BigDecimal) -> Result<CatalogProduct, AppError> {
        queries::adjust_stock(&self.pool, product_id, delta)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))
    }

    pub async fn deactivate(&self, product_id: i64) -> Result<(), AppError> {
        if !queries::set_product_active(&self.pool, product_id, false).await? {
            return Err(AppError::NotFound(format!("product {product_id}")));
        }
        tracing::info!("商品 {} 已下架", product_id);
        Ok(())
    }

    async fn require(&self, product_id: i64) -> Result<CatalogProduct, AppError> {
        queries::get_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))
    }
}

fn to_cents(value: f64, field: &str) -> Result<BigDecimal, AppError> {
    money::from_f64_cents(value).ok_or_else(|| AppError::Validation(format!("{field} must be finite")))
}

/// 税率保留四位小数
fn rate_from_f64(value: f64) -> Result<BigDecimal, AppError> {
    if !value.is_finite() {
        return Err(AppError::Validation("vat_rate must be finite".to_string()));
    }
    BigDecimal::from_str(&format!("{value:.4}"))
        .map_err(|e| AppError::Validation(format!("vat_rate: {e}")))
}

pub fn validate_price(price: &NewPrice) -> Result<(), AppError> {
    if price.purchase_cost < BigDecimal::zero() {
        return Err(AppError::Validation("purchase cost must not be negative".to_string()));
    }
    if price.selling_price < BigDecimal::zero() {
        return Err(AppError::Validation("selling price must not be negative".to_string()));
    }
    if price.vat_rate < BigDecimal::zero() {
        return Err(AppError::Validation("vat rate must not be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(cost: &str, selling: &str) -> NewPrice {
        NewPrice {
            purchase_cost: BigDecimal::from_str(cost).unwrap(),
            selling_price: BigDecimal::from_str(selling).unwrap(),
            vat_rate: BigDecimal::from_str("0.09").unwrap(),
        }
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert!(validate_price(&price("1.00", "1.50")).is_ok());
        assert!(validate_price(&price("-1", "1.50")).is_err());
        assert!(validate_price(&price("1", "-0.01")).is_err());
    }

    #[test]
    fn cents_conversion_refuses_non_finite_values() {
        assert!(to_cents(f64::NAN, "selling_price").is_err());
        assert_eq!(to_cents(18.893, "x").unwrap(), BigDecimal::from_str("18.89").unwrap());
        assert_eq!(rate_from_f64(0.09).unwrap(), BigDecimal::from_str("0.09").unwrap());
    }
}
