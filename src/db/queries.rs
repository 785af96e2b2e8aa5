use crate::models::{CatalogProduct, NewPrice, NewProduct, ProductPrice, ProductRow};
use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use std::collections::HashMap;

/// 在售商品目录 (按名称排序)
pub async fn list_active_products(pool: &PgPool) -> Result<Vec<CatalogProduct>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, unit, active, stock_quantity
        FROM products
        WHERE active = true
        ORDER BY name, id
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CatalogProduct::from).collect())
}

/// 查询单个商品 (含已下架)
pub async fn get_product(
    pool: &PgPool,
    product_id: i64,
) -> Result<Option<CatalogProduct>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, unit, active, stock_quantity
        FROM products
        WHERE id = $1
        "#
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogProduct::from))
}

pub async fn insert_product(
    pool: &PgPool,
    product: &NewProduct,
) -> Result<CatalogProduct, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        INSERT INTO products (name, unit, active, stock_quantity)
        VALUES ($1, $2, true, $3)
        RETURNING id, name, unit, active, stock_quantity
        "#
    )
    .bind(product.name.trim())
    .bind(product.unit.as_str())
    .bind(product.stock_quantity.clone().unwrap_or_else(BigDecimal::zero))
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// 上/下架, 返回是否命中
pub async fn set_product_active(
    pool: &PgPool,
    product_id: i64,
    active: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET active = $2 WHERE id = $1")
        .bind(product_id)
        .bind(active)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 库存增减 (delta 可为负)
pub async fn adjust_stock(
    pool: &PgPool,
    product_id: i64,
    delta: &BigDecimal,
) -> Result<Option<CatalogProduct>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + $2
        WHERE id = $1
        RETURNING id, name, unit, active, stock_quantity
        "#
    )
    .bind(product_id)
    .bind(delta.clone())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogProduct::from))
}

/// 写入价格历史
pub async fn insert_price(
    pool: &PgPool,
    product_id: i64,
    price: &NewPrice,
) -> Result<ProductPrice, sqlx::Error> {
    sqlx::query_as::<_, ProductPrice>(
        r#"
        INSERT INTO product_prices (product_id, purchase_cost, selling_price, vat_rate, valid_from)
        VALUES ($1, $2, $3, $4, now())
        RETURNING product_id, purchase_cost, selling_price, vat_rate, valid_from
        "#
    )
    .bind(product_id)
    .bind(price.purchase_cost.clone())
    .bind(price.selling_price.clone())
    .bind(price.vat_rate.clone())
    .fetch_one(pool)
    .await
}

/// 每个商品的最新价格
pub async fn current_prices(pool: &PgPool) -> Result<HashMap<i64, ProductPrice>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductPrice>(
        r#"
        SELECT DISTINCT ON (product_id)
               product_id, purchase_cost, selling_price, vat_rate, valid_from
        FROM product_prices
        ORDER BY product_id, valid_from DESC
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|p| (p.product_id, p)).collect())
}
