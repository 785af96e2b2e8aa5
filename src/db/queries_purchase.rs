use crate::models::{round2, LineItem, PurchaseOrder, PurchaseTotals};
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// 写入进货单 (单事务)
///
/// 1. purchase_orders 主表
/// 2. purchase_order_lines 明细 (批量插入)
/// 3. 进货价变化时追加价格历史 (沿用当前售价)
/// 4. 库存增加 total_units
pub async fn insert_purchase_order(
    pool: &PgPool,
    supplier: Option<&str>,
    items: &[LineItem],
    totals: &PurchaseTotals,
) -> Result<i64, sqlx::Error> {
    let started = Instant::now();
    let mut tx = pool.begin().await?;

    let order_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO purchase_orders (supplier, subtotal, tax, total_incl_tax, created_at)
        VALUES ($1, $2, $3, $4, now())
        RETURNING id
        "#
    )
    .bind(supplier)
    .bind(round2(&totals.subtotal))
    .bind(round2(&totals.tax))
    .bind(round2(&totals.total_incl_tax))
    .fetch_one(&mut *tx)
    .await?;

    tracing::debug!("开始构建进货明细插入语句, {} 条记录", items.len());

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO purchase_order_lines (
            order_id, product_id, product_name,
            box_count, units_per_box, total_units,
            unit_price, line_total
        ) "
    );
    query_builder.push_values(items, |mut b, item| {
        b.push_bind(order_id)
            .push_bind(item.product_id)
            .push_bind(&item.product_name)
            .push_bind(item.box_count.clone())
            .push_bind(item.units_per_box)
            .push_bind(item.total_units.clone())
            .push_bind(item.unit_price.clone())
            .push_bind(item.line_total.clone());
    });

    // 超时控制: 30秒
    match tokio::time::timeout(Duration::from_secs(30), query_builder.build().execute(&mut *tx)).await {
        Ok(Ok(result)) => {
            tracing::debug!("✓ 明细写入 {} 行", result.rows_affected());
        }
        Ok(Err(e)) => {
            tracing::error!("✗ 进货明细写入失败, 耗时: {:?}, 错误: {:?}", started.elapsed(), e);
            return Err(e);
        }
        Err(_) => {
            tracing::error!("✗ 进货明细写入超时 (>30秒)!");
            return Err(sqlx::Error::PoolTimedOut);
        }
    }

    for item in items {
        sqlx::query(
            r#"
            INSERT INTO product_prices (product_id, purchase_cost, selling_price, vat_rate, valid_from)
            SELECT latest.product_id, $2, latest.selling_price, latest.vat_rate, now()
            FROM (
                SELECT DISTINCT ON (product_id) product_id, purchase_cost, selling_price, vat_rate
                FROM product_prices
                WHERE product_id = $1
                ORDER BY product_id, valid_from DESC
            ) latest
            WHERE latest.purchase_cost <> $2
            "#
        )
        .bind(item.product_id)
        .bind(item.unit_price.clone())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2 WHERE id = $1")
            .bind(item.product_id)
            .bind(item.total_units.clone())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!("✓ 进货单 {} 写入完成, 耗时: {:?}", order_id, started.elapsed());
    Ok(order_id)
}

/// 最近的进货单
pub async fn list_purchase_orders(pool: &PgPool, limit: i64) -> Result<Vec<PurchaseOrder>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseOrder>(
        r#"
        SELECT po.id, po.supplier, po.subtotal, po.tax, po.total_incl_tax,
               count(pol.id) as line_count,
               po.created_at
        FROM purchase_orders po
        LEFT JOIN purchase_order_lines pol ON pol.order_id = po.id
        GROUP BY po.id
        ORDER BY po.created_at DESC
        LIMIT $1
        "#
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
