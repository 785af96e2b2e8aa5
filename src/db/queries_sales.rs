use crate::models::{CheckoutReceipt, ProductProfit, Receipt, ReceiptLine, SaleType, SalesDay};
use crate::service::checkout::Cart;
use chrono::NaiveDate;
use sqlx::PgPool;

/// 收银: 小票 + 明细 + 扣库存, 单事务
pub async fn create_receipt(
    pool: &PgPool,
    sale_type: SaleType,
    cart: &Cart,
) -> Result<CheckoutReceipt, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let receipt = sqlx::query_as::<_, Receipt>(
        r#"
        INSERT INTO receipts (sale_type, total, created_at)
        VALUES ($1, $2, now())
        RETURNING id, sale_type, total, created_at
        "#
    )
    .bind(sale_type.as_str())
    .bind(cart.total())
    .fetch_one(&mut *tx)
    .await?;

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO receipt_lines (
            receipt_id, product_id, quantity,
            unit_price, purchase_cost, vat_rate, line_total
        ) "
    );
    query_builder.push_values(cart.lines(), |mut b, line| {
        b.push_bind(receipt.id)
            .push_bind(line.product_id)
            .push_bind(line.quantity.clone())
            .push_bind(line.unit_price.clone())
            .push_bind(line.purchase_cost.clone())
            .push_bind(line.vat_rate.clone())
            .push_bind(line.line_total.clone());
    });
    query_builder.build().execute(&mut *tx).await?;

    let mut lines = Vec::with_capacity(cart.line_count());
    for line in cart.lines() {
        sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $2 WHERE id = $1")
            .bind(line.product_id)
            .bind(line.quantity.clone())
            .execute(&mut *tx)
            .await?;

        lines.push(ReceiptLine {
            product_id: line.product_id,
            quantity: line.quantity.clone(),
            unit_price: line.unit_price.clone(),
            purchase_cost: line.purchase_cost.clone(),
            line_total: line.line_total.clone(),
        });
    }

    tx.commit().await?;
    Ok(CheckoutReceipt { receipt, lines })
}

/// 每日销售 (营业额不含税; 损耗只计成本)
pub async fn sales_by_day(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SalesDay>, sqlx::Error> {
    sqlx::query_as::<_, SalesDay>(
        r#"
        SELECT date(r.created_at) as day,
               count(DISTINCT r.id) FILTER (WHERE r.sale_type <> 'waste') as receipt_count,
               round(coalesce(sum(rl.line_total / (1 + rl.vat_rate)), 0), 2) as revenue,
               round(coalesce(sum(rl.quantity * rl.purchase_cost), 0), 2) as cost,
               round(coalesce(sum(rl.line_total / (1 + rl.vat_rate) - rl.quantity * rl.purchase_cost), 0), 2) as profit
        FROM receipts r
        INNER JOIN receipt_lines rl ON rl.receipt_id = r.id
        WHERE date(r.created_at) BETWEEN $1 AND $2
        GROUP BY date(r.created_at)
        ORDER BY day
        "#
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// 单品利润 (按利润降序)
pub async fn product_profit(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ProductProfit>, sqlx::Error> {
    sqlx::query_as::<_, ProductProfit>(
        r#"
        SELECT rl.product_id,
               p.name as product_name,
               coalesce(sum(rl.quantity) FILTER (WHERE r.sale_type <> 'waste'), 0) as quantity,
               round(coalesce(sum(rl.line_total / (1 + rl.vat_rate)), 0), 2) as revenue,
               round(coalesce(sum(rl.quantity * rl.purchase_cost), 0), 2) as cost,
               round(coalesce(sum(rl.line_total / (1 + rl.vat_rate) - rl.quantity * rl.purchase_cost), 0), 2) as profit
        FROM receipt_lines rl
        INNER JOIN receipts r ON r.id = rl.receipt_id
        INNER JOIN products p ON p.id = rl.product_id
        WHERE date(r.created_at) BETWEEN $1 AND $2
        GROUP BY rl.product_id, p.name
        ORDER BY profit DESC, p.name
        "#
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
