use crate::db::queries_sales;
use crate::error::AppError;
use crate::models::{money, round2, ProductProfit, ReportRange, ReportTotals, SalesDay};
use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use std::io::Write;

/// 销售/利润报表服务
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn sales_by_day(&self, range: &ReportRange) -> Result<Vec<SalesDay>, AppError> {
        validate_range(range)?;
        Ok(queries_sales::sales_by_day(&self.pool, range.from, range.to).await?)
    }

    pub async fn product_profit(&self, range: &ReportRange) -> Result<Vec<ProductProfit>, AppError> {
        validate_range(range)?;
        Ok(queries_sales::product_profit(&self.pool, range.from, range.to).await?)
    }
}

fn validate_range(range: &ReportRange) -> Result<(), AppError> {
    if range.from > range.to {
        return Err(AppError::Validation(format!(
            "report range starts after it ends ({} > {})",
            range.from, range.to
        )));
    }
    Ok(())
}

/// 合计与毛利率 (营业额为零时毛利率为 0)
pub fn totals(rows: &[ProductProfit]) -> ReportTotals {
    let revenue = rows.iter().fold(BigDecimal::zero(), |acc, r| acc + &r.revenue);
    let cost = rows.iter().fold(BigDecimal::zero(), |acc, r| acc + &r.cost);
    let profit = &revenue - &cost;
    let margin_pct = if revenue.is_zero() {
        0.0
    } else {
        money::to_f64(&profit) / money::to_f64(&revenue) * 100.0
    };
    ReportTotals {
        revenue,
        cost,
        profit,
        margin_pct,
    }
}

/// 单品利润写出为 CSV
pub fn write_product_csv<W: Write>(rows: &[ProductProfit], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["product_id", "product", "quantity", "revenue", "cost", "profit"])?;

    for row in rows {
        writer.write_record(&[
            row.product_id.to_string(),
            row.product_name.clone(),
            row.quantity.to_string(),
            round2(&row.revenue).to_string(),
            round2(&row.cost).to_string(),
            round2(&row.profit).to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn rows() -> Vec<ProductProfit> {
        vec![
            ProductProfit {
                product_id: 1,
                product_name: "Appel".to_string(),
                quantity: dec("40"),
                revenue: dec("18"),
                cost: dec("8"),
                profit: dec("10"),
            },
            ProductProfit {
                product_id: 2,
                product_name: "Kaas, jong".to_string(),
                quantity: dec("1.5"),
                revenue: dec("22"),
                cost: dec("12"),
                profit: dec("10"),
            },
        ]
    }

    #[test]
    fn totals_sum_rows_and_compute_margin() {
        let t = totals(&rows());
        assert_eq!(t.revenue, dec("40"));
        assert_eq!(t.cost, dec("20"));
        assert_eq!(t.profit, dec("20"));
        assert!((t.margin_pct - 50.0).abs() < 1e-9);
        assert_eq!(totals(&[]).margin_pct, 0.0);
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let mut out = Vec::new();
        write_product_csv(&rows(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "product_id,product,quantity,revenue,cost,profit");
        assert_eq!(lines[1], "1,Appel,40,18.00,8.00,10.00");
        assert!(lines[2].starts_with("2,\"Kaas, jong\",1.5,"));
    }
}
