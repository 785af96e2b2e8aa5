use crate::db::{queries, queries_purchase};
use crate::error::AppError;
use crate::models::{CatalogProduct, PurchaseOrder, SavedOrder, ScannedEntry};
use crate::service::reconcile::ReconciliationSession;
use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;

/// 进货服务: 对账会话的建立与保存
pub struct PurchaseService {
    pool: PgPool,
}

impl PurchaseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 读取在售目录
    pub async fn catalog(&self) -> Result<Vec<CatalogProduct>, AppError> {
        Ok(queries::list_active_products(&self.pool).await?)
    }

    /// 按当前目录对扫描结果对账
    pub async fn start_session(
        &self,
        supplier: Option<String>,
        entries: &[ScannedEntry],
    ) -> Result<ReconciliationSession, AppError> {
        validate_entries(entries)?;
        let catalog = self.catalog().await?;
        Ok(ReconciliationSession::reconcile(supplier, entries, &catalog))
    }

    /// 保存进货单 (单事务: 进货单 + 明细 + 价格历史 + 库存)
    pub async fn save(
        &self,
        session: &ReconciliationSession,
        confirm_unmatched: bool,
    ) -> Result<SavedOrder, AppError> {
        let plan = session.prepare_save(confirm_unmatched)?;
        if plan.skipped_unmatched > 0 {
            tracing::warn!(
                "保存进货单时跳过 {} 条未匹配条目 (已确认)",
                plan.skipped_unmatched
            );
        }

        let order_id = queries_purchase::insert_purchase_order(
            &self.pool,
            plan.supplier,
            plan.items,
            &plan.totals,
        )
        .await?;

        tracing::info!(
            "进货单 {} 已保存: {} 行, 小计 {}",
            order_id,
            plan.items.len(),
            plan.totals.subtotal
        );

        Ok(SavedOrder {
            order_id,
            line_count: plan.items.len(),
            skipped_unmatched: plan.skipped_unmatched,
            totals: plan.totals,
        })
    }

    /// 最近的进货单 (新的在前)
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<PurchaseOrder>, AppError> {
        Ok(queries_purchase::list_purchase_orders(&self.pool, limit).await?)
    }
}

/// 手工录入条目校验 (调用数据库前)
pub fn validate_entries(entries: &[ScannedEntry]) -> Result<(), AppError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.raw_name.trim().is_empty() {
            return Err(AppError::Validation(format!("entry {index}: name is required")));
        }
        if entry.quantity <= BigDecimal::zero() {
            return Err(AppError::Validation(format!(
                "entry {index}: quantity must be positive"
            )));
        }
        if entry.unit_price < BigDecimal::zero() {
            return Err(AppError::Validation(format!(
                "entry {index}: price must not be negative"
            )));
        }
    }
    Ok(())
}
