use crate::models::{CatalogProduct, LineItem, PurchaseTotals, ScannedEntry, UnmatchedEntry};
use crate::service::matcher;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("unmatched entry {index} does not exist ({len} open)")]
    UnmatchedIndex { index: usize, len: usize },

    #[error("line item {index} does not exist ({len} lines)")]
    LineIndex { index: usize, len: usize },

    #[error("product {0} not found in catalog")]
    ProductNotFound(i64),
}

/// 保存前检查
#[derive(Debug, Error, PartialEq)]
pub enum SaveError {
    #[error("no line items to save")]
    NoLineItems,

    /// 非错误, 用户确认后可继续
    #[error("{count} scanned item(s) are still unmatched; confirm to save without them")]
    UnconfirmedUnmatched { count: usize },
}

/// 进货对账会话
///
/// 每个操作都返回新的会话, 失败时原会话不变.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSession {
    pub supplier: Option<String>,
    pub matched: Vec<LineItem>,
    pub unmatched: Vec<UnmatchedEntry>,
}

/// 通过检查的保存计划
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan<'a> {
    pub supplier: Option<&'a str>,
    pub items: &'a [LineItem],
    pub totals: PurchaseTotals,
    pub skipped_unmatched: usize,
}

impl ReconciliationSession {
    pub fn new(supplier: Option<String>) -> Self {
        Self {
            supplier,
            matched: Vec::new(),
            unmatched: Vec::new(),
        }
    }

    /// 扫描结果分区: 精确匹配 -> 包含匹配 -> 模糊候选
    pub fn reconcile(
        supplier: Option<String>,
        entries: &[ScannedEntry],
        catalog: &[CatalogProduct],
    ) -> Self {
        let mut session = Self::new(supplier);

        for entry in entries {
            let hit = matcher::find_exact(&entry.raw_name, catalog)
                .or_else(|| matcher::find_containing(&entry.raw_name, catalog));

            match hit {
                Some(product) => {
                    session
                        .matched
                        .push(LineItem::from_scan(product, &entry.quantity, &entry.unit_price));
                }
                None => {
                    session.unmatched.push(UnmatchedEntry {
                        scanned_name: entry.raw_name.clone(),
                        quantity: entry.quantity.clone(),
                        price: entry.unit_price.clone(),
                        suggestions: matcher::find_candidates(&entry.raw_name, catalog),
                    });
                }
            }
        }

        tracing::info!(
            "对账完成: {} 条扫描, 已匹配 {}, 未匹配 {}",
            entries.len(),
            session.matched.len(),
            session.unmatched.len()
        );

        session
    }

    /// 用户为未匹配条目选定商品
    pub fn select_match(&self, index: usize, product: &CatalogProduct) -> Result<Self, ReconcileError> {
        let entry = self.unmatched_at(index)?;
        let mut next = self.clone();
        next.matched
            .push(LineItem::from_scan(product, &entry.quantity, &entry.price));
        next.unmatched.remove(index);
        Ok(next)
    }

    /// 跳过未匹配条目 (不计入合计, 不保存)
    pub fn skip_unmatched(&self, index: usize) -> Result<Self, ReconcileError> {
        self.unmatched_at(index)?;
        let mut next = self.clone();
        next.unmatched.remove(index);
        Ok(next)
    }

    pub fn add_manual_line_item(
        &self,
        product: &CatalogProduct,
        box_count: BigDecimal,
        units_per_box: i64,
        unit_price: BigDecimal,
    ) -> Self {
        let mut next = self.clone();
        next.matched
            .push(LineItem::new(product, box_count, units_per_box, unit_price));
        next
    }

    pub fn update_units_per_box(&self, index: usize, value: i64) -> Result<Self, ReconcileError> {
        let item = self.line_at(index)?;
        let mut next = self.clone();
        next.matched[index] = item.with_units_per_box(value);
        Ok(next)
    }

    pub fn update_total_units(&self, index: usize, value: &BigDecimal) -> Result<Self, ReconcileError> {
        let item = self.line_at(index)?;
        let mut next = self.clone();
        next.matched[index] = item.with_total_units(value);
        Ok(next)
    }

    pub fn totals(&self) -> PurchaseTotals {
        PurchaseTotals::from_items(&self.matched)
    }

    /// 保存前检查: 无明细直接拒绝; 有未匹配条目需用户确认
    pub fn prepare_save(&self, confirm_unmatched: bool) -> Result<SavePlan<'_>, SaveError> {
        if self.matched.is_empty() {
            return Err(SaveError::NoLineItems);
        }
        if !self.unmatched.is_empty() && !confirm_unmatched {
            return Err(SaveError::UnconfirmedUnmatched {
                count: self.unmatched.len(),
            });
        }
        Ok(SavePlan {
            supplier: self.supplier.as_deref(),
            items: &self.matched,
            totals: self.totals(),
            skipped_unmatched: self.unmatched.len(),
        })
    }

    fn unmatched_at(&self, index: usize) -> Result<&UnmatchedEntry, ReconcileError> {
        self.unmatched.get(index).ok_or(ReconcileError::UnmatchedIndex {
            index,
            len: self.unmatched.len(),
        })
    }

    fn line_at(&self, index: usize) -> Result<&LineItem, ReconcileError> {
        self.matched.get(index).ok_or(ReconcileError::LineIndex {
            index,
            len: self.matched.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{round2, Unit};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn catalog(names: &[&str]) -> Vec<CatalogProduct> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| CatalogProduct {
                id: i as i64 + 1,
                name: name.to_string(),
                unit: Unit::Piece,
                active: true,
                stock_quantity: dec("0"),
            })
            .collect()
    }

    fn scan(name: &str, quantity: &str, price: &str) -> ScannedEntry {
        ScannedEntry {
            raw_name: name.to_string(),
            quantity: dec(quantity),
            unit_price: dec(price),
        }
    }

    fn assert_line_invariant(session: &ReconciliationSession) {
        for item in &session.matched {
            assert_eq!(item.line_total, round2(&(&item.total_units * &item.unit_price)));
        }
    }

    #[test]
    fn containment_match_builds_line_item() {
        let products = catalog(&["Bio Bananen"]);
        let session = ReconciliationSession::reconcile(None, &[scan("bananen", "3", "1.2")], &products);
        assert_eq!(session.matched.len(), 1);
        let item = &session.matched[0];
        assert_eq!(item.product_id, 1);
        assert_eq!(item.units_per_box, 1);
        assert_eq!(item.total_units, dec("3"));
        assert_eq!(item.line_total, dec("3.60"));
        assert!(session.unmatched.is_empty());
    }

    #[test]
    fn exact_match_short_circuits_fuzzy() {
        let products = catalog(&["Appelsap", "Appel"]);
        let session = ReconciliationSession::reconcile(None, &[scan("appel", "1", "0.5")], &products);
        assert_eq!(session.matched[0].product_name, "Appel");
        assert!(session.unmatched.is_empty());
    }

    #[test]
    fn containment_takes_first_catalog_hit() {
        let products = catalog(&["Appelsap", "Appeltaart"]);
        let session = ReconciliationSession::reconcile(None, &[scan("appel", "1", "0.5")], &products);
        assert_eq!(session.matched[0].product_name, "Appelsap");
    }

    #[test]
    fn reconcile_is_a_total_partition() {
        let products = catalog(&["Prei", "Wortel", "Ui Geel"]);
        let entries = vec![
            scan("prei", "2", "0.9"),
            scan("wortl bos", "1", "1.5"),
            scan("broccoli", "4", "1.1"),
            scan("rode ui", "3", "0.4"),
        ];
        let session = ReconciliationSession::reconcile(None, &entries, &products);
        assert_eq!(session.matched.len() + session.unmatched.len(), entries.len());
        assert_eq!(session.unmatched[0].scanned_name, "wortl bos");
        assert_eq!(session.unmatched[0].suggestions[0].name, "Wortel");
        assert_line_invariant(&session);
    }

    #[test]
    fn select_match_moves_entry_with_scanned_values() {
        let products = catalog(&["Spruiten"]);
        let session = ReconciliationSession::reconcile(None, &[scan("kool", "2", "1.25")], &products);
        assert_eq!(session.unmatched.len(), 1);

        let next = session.select_match(0, &products[0]).unwrap();
        assert!(next.unmatched.is_empty());
        assert_eq!(next.matched[0].total_units, dec("2"));
        assert_eq!(next.matched[0].line_total, dec("2.50"));
        // 原会话不变
        assert_eq!(session.unmatched.len(), 1);
    }

    #[test]
    fn skip_removes_only_the_given_index() {
        let products = catalog(&["Spruiten"]);
        let entries = vec![scan("aaa", "1", "1"), scan("bbb", "1", "1"), scan("ccc", "1", "1")];
        let session = ReconciliationSession::reconcile(None, &entries, &products);

        let next = session.skip_unmatched(1).unwrap();
        let names: Vec<_> = next.unmatched.iter().map(|u| u.scanned_name.as_str()).collect();
        assert_eq!(names, vec!["aaa", "ccc"]);
        assert_eq!(next.unmatched[1], session.unmatched[2]);
    }

    #[test]
    fn out_of_range_index_leaves_session_untouched() {
        let session = ReconciliationSession::new(None);
        assert_eq!(
            session.skip_unmatched(0),
            Err(ReconcileError::UnmatchedIndex { index: 0, len: 0 })
        );
        assert_eq!(
            session.update_units_per_box(3, 6),
            Err(ReconcileError::LineIndex { index: 3, len: 0 })
        );
    }

    #[test]
    fn edits_keep_line_totals_consistent() {
        let products = catalog(&["Melk"]);
        let session = ReconciliationSession::new(None)
            .add_manual_line_item(&products[0], dec("3"), 0, dec("0.99"));
        assert_eq!(session.matched[0].units_per_box, 1);

        let session = session.update_units_per_box(0, 6).unwrap();
        assert_eq!(session.matched[0].total_units, dec("18"));
        let session = session.update_total_units(0, &dec("17")).unwrap();
        assert_eq!(session.matched[0].units_per_box, 6);
        assert_eq!(session.matched[0].line_total, dec("16.83"));
        assert_line_invariant(&session);
    }

    #[test]
    fn totals_follow_matched_items_only() {
        let products = catalog(&["Melk"]);
        let session = ReconciliationSession::reconcile(
            None,
            &[scan("melk", "10", "1"), scan("kaas", "1", "5")],
            &products,
        );
        let totals = session.totals();
        assert_eq!(totals.subtotal, dec("10"));
        assert_eq!(totals.tax, dec("0.9"));
        assert_eq!(totals.total_incl_tax, dec("10.9"));
    }

    #[test]
    fn save_rejects_empty_session_regardless_of_unmatched() {
        let products = catalog(&["Melk"]);
        let session = ReconciliationSession::reconcile(None, &[scan("kaas", "1", "5")], &products);
        assert_eq!(session.prepare_save(true), Err(SaveError::NoLineItems));
        assert_eq!(session.prepare_save(false), Err(SaveError::NoLineItems));
    }

    #[test]
    fn save_with_unmatched_requires_confirmation() {
        let products = catalog(&["Melk"]);
        let session = ReconciliationSession::reconcile(
            Some("Groothandel Jansen".to_string()),
            &[scan("melk", "1", "1"), scan("kaas", "1", "5")],
            &products,
        );
        assert_eq!(
            session.prepare_save(false),
            Err(SaveError::UnconfirmedUnmatched { count: 1 })
        );
        let plan = session.prepare_save(true).unwrap();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.skipped_unmatched, 1);
        assert_eq!(plan.supplier, Some("Groothandel Jansen"));
    }
}
