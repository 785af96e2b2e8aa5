use serde::{Deserialize, Serialize};

/// 单品定价输入 (比例均为小数, 如 0.09)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    pub purchase_cost: f64,
    pub vat_rate: f64,
    #[serde(default)]
    pub shrink_rate: f64,
    pub profit_margin_pct: f64,
    #[serde(default)]
    pub labor_minutes_per_unit: f64,
}

/// 定价结果, 显示前不取整
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResult {
    pub cost_with_shrinkage: f64,
    pub cost_markup_pct: f64,
    pub labor_cost: f64,
    pub cost_price: f64,
    pub selling_price_excl_vat: f64,
    pub selling_price_incl_vat: f64,
    pub profit_per_unit: f64,
    pub margin_pct: f64,
}

/// 月度固定成本项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCost {
    pub name: String,
    pub monthly_amount: f64,
}

/// 门店成本结构 (用于成本加成与保本计算)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostStructure {
    pub fixed_costs: Vec<FixedCost>,
    pub total_monthly_purchase: f64,
    pub work_days: u32,
    pub hourly_labor_cost: f64,
}

impl Default for CostStructure {
    fn default() -> Self {
        Self {
            fixed_costs: Vec::new(),
            total_monthly_purchase: 0.0,
            work_days: 22,
            hourly_labor_cost: 0.0,
        }
    }
}

impl CostStructure {
    pub fn total_fixed_costs(&self) -> f64 {
        self.fixed_costs.iter().map(|c| c.monthly_amount).sum()
    }
}

/// 保本结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakEven {
    pub total_fixed_costs: f64,
    pub work_days: u32,
    pub break_even_per_day: f64,
}
