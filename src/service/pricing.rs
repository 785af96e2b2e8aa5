use crate::models::{BreakEven, CostStructure, PricingInputs, PricingResult};
use thiserror::Error;

/// 定价计算错误 (分母为零时不再产生 Infinity/NaN)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricingError {
    #[error("total monthly purchase is zero; cost markup is undefined")]
    ZeroMonthlyPurchase,

    #[error("total monthly purchase {0} must be a finite, positive amount")]
    InvalidMonthlyPurchase(f64),

    #[error("work days is zero; break-even per day is undefined")]
    ZeroWorkDays,

    #[error("shrink rate {0} must be in [0, 1)")]
    InvalidShrinkRate(f64),

    #[error("purchase cost {0} must be a finite, non-negative amount")]
    InvalidPurchaseCost(f64),

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
}

/// 成本加成百分比 = 固定成本 / 月进货额 * 100
pub fn cost_markup_pct(costs: &CostStructure) -> Result<f64, PricingError> {
    let purchase = costs.total_monthly_purchase;
    if purchase == 0.0 {
        return Err(PricingError::ZeroMonthlyPurchase);
    }
    if !purchase.is_finite() || purchase < 0.0 {
        return Err(PricingError::InvalidMonthlyPurchase(purchase));
    }
    Ok(fixed_costs(costs)? / purchase * 100.0)
}

fn fixed_costs(costs: &CostStructure) -> Result<f64, PricingError> {
    let total = costs.total_fixed_costs();
    if !total.is_finite() {
        return Err(PricingError::NonFinite { field: "fixed_costs" });
    }
    Ok(total)
}

pub fn break_even(costs: &CostStructure) -> Result<BreakEven, PricingError> {
    if costs.work_days == 0 {
        return Err(PricingError::ZeroWorkDays);
    }
    let total_fixed_costs = fixed_costs(costs)?;
    Ok(BreakEven {
        total_fixed_costs,
        work_days: costs.work_days,
        break_even_per_day: total_fixed_costs / f64::from(costs.work_days),
    })
}

/// 定价计算器
#[derive(Debug, Clone, PartialEq)]
pub struct PricingCalculator {
    markup_pct: f64,
    labor_cost_per_minute: f64,
}

impl PricingCalculator {
    pub fn new(markup_pct: f64, hourly_labor_cost: f64) -> Self {
        Self {
            markup_pct,
            labor_cost_per_minute: hourly_labor_cost / 60.0,
        }
    }

    pub fn from_costs(costs: &CostStructure) -> Result<Self, PricingError> {
        Ok(Self::new(cost_markup_pct(costs)?, costs.hourly_labor_cost))
    }

    pub fn markup_pct(&self) -> f64 {
        self.markup_pct
    }

    pub fn calculate(&self, inputs: &PricingInputs) -> Result<PricingResult, PricingError> {
        validate(inputs)?;

        let cost_with_shrinkage = inputs.purchase_cost / (1.0 - inputs.shrink_rate);
        let labor_cost = inputs.labor_minutes_per_unit * self.labor_cost_per_minute;
        let cost_price = cost_with_shrinkage * (1.0 + self.markup_pct / 100.0) + labor_cost;
        let selling_price_excl_vat = cost_price * (1.0 + inputs.profit_margin_pct);
        let selling_price_incl_vat = selling_price_excl_vat * (1.0 + inputs.vat_rate);
        let profit_per_unit = selling_price_excl_vat - cost_price;
        let margin_pct = if inputs.purchase_cost == 0.0 {
            0.0
        } else {
            (selling_price_excl_vat - inputs.purchase_cost) / inputs.purchase_cost * 100.0
        };

        Ok(PricingResult {
            cost_with_shrinkage,
            cost_markup_pct: self.markup_pct,
            labor_cost,
            cost_price,
            selling_price_excl_vat,
            selling_price_incl_vat,
            profit_per_unit,
            margin_pct,
        })
    }
}

fn validate(inputs: &PricingInputs) -> Result<(), PricingError> {
    if !inputs.purchase_cost.is_finite() || inputs.purchase_cost < 0.0 {
        return Err(PricingError::InvalidPurchaseCost(inputs.purchase_cost));
    }
    if !(0.0..1.0).contains(&inputs.shrink_rate) {
        return Err(PricingError::InvalidShrinkRate(inputs.shrink_rate));
    }
    for (field, value) in [
        ("vat_rate", inputs.vat_rate),
        ("profit_margin_pct", inputs.profit_margin_pct),
        ("labor_minutes_per_unit", inputs.labor_minutes_per_unit),
    ] {
        if !value.is_finite() {
            return Err(PricingError::NonFinite { field });
        }
    }
    Ok(())
}
