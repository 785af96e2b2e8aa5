use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use std::str::FromStr;

/// 金额保留两位小数 (四舍五入, 远离零)
pub fn round2(value: &BigDecimal) -> BigDecimal {
    let half = BigDecimal::new(5.into(), 1);
    let shifted = value.clone() * BigDecimal::from(100);
    let adjusted = if shifted < BigDecimal::zero() {
        shifted - half
    } else {
        shifted + half
    };
    // with_scale 截断 (向零取整)
    let (cents, _) = adjusted.with_scale(0).as_bigint_and_exponent();
    BigDecimal::new(cents, 2)
}

/// f64 价格转金额, 非有限值返回 None
pub fn from_f64_cents(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&format!("{value:.6}"))
        .ok()
        .map(|v| round2(&v))
}

pub fn to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// 下限截断: max(value, floor)
pub fn at_least(value: &BigDecimal, floor: &BigDecimal) -> BigDecimal {
    if value < floor {
        floor.clone()
    } else {
        value.clone()
    }
}
