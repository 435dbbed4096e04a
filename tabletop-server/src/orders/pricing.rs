//! Order pricing
//!
//! 纯函数：总价 = Σ (单价 + Σ 规格加价) × 数量。所有金额为整数分，溢出视为校验失败。

use std::collections::HashSet;

use shared::models::{Modifier, ModifierOption};
use shared::order::ModifierSelection;

use super::error::{OrderError, OrderResult};

/// Per-unit delta of a modifier selection on one line
///
/// 校验：规格必须属于该菜品，选项必须属于该规格，且每个规格至少选一个、不可重复。
pub fn modifier_delta(
    line: usize,
    selection: &ModifierSelection,
    modifiers: &[Modifier],
    options: &[ModifierOption],
) -> OrderResult<i64> {
    let invalid = |reason: String| OrderError::ModifierInvalid { line, reason };
    let mut delta: i64 = 0;

    for (modifier_id, option_ids) in selection {
        if !modifiers.iter().any(|m| m.id == *modifier_id) {
            return Err(invalid(format!(
                "modifier {modifier_id} does not belong to this item"
            )));
        }
        if option_ids.is_empty() {
            return Err(invalid(format!("modifier {modifier_id} has no option selected")));
        }

        let mut seen = HashSet::with_capacity(option_ids.len());
        for option_id in option_ids {
            if !seen.insert(*option_id) {
                return Err(invalid(format!("option {option_id} selected twice")));
            }
            let option = options
                .iter()
                .find(|o| o.id == *option_id && o.modifier_id == *modifier_id)
                .ok_or_else(|| {
                    invalid(format!(
                        "option {option_id} does not belong to modifier {modifier_id}"
                    ))
                })?;
            delta = delta
                .checked_add(option.price_delta_cents)
                .ok_or_else(|| invalid("modifier delta overflow".into()))?;
        }
    }

    Ok(delta)
}

/// (unit + delta) × quantity
pub fn line_total(line: usize, unit_price_cents: i64, delta_cents: i64, quantity: i64) -> OrderResult<i64> {
    if quantity < 1 {
        return Err(OrderError::InvalidQuantity { line });
    }
    let unit = unit_price_cents
        .checked_add(delta_cents)
        .ok_or_else(|| OrderError::Validation(format!("line {line}: price overflow")))?;
    if unit < 0 {
        return Err(OrderError::Validation(format!(
            "line {line}: unit price with modifiers is negative"
        )));
    }
    unit.checked_mul(quantity)
        .ok_or_else(|| OrderError::Validation(format!("line {line}: price overflow")))
}

/// Σ line totals
pub fn order_total(line_totals: &[i64]) -> OrderResult<i64> {
    line_totals
        .iter()
        .try_fold(0i64, |acc, t| acc.checked_add(*t))
        .ok_or_else(|| OrderError::Validation("order total overflow".into()))
}
