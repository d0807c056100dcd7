//! # 持仓摊薄计算
//!
//! 给定一条已有仓位（或空仓）与一笔成交，计算新的持仓数量与
//! 成交量加权平均成本。纯函数，不触碰任何持久化。

use rust_decimal::Decimal;

use super::entity::OrderSide;

/// 金额与均价的统一小数位精度 (货币 2 位)
pub const MONEY_SCALE: u32 = 2;

/// # Summary
/// 一条仓位的最小算术视图：数量与均价。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lot {
    pub quantity: Decimal,
    pub average_price: Decimal,
}

/// # Summary
/// 摊薄计算的产出：要么是更新后的仓位，要么是"仓位已精确归零，删除记录"。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// 写回这条新的数量与均价
    Upsert(Lot),
    /// 数量精确归零，删除仓位记录
    Close,
}

/// # Logic
/// 把一笔成交套用到已有仓位上：
/// 1. 空仓 + Buy：开多，均价即成交价。
/// 2. 空仓 + Sell：开出负数量的空头仓，均价同样取成交价
///    (与买入复用同一套算术，没有独立的空头成本模型)。
/// 3. Buy：`new_qty = old_qty + qty`，均价按成交量加权
///    `(old_qty*old_avg + qty*price) / new_qty` 重算。
/// 4. Sell：`new_qty = old_qty - qty`，均价**保持不变**——
///    卖出部分的已实现盈亏不在任何地方记录，这是刻意保留的简化。
/// 5. 新数量精确等于 0 (严格相等，无容差带) 时返回 `Close`。
///
/// # Invariants
/// - `fill_quantity` 必须为正，由上游校验保证；负数会破坏加权公式。
/// - 加权均价四舍五入到 [`MONEY_SCALE`] 位。
pub fn apply_fill(
    existing: Option<Lot>,
    side: OrderSide,
    fill_quantity: Decimal,
    fill_price: Decimal,
) -> FillOutcome {
    let old = existing.unwrap_or(Lot {
        quantity: Decimal::ZERO,
        average_price: Decimal::ZERO,
    });

    match side {
        OrderSide::Buy => {
            let new_quantity = old.quantity + fill_quantity;
            // 空头仓被等量买回时数量归零，先于除法判定，避免除零
            if new_quantity.is_zero() {
                return FillOutcome::Close;
            }
            let weighted = (old.quantity * old.average_price + fill_quantity * fill_price)
                / new_quantity;
            FillOutcome::Upsert(Lot {
                quantity: new_quantity,
                average_price: weighted.round_dp(MONEY_SCALE),
            })
        }
        OrderSide::Sell => {
            let new_quantity = old.quantity - fill_quantity;
            if new_quantity.is_zero() {
                return FillOutcome::Close;
            }
            // 卖出不重算均价；空仓卖出时 old.average_price 为 0，
            // 此时开出的空头仓成本取成交价
            let average_price = if old.quantity.is_zero() {
                fill_price
            } else {
                old.average_price
            };
            FillOutcome::Upsert(Lot {
                quantity: new_quantity,
                average_price,
            })
        }
    }
}

/// # Logic
/// 一笔成交对账户余额的带符号变动：买入为负 (扣款)，卖出为正 (入账)。
/// 结果四舍五入到货币精度。
pub fn balance_delta(side: OrderSide, quantity: Decimal, price: Decimal) -> Decimal {
    let gross = (quantity * price).round_dp(MONEY_SCALE);
    match side {
        OrderSide::Buy => -gross,
        OrderSide::Sell => gross,
    }
}

/// 下单前的预估成本 (参考价 * 委托数量，货币精度)
pub fn estimated_cost(quantity: Decimal, price: Decimal) -> Decimal {
    (quantity * price).round_dp(MONEY_SCALE)
}
