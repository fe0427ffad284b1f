//! Sizing policies — turn a signal's strength into a share quantity.
//!
//! The policy is chosen once per portfolio. Its `strength_contract` states
//! how strategies must fill in `SignalEvent::strength`.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Slack added before flooring so an on-target position does not trade a
/// single share on float noise.
const FLOOR_EPSILON: f64 = 1e-9;

/// How the portfolio reads `SignalEvent::strength`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthContract {
    /// Any positive strength means "act"; the magnitude is ignored.
    Conviction,
    /// Strength is the desired fraction of total equity in the symbol.
    TargetWeight,
}

/// Position sizing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Hold `floor(amount / price / lot_size) * lot_size` shares.
    FixedNotional {
        amount: f64,
        #[serde(default = "default_lot_size")]
        lot_size: u64,
    },
    /// Hold `clamp(strength, 0, max_position_fraction)` of total equity.
    WeightRebalance { max_position_fraction: f64 },
}

fn default_lot_size() -> u64 {
    1
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::FixedNotional {
            amount: 10_000.0,
            lot_size: 1,
        }
    }
}

/// Everything a policy needs to size one signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInput {
    /// Current price, already validated finite and positive.
    pub price: f64,
    pub position: i64,
    pub cash: f64,
    pub total_equity: f64,
    pub strength: f64,
}

/// Why a signal produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTrade {
    /// Strength not positive (or not a number) under a conviction contract.
    NoConviction,
    /// Already at, or above, the target.
    AtTarget,
    /// A buy was wanted but not even one unit is affordable.
    Unaffordable,
}

/// Outcome of sizing one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingDecision {
    Order {
        direction: Direction,
        quantity: u64,
        /// The wanted quantity was cut down to what cash covers.
        clipped: bool,
    },
    Skip(NoTrade),
}

impl SizingPolicy {
    pub fn strength_contract(&self) -> StrengthContract {
        match self {
            SizingPolicy::FixedNotional { .. } => StrengthContract::Conviction,
            SizingPolicy::WeightRebalance { .. } => StrengthContract::TargetWeight,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SizingPolicy::FixedNotional { .. } => "fixed_notional",
            SizingPolicy::WeightRebalance { .. } => "weight_rebalance",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            SizingPolicy::FixedNotional { amount, lot_size } => {
                if !(amount.is_finite() && amount > 0.0) {
                    return Err(format!("fixed_notional: amount must be > 0, got {amount}"));
                }
                if lot_size == 0 {
                    return Err("fixed_notional: lot_size must be >= 1".into());
                }
            }
            SizingPolicy::WeightRebalance {
                max_position_fraction,
            } => {
                if !(max_position_fraction.is_finite()
                    && max_position_fraction > 0.0
                    && max_position_fraction <= 1.0)
                {
                    return Err(format!(
                        "weight_rebalance: max_position_fraction must be in (0, 1], got {max_position_fraction}"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Size a LONG or ADJUST signal.
    pub fn size(&self, input: &SizingInput) -> SizingDecision {
        if !input.strength.is_finite() {
            return SizingDecision::Skip(NoTrade::NoConviction);
        }
        match *self {
            SizingPolicy::FixedNotional { amount, lot_size } => {
                if input.strength <= 0.0 {
                    return SizingDecision::Skip(NoTrade::NoConviction);
                }
                let target = whole_lots(amount / input.price, lot_size) as i64;
                let wanted = target - input.position;
                if wanted <= 0 {
                    return SizingDecision::Skip(NoTrade::AtTarget);
                }
                buy_within_cash(wanted as u64, input, lot_size)
            }
            SizingPolicy::WeightRebalance {
                max_position_fraction,
            } => {
                let weight = input.strength.clamp(0.0, max_position_fraction);
                let target_value = input.total_equity * weight;
                let current_value = input.position as f64 * input.price;
                let delta =
                    ((target_value - current_value) / input.price + FLOOR_EPSILON).floor() as i64;

                if delta > 0 {
                    buy_within_cash(delta as u64, input, 1)
                } else if delta < 0 && input.position > 0 {
                    let quantity = delta.unsigned_abs().min(input.position as u64);
                    SizingDecision::Order {
                        direction: Direction::Sell,
                        quantity,
                        clipped: false,
                    }
                } else {
                    SizingDecision::Skip(NoTrade::AtTarget)
                }
            }
        }
    }
}

fn whole_lots(shares: f64, lot_size: u64) -> u64 {
    if !(shares.is_finite() && shares > 0.0) {
        return 0;
    }
    let lots = (shares / lot_size as f64 + FLOOR_EPSILON).floor() as u64;
    lots * lot_size
}

fn buy_within_cash(wanted: u64, input: &SizingInput, lot_size: u64) -> SizingDecision {
    let affordable = whole_lots(input.cash / input.price, lot_size);
    let quantity = wanted.min(affordable);
    if quantity == 0 {
        return SizingDecision::Skip(NoTrade::Unaffordable);
    }
    SizingDecision::Order {
        direction: Direction::Buy,
        quantity,
        clipped: quantity < wanted,
    }
}
