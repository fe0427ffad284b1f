//! Commission models.

use serde::{Deserialize, Serialize};

/// Cost charged for filling `quantity` shares at `price`.
pub trait CommissionModel: Send + Sync + std::fmt::Debug {
    fn commission(&self, quantity: u64, price: f64) -> f64;
}

/// `max(min_commission, per_share * quantity)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerShareCommission {
    pub min_commission: f64,
    pub per_share: f64,
}

impl Default for PerShareCommission {
    fn default() -> Self {
        Self {
            min_commission: 1.0,
            per_share: 0.005,
        }
    }
}

impl CommissionModel for PerShareCommission {
    fn commission(&self, quantity: u64, _price: f64) -> f64 {
        (self.per_share * quantity as f64).max(self.min_commission)
    }
}

/// Same fee on every fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCommission {
    pub fee: f64,
}

impl CommissionModel for FlatCommission {
    fn commission(&self, _quantity: u64, _price: f64) -> f64 {
        self.fee
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroCommission;

impl CommissionModel for ZeroCommission {
    fn commission(&self, _quantity: u64, _price: f64) -> f64 {
        0.0
    }
}

/// Serializable commission selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommissionSpec {
    PerShare {
        #[serde(default = "default_min_commission")]
        min_commission: f64,
        #[serde(default = "default_per_share")]
        per_share: f64,
    },
    Flat {
        fee: f64,
    },
    Zero,
}

fn default_min_commission() -> f64 {
    PerShareCommission::default().min_commission
}

fn default_per_share() -> f64 {
    PerShareCommission::default().per_share
}

impl Default for CommissionSpec {
    fn default() -> Self {
        let d = PerShareCommission::default();
        CommissionSpec::PerShare {
            min_commission: d.min_commission,
            per_share: d.per_share,
        }
    }
}

impl CommissionSpec {
    pub fn validate(&self) -> Result<(), String> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        match *self {
            CommissionSpec::PerShare {
                min_commission,
                per_share,
            } if !ok(min_commission) || !ok(per_share) => {
                Err("per_share commission values must be finite and >= 0".into())
            }
            CommissionSpec::Flat { fee } if !ok(fee) => {
                Err("flat commission fee must be finite and >= 0".into())
            }
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn CommissionModel> {
        match *self {
            CommissionSpec::PerShare {
                min_commission,
                per_share,
            } => Box::new(PerShareCommission {
                min_commission,
                per_share,
            }),
            CommissionSpec::Flat { fee } => Box::new(FlatCommission { fee }),
            CommissionSpec::Zero => Box::new(ZeroCommission),
        }
    }
}
