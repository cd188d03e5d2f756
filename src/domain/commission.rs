//! Tiered-contract commission model.
//!
//! Everything here is a pure function of the contract, the price and the
//! calendar date, so it can be exercised without any store or gateway.

use crate::domain::contract::{Contract, ContractTier};
use crate::domain::money::{Money, Price};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How a tier charges once its free allotment is used up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FeeRule {
    None,
    Flat { amount: Money },
    PercentageCapped { rate: Decimal, cap: Money },
}

impl FeeRule {
    fn charge(&self, total: Money) -> Money {
        match self {
            FeeRule::None => Money::ZERO,
            FeeRule::Flat { amount } => amount.round_minor(),
            FeeRule::PercentageCapped { rate, cap } => total.times_rate(*rate).min(cap.round_minor()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Leading settlements per period that carry no commission.
    #[serde(default)]
    pub free_allotment: u32,
    pub fee: FeeRule,
}

impl TierPolicy {
    /// Commission on the `nth` settlement of the period (1-based).
    pub fn commission(&self, nth: u32, total: Money) -> Money {
        if nth <= self.free_allotment {
            Money::ZERO
        } else {
            self.fee.charge(total)
        }
    }
}

/// One policy per tier, so a lookup can never miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TierTable {
    pub free_intro: TierPolicy,
    pub flat_low: TierPolicy,
    pub percentage_capped: TierPolicy,
    pub flat_minimal: TierPolicy,
    pub zero_fee: TierPolicy,
}

impl TierTable {
    pub fn for_tier(&self, tier: ContractTier) -> &TierPolicy {
        match tier {
            ContractTier::FreeIntro => &self.free_intro,
            ContractTier::FlatLow => &self.flat_low,
            ContractTier::PercentageCapped => &self.percentage_capped,
            ContractTier::FlatMinimal => &self.flat_minimal,
            ContractTier::ZeroFee => &self.zero_fee,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        let capped = TierPolicy {
            free_allotment: 3,
            fee: FeeRule::PercentageCapped {
                rate: dec!(0.08),
                cap: Money::new(dec!(6.00)),
            },
        };
        Self {
            free_intro: TierPolicy {
                free_allotment: 0,
                fee: FeeRule::Flat {
                    amount: Money::new(dec!(3.00)),
                },
            },
            flat_low: capped.clone(),
            percentage_capped: capped,
            flat_minimal: TierPolicy {
                free_allotment: 0,
                fee: FeeRule::Flat {
                    amount: Money::new(dec!(1.50)),
                },
            },
            zero_fee: TierPolicy {
                free_allotment: 0,
                fee: FeeRule::None,
            },
        }
    }
}

/// Processing fee the gateway withholds: `total * rate + fixed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFeeSchedule {
    pub rate: Decimal,
    pub fixed: Money,
}

impl GatewayFeeSchedule {
    pub fn fee(&self, total: Money) -> Money {
        (total.times_rate(self.rate) + self.fixed).round_minor()
    }
}

impl Default for GatewayFeeSchedule {
    fn default() -> Self {
        Self {
            rate: dec!(0.014),
            fixed: Money::new(dec!(0.25)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionPolicy {
    pub tiers: TierTable,
    pub gateway_fee: GatewayFeeSchedule,
}

/// Split of one transaction between platform, gateway and payee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionBreakdown {
    pub total: Money,
    pub platform_commission: Money,
    pub gateway_fee: Money,
    /// Not clamped: may be negative when the price is below the gateway surcharge.
    pub payee_net: Money,
}

impl CommissionBreakdown {
    pub fn is_balanced(&self) -> bool {
        let sum = self.platform_commission + self.gateway_fee + self.payee_net;
        (sum.value() - self.total.value()).abs() <= dec!(0.01)
    }
}

impl CommissionPolicy {
    /// Quotes a settlement for `tier`, given how many settlements the payee
    /// already has this period. `None` means no active contract.
    pub fn quote_tier(
        &self,
        tier: Option<ContractTier>,
        already_settled: u32,
        total: Money,
    ) -> CommissionBreakdown {
        let platform_commission = tier
            .map(|tier| {
                self.tiers
                    .for_tier(tier)
                    .commission(already_settled.saturating_add(1), total)
            })
            .unwrap_or(Money::ZERO);
        let gateway_fee = self.gateway_fee.fee(total);

        CommissionBreakdown {
            total,
            platform_commission,
            gateway_fee,
            payee_net: total - platform_commission - gateway_fee,
        }
    }

    /// Quotes against the payee's contract; inactive contracts are ignored.
    pub fn quote(
        &self,
        contract: Option<&Contract>,
        total: Price,
        today: NaiveDate,
    ) -> CommissionBreakdown {
        match contract.filter(|c| c.is_active()) {
            Some(contract) => self.quote_tier(
                Some(contract.tier),
                contract.settlements_in_period(today),
                total.money(),
            ),
            None => self.quote_tier(None, 0, total.money()),
        }
    }
}
