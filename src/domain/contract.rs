use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Commission policy bucket a payee is enrolled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractTier {
    FreeIntro,
    FlatLow,
    PercentageCapped,
    FlatMinimal,
    ZeroFee,
}

impl ContractTier {
    pub const ALL: [ContractTier; 5] = [
        ContractTier::FreeIntro,
        ContractTier::FlatLow,
        ContractTier::PercentageCapped,
        ContractTier::FlatMinimal,
        ContractTier::ZeroFee,
    ];
}

impl fmt::Display for ContractTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractTier::FreeIntro => "free-intro",
            ContractTier::FlatLow => "flat-low",
            ContractTier::PercentageCapped => "percentage-capped",
            ContractTier::FlatMinimal => "flat-minimal",
            ContractTier::ZeroFee => "zero-fee",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Suspended,
    Cancelled,
}

/// The commission agreement in force for a payee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub payee_id: Uuid,
    pub tier: ContractTier,
    /// Settlements already processed in the period starting at `period_started_on`.
    pub settled_this_period: u32,
    pub period_started_on: NaiveDate,
    pub status: ContractStatus,
    /// Settlements already counted in the current period.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub counted_this_period: BTreeSet<Uuid>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    /// Running count for the calendar month containing `today`.
    ///
    /// A count recorded in an earlier month belongs to a closed period and reads as zero.
    pub fn settlements_in_period(&self, today: NaiveDate) -> u32 {
        if same_month(self.period_started_on, today) {
            self.settled_this_period
        } else {
            0
        }
    }

    /// Counts `settlement_id` once, opening a new period when the month has rolled over.
    ///
    /// Returns `false` when the settlement was already counted or belongs to a
    /// period that has since closed.
    pub fn record_settlement(&mut self, settlement_id: Uuid, on: NaiveDate) -> bool {
        if same_month(self.period_started_on, on) {
            if !self.counted_this_period.insert(settlement_id) {
                return false;
            }
            self.settled_this_period += 1;
        } else if on > self.period_started_on {
            self.period_started_on = on.with_day(1).unwrap_or(on);
            self.settled_this_period = 1;
            self.counted_this_period = BTreeSet::from([settlement_id]);
        } else {
            return false;
        }
        true
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}
