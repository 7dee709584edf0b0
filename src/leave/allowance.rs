use serde::Serialize;

use crate::leave::round1;
use crate::model::company_settings::CompanySettings;
use crate::model::leave_allowance::LeaveAllowance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningBalance {
    pub total_days: f64,
    pub carried_over: f64,
}

/// Budget for a user's first allowance row of a year. Unused days from the
/// previous year roll over up to the company cap.
pub fn opening_balance(settings: &CompanySettings, previous: Option<&LeaveAllowance>) -> OpeningBalance {
    let carried_over = match previous {
        Some(prev) if settings.allow_carry_over => remaining(prev)
            .min(f64::from(settings.max_carry_over_days))
            .max(0.0),
        _ => 0.0,
    };

    OpeningBalance {
        total_days: f64::from(settings.default_annual_leave_days),
        carried_over,
    }
}

pub fn remaining(allowance: &LeaveAllowance) -> f64 {
    allowance.total_days + allowance.carried_over - allowance.used_days
}

/// Share of the budget used, in percent with one decimal.
pub fn utilization_rate(total_days: f64, carried_over: f64, used_days: f64) -> f64 {
    let budget = total_days + carried_over;
    if budget > 0.0 {
        round1(used_days / budget * 100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceView {
    #[serde(flatten)]
    pub allowance: LeaveAllowance,
    pub remaining_days: f64,
    pub utilization_rate: f64,
}

impl From<LeaveAllowance> for AllowanceView {
    fn from(allowance: LeaveAllowance) -> Self {
        Self {
            remaining_days: remaining(&allowance),
            utilization_rate: utilization_rate(
                allowance.total_days,
                allowance.carried_over,
                allowance.used_days,
            ),
            allowance,
        }
    }
}
