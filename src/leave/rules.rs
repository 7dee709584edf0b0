use chrono::NaiveDate;
use serde::Serialize;

use crate::model::leave_policy::LeavePolicy;

/// The request being checked against the active policies.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub total_days: f64,
}

/// Pending and approved requests already filed in the candidate's year.
#[derive(Debug, Clone, Copy, Default)]
pub struct YearUsage {
    pub same_type: i64,
    pub all_types: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    MinNoticeDays,
    MaxConsecutiveDays,
    MaxRequestsPerYear,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub policy_id: u64,
    pub policy: String,
    pub rule: Rule,
    pub message: String,
}

pub fn applies(policy: &LeavePolicy, leave_type_id: u64) -> bool {
    policy.is_active && policy.leave_type_id.is_none_or(|id| id == leave_type_id)
}

pub fn check(
    policies: &[LeavePolicy],
    candidate: &Candidate,
    today: NaiveDate,
    usage: YearUsage,
) -> Vec<Violation> {
    let notice = (candidate.start_date - today).num_days();
    let mut violations = Vec::new();

    for policy in policies.iter().filter(|p| applies(p, candidate.leave_type_id)) {
        let mut violate = |rule: Rule, message: String| {
            violations.push(Violation {
                policy_id: policy.id,
                policy: policy.name.clone(),
                rule,
                message,
            })
        };

        if notice < i64::from(policy.min_notice_days) {
            violate(
                Rule::MinNoticeDays,
                format!(
                    "Requires at least {} days notice, got {}",
                    policy.min_notice_days, notice
                ),
            );
        }

        if let Some(max) = policy.max_consecutive_days {
            if candidate.total_days > f64::from(max) {
                violate(
                    Rule::MaxConsecutiveDays,
                    format!(
                        "At most {} consecutive days allowed, requested {}",
                        max, candidate.total_days
                    ),
                );
            }
        }

        if let Some(max) = policy.max_requests_per_year {
            let filed = if policy.leave_type_id.is_some() {
                usage.same_type
            } else {
                usage.all_types
            };
            if filed + 1 > i64::from(max) {
                violate(
                    Rule::MaxRequestsPerYear,
                    format!("At most {} requests per year allowed, {} already filed", max, filed),
                );
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn policy(id: u64, leave_type_id: Option<u64>) -> LeavePolicy {
        LeavePolicy {
            id,
            name: format!("policy-{id}"),
            description: None,
            leave_type_id,
            min_notice_days: 0,
            max_consecutive_days: None,
            max_requests_per_year: None,
            requires_approval: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn candidate(days_ahead: i64, total_days: f64) -> Candidate {
        Candidate {
            leave_type_id: 1,
            start_date: today() + chrono::Duration::days(days_ahead),
            total_days,
        }
    }

    #[test]
    fn inactive_and_foreign_policies_are_skipped() {
        let mut inactive = policy(1, Some(1));
        inactive.is_active = false;
        inactive.min_notice_days = 30;
        let mut other_type = policy(2, Some(2));
        other_type.min_notice_days = 30;

        let found = check(&[inactive, other_type], &candidate(1, 1.0), today(), YearUsage::default());
        assert!(found.is_empty());
    }

    #[test]
    fn short_notice_is_reported() {
        let mut p = policy(3, None);
        p.min_notice_days = 14;

        let found = check(&[p.clone()], &candidate(7, 1.0), today(), YearUsage::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, Rule::MinNoticeDays);
        assert_eq!(found[0].policy_id, 3);

        assert!(check(&[p], &candidate(14, 1.0), today(), YearUsage::default()).is_empty());
    }

    #[test]
    fn long_requests_are_reported() {
        let mut p = policy(4, Some(1));
        p.max_consecutive_days = Some(5);

        assert!(check(&[p.clone()], &candidate(30, 5.0), today(), YearUsage::default()).is_empty());
        let found = check(&[p], &candidate(30, 5.5), today(), YearUsage::default());
        assert_eq!(found[0].rule, Rule::MaxConsecutiveDays);
    }

    #[test]
    fn frequency_counts_by_policy_scope() {
        let mut typed = policy(5, Some(1));
        typed.max_requests_per_year = Some(2);
        let mut global = policy(6, None);
        global.max_requests_per_year = Some(4);

        let usage = YearUsage {
            same_type: 1,
            all_types: 4,
        };
        let found = check(&[typed, global], &candidate(30, 1.0), today(), usage);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].policy_id, 6);
        assert_eq!(found[0].rule, Rule::MaxRequestsPerYear);
    }
}
