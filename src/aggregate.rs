use std::collections::BTreeMap;

use crate::fields::UNKNOWN;
use crate::models::{AttendanceRecord, PeriodSummary, RiskLevel, RiskTotals};

pub type Counts = BTreeMap<String, usize>;

pub fn increment(counts: &mut Counts, key: &str) {
    let key = if key.trim().is_empty() { UNKNOWN } else { key.trim() };
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

pub fn count_by<'a, T, I, F>(items: I, key: F) -> Counts
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    let mut counts = Counts::new();
    for item in items {
        increment(&mut counts, key(item));
    }
    counts
}

pub fn risk_totals<I>(levels: I) -> RiskTotals
where
    I: IntoIterator<Item = RiskLevel>,
{
    let mut totals = RiskTotals::default();
    for level in levels {
        totals.record(level);
    }
    totals
}

pub fn payment_issues(records: &[AttendanceRecord]) -> usize {
    records.iter().filter(|record| record.has_payment_issue()).count()
}

pub fn period_summaries(periods: &[String], records: &[AttendanceRecord]) -> Vec<PeriodSummary> {
    periods
        .iter()
        .map(|name| {
            let mut sessions = 0usize;
            let mut total = 0.0;
            let mut cleared = 0usize;
            for period in records.iter().filter_map(|record| record.periods.get(name)) {
                sessions += period.weekly_scores.iter().filter(|score| **score > 0.0).count();
                total += period.monthly_total;
                if period.payment_cleared {
                    cleared += 1;
                }
            }

            PeriodSummary {
                period: name.clone(),
                sessions,
                average_monthly_total: if records.is_empty() {
                    0.0
                } else {
                    total / records.len() as f64
                },
                payments_cleared: cleared,
            }
        })
        .collect()
}
