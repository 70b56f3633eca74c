use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::aggregate::Counts;
use crate::models::{
    AttendanceRecord, ObservationAnalysis, ObservationRecord, RiskTotals, TrackerAnalysis,
};

pub fn rank_attendance(records: &[AttendanceRecord]) -> Vec<&AttendanceRecord> {
    let mut ranked: Vec<&AttendanceRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        a.risk_level.cmp(&b.risk_level).then(
            a.attendance_rate
                .partial_cmp(&b.attendance_rate)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    ranked
}

pub fn rank_observations(records: &[ObservationRecord]) -> Vec<&ObservationRecord> {
    let mut ranked: Vec<&ObservationRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        a.risk_level.cmp(&b.risk_level).then(
            b.low_score_percent
                .partial_cmp(&a.low_score_percent)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    ranked
}

pub fn tracker_report(
    analysis: &TrackerAnalysis,
    limit: usize,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Fellow Attendance Report");
    let _ = writeln!(
        output,
        "Generated {} for {} fellows ({} rows skipped)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        analysis.records.len(),
        analysis.skipped_rows
    );
    let _ = writeln!(output);
    write_risk_totals(&mut output, &analysis.risk_totals);
    let _ = writeln!(
        output,
        "- Fellows with payment issues: {}",
        analysis.payment_issues
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Fellows");
    if analysis.records.is_empty() {
        let _ = writeln!(output, "No fellows found in the tracker.");
    } else {
        for record in rank_attendance(&analysis.records).iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} ({}, coach {}) {}: attendance {:.1}% across {} sessions, avg score {:.2}",
                record.full_name,
                record.school,
                record.coach,
                record.risk_level,
                record.attendance_rate,
                record.total_sessions,
                record.average_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Attendance");
    for period in &analysis.periods {
        let _ = writeln!(
            output,
            "- {}: {} sessions, avg monthly total {:.1}, {} payments cleared",
            period.period, period.sessions, period.average_monthly_total, period.payments_cleared
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Payment Issues");
    let unpaid: Vec<&AttendanceRecord> = analysis
        .records
        .iter()
        .filter(|record| record.has_payment_issue())
        .collect();
    if unpaid.is_empty() {
        let _ = writeln!(output, "All payments cleared.");
    } else {
        for record in unpaid.iter().take(limit) {
            let _ = writeln!(
                output,
                "- {}: {}",
                record.full_name,
                record.unpaid_periods().join(", ")
            );
        }
    }

    write_counts(&mut output, "Fellows by Coach", &analysis.by_coach);
    write_counts(&mut output, "Fellows by State", &analysis.by_state);
    write_counts(&mut output, "Fellows by School", &analysis.by_school);
    write_counts(&mut output, "Fellows by Fellowship Path", &analysis.by_fellowship_path);
    write_counts(&mut output, "Fellows by Gender", &analysis.by_gender);

    output
}

pub fn observation_report(
    analysis: &ObservationAnalysis,
    limit: usize,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Classroom Observation Report");
    let _ = writeln!(
        output,
        "Generated {} for {} fellows across {} sessions ({} rows skipped)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        analysis.records.len(),
        analysis.sessions,
        analysis.skipped_rows
    );
    let _ = writeln!(output);
    write_risk_totals(&mut output, &analysis.risk_totals);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Fellows");
    if analysis.records.is_empty() {
        let _ = writeln!(output, "No observations recorded.");
    } else {
        for record in rank_observations(&analysis.records).iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) {}: avg score {:.2} over {} sessions, {} warnings",
                record.name,
                record.school,
                record.region,
                record.risk_level,
                record.average_score,
                record.sessions,
                record.warning_count
            );
            if !record.warnings.is_empty() {
                let _ = writeln!(output, "  - {}", record.warnings.join("; "));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Distributions");
    for distribution in &analysis.distributions {
        let cells: Vec<String> = distribution
            .counts
            .iter()
            .map(|(rating, count)| format!("{rating}: {count}"))
            .collect();
        let _ = writeln!(
            output,
            "- {} ({:?}): {}",
            distribution.area,
            distribution.kind,
            cells.join(", ")
        );
    }

    write_counts(&mut output, "Holistic Outcome Evidence", &analysis.outcome_evidence);
    write_counts(&mut output, "Leadership Mindset Evidence", &analysis.mindset_evidence);
    write_counts(&mut output, "Dominant Mindsets", &analysis.dominant_mindsets);
    write_counts(&mut output, "Fellows by Region", &analysis.by_region);
    write_counts(&mut output, "Fellows by School", &analysis.by_school);
    write_counts(&mut output, "Fellows by Subject", &analysis.by_subject);
    write_counts(&mut output, "Sessions by Observer", &analysis.by_observer);

    output
}

fn write_risk_totals(output: &mut String, totals: &RiskTotals) {
    let _ = writeln!(output, "## Risk Summary");
    let _ = writeln!(output, "- High Risk: {}", totals.high);
    let _ = writeln!(output, "- Medium Risk: {}", totals.medium);
    let _ = writeln!(output, "- Low Risk: {}", totals.low);
    if totals.no_data > 0 {
        let _ = writeln!(output, "- No Data: {}", totals.no_data);
    }
}

fn write_counts(output: &mut String, title: &str, counts: &Counts) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if counts.is_empty() {
        let _ = writeln!(output, "None recorded.");
        return;
    }

    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (key, count) in entries {
        let _ = writeln!(output, "- {key}: {count}");
    }
}
