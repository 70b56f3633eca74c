use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::aggregate;
use crate::config::{RiskThresholds, Settings, TrackerSchema};
use crate::error::{AnalysisError, Result};
use crate::models::{AttendanceRecord, Cell, PeriodAttendance, Table, TrackerAnalysis};
use crate::risk;

pub fn analyze(table: &Table, settings: &Settings) -> Result<TrackerAnalysis> {
    let schema = &settings.tracker;
    let workbook = match table {
        Table::Workbook(workbook) => workbook,
        other => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "tracker data must be a named-sheet workbook, got {}",
                other.shape()
            )))
        }
    };
    let rows = workbook
        .sheets
        .get(&schema.sheet)
        .ok_or_else(|| AnalysisError::MissingSheet(schema.sheet.clone()))?;

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;
    for (index, row) in rows.iter().enumerate().skip(schema.header_rows) {
        match extract_record(row, schema, &settings.thresholds) {
            Some(record) => records.push(record),
            None => {
                skipped_rows += 1;
                debug!(row = index + 1, "skipping tracker row without a fellow name");
            }
        }
    }

    let analysis = TrackerAnalysis {
        skipped_rows,
        by_coach: aggregate::count_by(&records, |r: &AttendanceRecord| r.coach.as_str()),
        by_state: aggregate::count_by(&records, |r: &AttendanceRecord| r.state.as_str()),
        by_school: aggregate::count_by(&records, |r: &AttendanceRecord| r.school.as_str()),
        by_fellowship_path: aggregate::count_by(&records, |r: &AttendanceRecord| {
            r.fellowship_path.as_str()
        }),
        by_gender: aggregate::count_by(&records, |r: &AttendanceRecord| r.gender.as_str()),
        risk_totals: aggregate::risk_totals(records.iter().map(|r| r.risk_level)),
        payment_issues: aggregate::payment_issues(&records),
        periods: aggregate::period_summaries(&schema.periods, &records),
        records,
    };

    info!(
        fellows = analysis.records.len(),
        skipped = analysis.skipped_rows,
        payment_issues = analysis.payment_issues,
        "tracker analysis complete"
    );
    Ok(analysis)
}

pub fn extract_record(
    row: &[Cell],
    schema: &TrackerSchema,
    thresholds: &RiskThresholds,
) -> Option<AttendanceRecord> {
    let fields = &schema.fields;
    let first_name = fields.first_name.resolve_or_default(row);
    let last_name = fields.last_name.resolve_or_default(row);
    let full_name = format!("{first_name} {last_name}").trim().to_string();
    if full_name.is_empty() {
        return None;
    }

    let weeks = schema.weeks_per_period();
    let mut periods = IndexMap::with_capacity(schema.periods.len());
    let mut payments = BTreeMap::new();
    let mut total_sessions = 0usize;
    let mut score_sum = 0.0;

    for (index, name) in schema.periods.iter().enumerate() {
        let start = schema.block_start(index);
        let weekly_scores: Vec<f64> = (start..start + weeks)
            .map(|column| row.get(column).and_then(Cell::number).unwrap_or(0.0))
            .collect();
        let monthly_total: f64 = weekly_scores.iter().sum();
        let payment_cleared = row
            .get(start + weeks)
            .map(payment_cleared)
            .unwrap_or(false);

        total_sessions += weekly_scores.iter().filter(|score| **score > 0.0).count();
        score_sum += monthly_total;
        payments.insert(name.clone(), payment_cleared);
        periods.insert(
            name.clone(),
            PeriodAttendance {
                monthly_average: monthly_total / weeks as f64,
                weekly_scores,
                monthly_total,
                payment_cleared,
            },
        );
    }

    let total_slots = schema.total_slots();
    let attendance_rate = risk::attendance_rate(total_sessions, total_slots);

    Some(AttendanceRecord {
        gender: fields.gender.resolve_or_default(row),
        phone: fields.phone.resolve_or_default(row),
        email: fields.email.resolve_or_default(row),
        fellow_id: fields.fellow_id.resolve_or_default(row),
        fellowship_path: fields.fellowship_path.resolve_or_default(row),
        cohort: fields.cohort.resolve_or_default(row),
        state: fields.state.resolve_or_default(row),
        school: fields.school.resolve_or_default(row),
        coach: fields.coach.resolve_or_default(row),
        status: fields.status.resolve_or_default(row),
        first_name,
        last_name,
        full_name,
        periods,
        payments,
        total_sessions,
        average_score: if total_slots == 0 {
            0.0
        } else {
            score_sum / total_slots as f64
        },
        attendance_rate,
        risk_level: risk::attendance_risk(attendance_rate, thresholds),
    })
}

pub fn payment_cleared(cell: &Cell) -> bool {
    match cell {
        Cell::Text(text) if text.trim().eq_ignore_ascii_case("yes") => true,
        other => other.number() == Some(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskLevel, Workbook};

    fn tracker_row(first: &str, last: &str, coach: &str, slot: impl Fn(usize) -> Cell, paid: Cell) -> Vec<Cell> {
        let schema = TrackerSchema::default();
        let mut row = vec![Cell::Blank; schema.block_start(schema.periods.len())];
        row[0] = Cell::from(first);
        row[1] = Cell::from(last);
        row[2] = Cell::from("Female");
        row[8] = Cell::from("Ogun");
        row[10] = Cell::from(coach);
        let mut slot_index = 0;
        for period in 0..schema.periods.len() {
            let start = schema.block_start(period);
            for week in 0..schema.weeks_per_period() {
                row[start + week] = slot(slot_index);
                slot_index += 1;
            }
            row[start + schema.weeks_per_period()] = paid.clone();
        }
        row
    }

    fn workbook(rows: Vec<Vec<Cell>>) -> Table {
        let schema = TrackerSchema::default();
        let mut sheet = vec![vec![Cell::from("header")]; schema.header_rows];
        sheet.extend(rows);
        let mut book = Workbook::default();
        book.sheets.insert(schema.sheet.clone(), sheet);
        Table::Workbook(book)
    }

    #[test]
    fn full_attendance_with_all_payments_is_low_risk() {
        let row = tracker_row("Ada", "Eze", "Coach Bisi", |_| Cell::Number(3.0), Cell::from("YES"));
        let record = extract_record(&row, &TrackerSchema::default(), &RiskThresholds::default()).unwrap();

        assert_eq!(record.full_name, "Ada Eze");
        assert_eq!(record.average_score, 3.0);
        assert_eq!(record.total_sessions, 65);
        assert_eq!(record.attendance_rate, 100.0);
        assert_eq!(record.risk_level, RiskLevel::Low);
        assert!(!record.has_payment_issue());
        assert_eq!(record.periods.len(), 13);
        for period in record.periods.values() {
            assert_eq!(period.weekly_scores.len(), 5);
            assert_eq!(period.monthly_total, period.weekly_scores.iter().sum::<f64>());
            assert_eq!(period.monthly_average, 3.0);
        }
    }

    #[test]
    fn twenty_of_sixty_five_sessions_is_high_risk() {
        let row = tracker_row(
            "Bayo",
            "Ade",
            "Coach Bisi",
            |slot| if slot < 20 { Cell::Number(2.0) } else { Cell::Blank },
            Cell::Number(1.0),
        );
        let record = extract_record(&row, &TrackerSchema::default(), &RiskThresholds::default()).unwrap();

        assert_eq!(record.total_sessions, 20);
        assert!((record.attendance_rate - 30.77).abs() < 0.01);
        assert_eq!(record.risk_level, RiskLevel::High);
        assert!((record.average_score - 40.0 / 65.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_scores_count_as_zero() {
        let row = tracker_row(
            "Chi",
            "",
            "Coach Bisi",
            |slot| match slot % 3 {
                0 => Cell::from("absent"),
                1 => Cell::from("4"),
                _ => Cell::Blank,
            },
            Cell::from("no"),
        );
        let record = extract_record(&row, &TrackerSchema::default(), &RiskThresholds::default()).unwrap();

        assert_eq!(record.full_name, "Chi");
        assert!(record.total_sessions <= 65);
        assert!(record.attendance_rate >= 0.0 && record.attendance_rate <= 100.0);
        let august = &record.periods["August 2024"];
        assert_eq!(august.weekly_scores, vec![0.0, 4.0, 0.0, 0.0, 4.0]);
        assert_eq!(august.monthly_total, 8.0);
        assert_eq!(record.unpaid_periods().len(), 13);
    }

    #[test]
    fn short_rows_zero_fill_missing_blocks() {
        let row = vec![Cell::from("Dami"), Cell::from("Ola")];
        let record = extract_record(&row, &TrackerSchema::default(), &RiskThresholds::default()).unwrap();
        assert_eq!(record.total_sessions, 0);
        assert_eq!(record.coach, "Unknown");
        assert_eq!(record.risk_level, RiskLevel::High);
    }

    #[test]
    fn payment_flag_accepts_yes_and_one() {
        assert!(payment_cleared(&Cell::from("YES")));
        assert!(payment_cleared(&Cell::from(" yes ")));
        assert!(payment_cleared(&Cell::Number(1.0)));
        assert!(payment_cleared(&Cell::from("1")));
        assert!(!payment_cleared(&Cell::from("NO")));
        assert!(!payment_cleared(&Cell::Number(0.0)));
        assert!(!payment_cleared(&Cell::Blank));
    }

    #[test]
    fn nameless_rows_are_excluded_from_every_aggregate() {
        let table = workbook(vec![
            tracker_row("Ada", "Eze", "Coach Bisi", |_| Cell::Number(3.0), Cell::from("YES")),
            tracker_row("", " ", "Coach Ghost", |_| Cell::Number(3.0), Cell::from("NO")),
            tracker_row("Bayo", "Ade", "Coach Femi", |_| Cell::Blank, Cell::from("NO")),
        ]);
        let analysis = analyze(&table, &Settings::default()).unwrap();

        assert_eq!(analysis.records.len(), 2);
        assert_eq!(analysis.skipped_rows, 1);
        assert!(!analysis.by_coach.contains_key("Coach Ghost"));
        assert_eq!(analysis.by_coach["Coach Bisi"], 1);
        assert_eq!(analysis.by_coach["Coach Femi"], 1);
        assert_eq!(analysis.by_state["Ogun"], 2);
        assert_eq!(analysis.by_school["Unknown"], 2);
        assert_eq!(analysis.risk_totals.low, 1);
        assert_eq!(analysis.risk_totals.high, 1);
        assert_eq!(analysis.payment_issues, 1);
        assert_eq!(analysis.periods.len(), 13);
        assert_eq!(analysis.periods[0].sessions, 5);
        assert_eq!(analysis.periods[0].payments_cleared, 1);
        assert_eq!(analysis.periods[0].average_monthly_total, 7.5);
    }

    #[test]
    fn rerunning_yields_identical_output() {
        let table = workbook(vec![tracker_row(
            "Ada",
            "Eze",
            "Coach Bisi",
            |slot| Cell::Number((slot % 4) as f64),
            Cell::from("YES"),
        )]);
        let first = serde_json::to_string(&analyze(&table, &Settings::default()).unwrap()).unwrap();
        let second = serde_json::to_string(&analyze(&table, &Settings::default()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn record_json_uses_camel_case_and_period_map() {
        let row = tracker_row("Ada", "Eze", "Coach Bisi", |_| Cell::Number(1.0), Cell::from("YES"));
        let record = extract_record(&row, &TrackerSchema::default(), &RiskThresholds::default()).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        for key in ["fullName", "totalSessions", "averageScore", "attendanceRate", "riskLevel", "payments"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("total_sessions").is_none());
        assert_eq!(value["riskLevel"], "Low Risk");

        let august = &value["periods"]["August 2024"];
        assert!(august.is_object());
        assert_eq!(august["monthlyTotal"], 5.0);
        assert_eq!(august["monthlyAverage"], 1.0);
        assert_eq!(august["paymentCleared"], true);
        assert_eq!(august["weeklyScores"].as_array().unwrap().len(), 5);

        let text = serde_json::to_string(&record).unwrap();
        let first = text.find("\"August 2024\"").unwrap();
        let last = text.find("\"August 2025\"").unwrap();
        let march = text.find("\"March 2025\"").unwrap();
        assert!(first < march && march < last);
    }

    #[test]
    fn analysis_json_uses_camel_case() {
        let table = workbook(vec![tracker_row("Ada", "Eze", "Coach Bisi", |_| Cell::Blank, Cell::from("NO"))]);
        let value = serde_json::to_value(analyze(&table, &Settings::default()).unwrap()).unwrap();
        assert_eq!(value["paymentIssues"], 1);
        assert_eq!(value["skippedRows"], 0);
        assert_eq!(value["byCoach"]["Coach Bisi"], 1);
        assert_eq!(value["riskTotals"]["High Risk"], 1);
        assert_eq!(value["periods"][0]["averageMonthlyTotal"], 0.0);
    }

    #[test]
    fn header_rows_are_rejected_as_tracker_input() {
        let table = Table::Rows(Vec::new());
        let err = analyze(&table, &Settings::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_tracker_sheet_is_an_error() {
        let table = Table::Workbook(Workbook::default());
        let err = analyze(&table, &Settings::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingSheet(name) if name == "Tracker"));
    }
}
