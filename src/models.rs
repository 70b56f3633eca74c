use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::aggregate::Counts;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(value) => value.trim().is_empty(),
            Cell::Number(value) => !value.is_finite(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(value) => value.trim().to_string(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Cell::Number(value) => value.to_string(),
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Blank => None,
            Cell::Number(value) => Some(*value).filter(|v| v.is_finite()),
            Cell::Text(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
        }
    }

    /// Whole number in 1-5. Text is read up to the first non-numeric
    /// character, so "4 - Proficient" rates 4 and "3.5" rates nothing.
    pub fn rating(&self) -> Option<u8> {
        let value = match self {
            Cell::Blank => return None,
            Cell::Number(value) => *value,
            Cell::Text(text) => {
                let leading: String = text
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                leading.parse::<f64>().ok()?
            }
        };

        if value.fract() == 0.0 && (1.0..=5.0).contains(&value) {
            Some(value as u8)
        } else {
            None
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Blank
        } else {
            Cell::Text(value.to_string())
        }
    }
}

pub type HeaderRow = HashMap<String, Cell>;

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Vec<Vec<Cell>>>,
}

#[derive(Debug, Clone)]
pub enum Table {
    Rows(Vec<HeaderRow>),
    Workbook(Workbook),
}

impl Table {
    pub fn shape(&self) -> &'static str {
        match self {
            Table::Rows(_) => "header-keyed rows",
            Table::Workbook(_) => "named-sheet workbook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "No Data")]
    NoData,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::High => "High Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::Low => "Low Risk",
            RiskLevel::NoData => "No Data",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskTotals {
    #[serde(rename = "High Risk")]
    pub high: usize,
    #[serde(rename = "Medium Risk")]
    pub medium: usize,
    #[serde(rename = "Low Risk")]
    pub low: usize,
    #[serde(rename = "No Data")]
    pub no_data: usize,
}

impl RiskTotals {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::NoData => self.no_data += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodAttendance {
    pub weekly_scores: Vec<f64>,
    pub monthly_total: f64,
    pub monthly_average: f64,
    pub payment_cleared: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub fellow_id: String,
    pub fellowship_path: String,
    pub cohort: String,
    pub state: String,
    pub school: String,
    pub coach: String,
    pub status: String,
    pub periods: IndexMap<String, PeriodAttendance>,
    pub payments: BTreeMap<String, bool>,
    pub total_sessions: usize,
    pub average_score: f64,
    pub attendance_rate: f64,
    pub risk_level: RiskLevel,
}

impl AttendanceRecord {
    pub fn unpaid_periods(&self) -> Vec<&str> {
        self.periods
            .iter()
            .filter(|(_, period)| !period.payment_cleared)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_payment_issue(&self) -> bool {
        self.periods.values().any(|period| !period.payment_cleared)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: String,
    pub sessions: usize,
    pub average_monthly_total: f64,
    pub payments_cleared: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerAnalysis {
    pub records: Vec<AttendanceRecord>,
    pub skipped_rows: usize,
    pub by_coach: Counts,
    pub by_state: Counts,
    pub by_school: Counts,
    pub by_fellowship_path: Counts,
    pub by_gender: Counts,
    pub risk_totals: RiskTotals,
    pub payment_issues: usize,
    pub periods: Vec<PeriodSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub name: String,
    pub region: String,
    pub school: String,
    pub subject: String,
    pub observer: String,
    pub class_size: String,
    pub scores: Vec<u8>,
    pub warning_count: usize,
    pub warnings: Vec<String>,
    pub sessions: usize,
    pub dominant_mindset: Option<String>,
    pub average_score: f64,
    pub low_score_percent: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Rubric,
    Stakeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub area: String,
    pub kind: AreaKind,
    pub counts: BTreeMap<u8, usize>,
}

impl ScoreDistribution {
    pub fn new(area: &str, kind: AreaKind) -> Self {
        Self {
            area: area.to_string(),
            kind,
            counts: (1..=5).map(|rating| (rating, 0)).collect(),
        }
    }

    pub fn record(&mut self, rating: u8) {
        *self.counts.entry(rating).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAnalysis {
    pub records: Vec<ObservationRecord>,
    pub skipped_rows: usize,
    pub sessions: usize,
    pub by_region: Counts,
    pub by_school: Counts,
    pub by_subject: Counts,
    pub by_observer: Counts,
    pub risk_totals: RiskTotals,
    pub distributions: Vec<ScoreDistribution>,
    pub outcome_evidence: Counts,
    pub mindset_evidence: Counts,
    pub dominant_mindsets: Counts,
}
