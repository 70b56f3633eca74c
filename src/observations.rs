use std::collections::HashMap;

use tracing::{debug, info};

use crate::aggregate::{self, Counts};
use crate::classify::EvidenceTally;
use crate::config::{ObservationSchema, RiskThresholds, Settings};
use crate::error::{AnalysisError, Result};
use crate::fields::{ColumnKey, FieldKind, FieldSpec};
use crate::models::{
    AreaKind, HeaderRow, ObservationAnalysis, ObservationRecord, RiskLevel, ScoreDistribution,
    Table,
};
use crate::risk;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionScores {
    pub rubric: Vec<u8>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Distributions {
    areas: Vec<ScoreDistribution>,
}

impl Distributions {
    pub fn new(schema: &ObservationSchema) -> Self {
        let rubric = schema
            .rubric_areas
            .iter()
            .map(|area| ScoreDistribution::new(area, AreaKind::Rubric));
        let stakeholder = schema
            .stakeholder_areas
            .iter()
            .map(|area| ScoreDistribution::new(area, AreaKind::Stakeholder));
        Self {
            areas: rubric.chain(stakeholder).collect(),
        }
    }

    pub fn score_session(&mut self, row: &HeaderRow, low_score_max: u8) -> SessionScores {
        let mut session = SessionScores::default();
        for distribution in self.areas.iter_mut() {
            let column = FieldSpec {
                aliases: vec![ColumnKey::Header(distribution.area.clone())],
                kind: FieldKind::FreeText,
            };
            let Some(rating) = column.lookup(row).and_then(|cell| cell.rating()) else {
                continue;
            };

            distribution.record(rating);
            if distribution.kind == AreaKind::Rubric {
                session.rubric.push(rating);
                if rating <= low_score_max {
                    session
                        .warnings
                        .push(format!("{}: {}", distribution.area, rating));
                }
            }
        }
        session
    }

    pub fn into_vec(self) -> Vec<ScoreDistribution> {
        self.areas
    }
}

pub fn analyze(table: &Table, settings: &Settings) -> Result<ObservationAnalysis> {
    let rows = match table {
        Table::Rows(rows) => rows,
        other => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "observation data must be header-keyed rows, got {}",
                other.shape()
            )))
        }
    };
    let schema = &settings.observations;
    let fields = &schema.fields;

    let mut distributions = Distributions::new(schema);
    let mut outcome = EvidenceTally::new(&schema.outcome_vocabulary);
    let mut mindset = EvidenceTally::new(&schema.mindset_vocabulary);
    let mut by_observer = Counts::new();
    let mut records: Vec<ObservationRecord> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    let mut skipped_rows = 0usize;
    let mut sessions = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let Some(name) = fields.name.resolve(row) else {
            skipped_rows += 1;
            debug!(row = index + 1, "skipping observation row without a fellow name");
            continue;
        };
        sessions += 1;

        let slot = *index_by_name.entry(name.clone()).or_insert_with(|| {
            records.push(new_record(name, row, schema));
            records.len() - 1
        });
        let record = &mut records[slot];
        record.sessions += 1;
        aggregate::increment(&mut by_observer, &fields.observer.resolve_or_default(row));

        let scores = distributions.score_session(row, settings.thresholds.low_score_max);
        if !scores.rubric.is_empty() {
            record.scores.extend(scores.rubric);
            record.warnings.extend(scores.warnings);
        }

        outcome.record(&fields.outcome_evidence.resolve_or_default(row));
        let dominant = mindset.record(&fields.mindset_evidence.resolve_or_default(row));
        if record.dominant_mindset.is_none() {
            record.dominant_mindset = dominant.map(str::to_string);
        }
    }

    for record in records.iter_mut() {
        finalize(record, &settings.thresholds);
    }

    let analysis = ObservationAnalysis {
        skipped_rows,
        sessions,
        by_region: aggregate::count_by(&records, |r: &ObservationRecord| r.region.as_str()),
        by_school: aggregate::count_by(&records, |r: &ObservationRecord| r.school.as_str()),
        by_subject: aggregate::count_by(&records, |r: &ObservationRecord| r.subject.as_str()),
        by_observer,
        risk_totals: aggregate::risk_totals(records.iter().map(|r| r.risk_level)),
        distributions: distributions.into_vec(),
        outcome_evidence: outcome.into_counts(),
        mindset_evidence: mindset.into_counts(),
        dominant_mindsets: aggregate::count_by(
            records.iter().filter(|r| r.dominant_mindset.is_some()),
            |r: &ObservationRecord| r.dominant_mindset.as_deref().unwrap_or_default(),
        ),
        records,
    };

    info!(
        fellows = analysis.records.len(),
        sessions = analysis.sessions,
        skipped = analysis.skipped_rows,
        "observation analysis complete"
    );
    Ok(analysis)
}

fn new_record(name: String, row: &HeaderRow, schema: &ObservationSchema) -> ObservationRecord {
    let fields = &schema.fields;
    ObservationRecord {
        name,
        region: fields.region.resolve_or_default(row),
        school: fields.school.resolve_or_default(row),
        subject: fields.subject.resolve_or_default(row),
        observer: fields.observer.resolve_or_default(row),
        class_size: fields.class_size.resolve_or_default(row),
        scores: Vec::new(),
        warning_count: 0,
        warnings: Vec::new(),
        sessions: 0,
        dominant_mindset: None,
        average_score: 0.0,
        low_score_percent: 0.0,
        risk_level: RiskLevel::NoData,
    }
}

fn finalize(record: &mut ObservationRecord, thresholds: &RiskThresholds) {
    let summary = risk::score_risk(&record.scores, thresholds);
    record.warning_count = record.warnings.len();
    record.average_score = summary.average_score;
    record.low_score_percent = summary.low_score_percent;
    record.risk_level = summary.risk_level;
}
