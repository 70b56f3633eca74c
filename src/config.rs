use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::fields::{FieldKind, FieldSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tracker: TrackerSchema,
    pub observations: ObservationSchema,
    pub thresholds: RiskThresholds,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str::<Settings>(&raw)?
            }
            None => Settings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let tracker = &self.tracker;
        if tracker.block_size < 2 {
            return Err(AnalysisError::Config(format!(
                "tracker block_size must leave room for a payment slot, got {}",
                tracker.block_size
            )));
        }
        if tracker.periods.is_empty() {
            return Err(AnalysisError::Config(
                "tracker needs at least one period".to_string(),
            ));
        }
        if self.observations.rubric_areas.is_empty() {
            return Err(AnalysisError::Config(
                "observations need at least one rubric area".to_string(),
            ));
        }
        let thresholds = &self.thresholds;
        if thresholds.attendance_high_below > thresholds.attendance_medium_max {
            return Err(AnalysisError::Config(
                "attendance_high_below cannot exceed attendance_medium_max".to_string(),
            ));
        }
        if thresholds.observation_medium_above > thresholds.observation_high_above {
            return Err(AnalysisError::Config(
                "observation_medium_above cannot exceed observation_high_above".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSchema {
    pub sheet: String,
    pub header_rows: usize,
    pub tracking_start: usize,
    pub block_size: usize,
    pub periods: Vec<String>,
    pub fields: TrackerFields,
}

impl TrackerSchema {
    pub fn weeks_per_period(&self) -> usize {
        self.block_size.saturating_sub(1)
    }

    pub fn total_slots(&self) -> usize {
        self.weeks_per_period() * self.periods.len()
    }

    pub fn block_start(&self, period_index: usize) -> usize {
        self.tracking_start + period_index * self.block_size
    }
}

impl Default for TrackerSchema {
    fn default() -> Self {
        Self {
            sheet: "Tracker".to_string(),
            header_rows: 3,
            tracking_start: 12,
            block_size: 6,
            periods: [
                "August 2024",
                "September 2024",
                "October 2024",
                "November 2024",
                "December 2024",
                "January 2025",
                "February 2025",
                "March 2025",
                "April 2025",
                "May 2025",
                "June 2025",
                "July 2025",
                "August 2025",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            fields: TrackerFields::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerFields {
    pub first_name: FieldSpec,
    pub last_name: FieldSpec,
    pub gender: FieldSpec,
    pub phone: FieldSpec,
    pub email: FieldSpec,
    pub fellow_id: FieldSpec,
    pub fellowship_path: FieldSpec,
    pub cohort: FieldSpec,
    pub state: FieldSpec,
    pub school: FieldSpec,
    pub coach: FieldSpec,
    pub status: FieldSpec,
}

impl Default for TrackerFields {
    fn default() -> Self {
        use FieldKind::{Categorical, FreeText};
        Self {
            first_name: FieldSpec::offset(FreeText, 0),
            last_name: FieldSpec::offset(FreeText, 1),
            gender: FieldSpec::offset(Categorical, 2),
            phone: FieldSpec::offset(FreeText, 3),
            email: FieldSpec::offset(FreeText, 4),
            fellow_id: FieldSpec::offset(FreeText, 5),
            fellowship_path: FieldSpec::offset(Categorical, 6),
            cohort: FieldSpec::offset(Categorical, 7),
            state: FieldSpec::offset(Categorical, 8),
            school: FieldSpec::offset(Categorical, 9),
            coach: FieldSpec::offset(Categorical, 10),
            status: FieldSpec::offset(Categorical, 11),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationSchema {
    pub fields: ObservationFields,
    pub rubric_areas: Vec<String>,
    pub stakeholder_areas: Vec<String>,
    pub outcome_vocabulary: Vec<PhraseTag>,
    pub mindset_vocabulary: Vec<PhraseTag>,
}

impl Default for ObservationSchema {
    fn default() -> Self {
        Self {
            fields: ObservationFields::default(),
            rubric_areas: owned(&[
                "Lesson Planning",
                "Classroom Culture",
                "Student Engagement",
                "Questioning",
                "Checking for Understanding",
                "Differentiation",
                "Feedback",
                "Time Management",
                "Content Knowledge",
            ]),
            stakeholder_areas: owned(&[
                "Student Relationships",
                "Parent Engagement",
                "Community Engagement",
                "School Leadership Engagement",
                "Peer Collaboration",
                "Teacher Collaboration",
                "Coach Engagement",
            ]),
            outcome_vocabulary: PhraseTag::list(&[
                ("growth mindset", "Growth Mindset"),
                ("self awareness", "Self Awareness"),
                ("collaboration", "Collaboration"),
                ("communication", "Communication"),
                ("academic", "Academic"),
            ]),
            mindset_vocabulary: PhraseTag::list(&[
                ("students as leaders", "Students as Leaders"),
                ("teachers as learners", "Teachers as Learners"),
                ("community as power", "Community as Power"),
                ("systemic", "Systemic"),
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationFields {
    pub name: FieldSpec,
    pub region: FieldSpec,
    pub school: FieldSpec,
    pub subject: FieldSpec,
    pub observer: FieldSpec,
    pub class_size: FieldSpec,
    pub outcome_evidence: FieldSpec,
    pub mindset_evidence: FieldSpec,
}

impl Default for ObservationFields {
    fn default() -> Self {
        use FieldKind::{Categorical, FreeText};
        Self {
            name: FieldSpec::headers(FreeText, &["Select Fellows Name", "Fellow Name", "Name"]),
            region: FieldSpec::headers(Categorical, &["Region", "Select Region"]),
            school: FieldSpec::headers(Categorical, &["School", "School Name", "Placement School"]),
            subject: FieldSpec::headers(Categorical, &["Subject", "Subject Observed"]),
            observer: FieldSpec::headers(Categorical, &["Observer", "Observer Name", "Name of Observer"]),
            class_size: FieldSpec::headers(Categorical, &["Class Size", "Number of Students"]),
            outcome_evidence: FieldSpec::headers(
                FreeText,
                &["Holistic Outcomes Evidence", "Evidence of Holistic Outcomes"],
            ),
            mindset_evidence: FieldSpec::headers(
                FreeText,
                &["Leadership Mindsets Evidence", "Evidence of Leadership Mindsets"],
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseTag {
    pub phrase: String,
    pub tag: String,
}

impl PhraseTag {
    fn list(pairs: &[(&str, &str)]) -> Vec<Self> {
        pairs
            .iter()
            .map(|(phrase, tag)| PhraseTag {
                phrase: phrase.to_lowercase(),
                tag: tag.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub attendance_high_below: f64,
    /// Attendance rate up to and including this is Medium Risk.
    pub attendance_medium_max: f64,
    pub low_score_max: u8,
    pub observation_high_above: f64,
    pub observation_medium_above: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            attendance_high_below: 40.0,
            attendance_medium_max: 50.0,
            low_score_max: 2,
            observation_high_above: 40.0,
            observation_medium_above: 20.0,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
