use crate::config::RiskThresholds;
use crate::models::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub average_score: f64,
    pub low_score_percent: f64,
    pub risk_level: RiskLevel,
}

pub fn attendance_risk(attendance_rate: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if attendance_rate < thresholds.attendance_high_below {
        RiskLevel::High
    } else if attendance_rate <= thresholds.attendance_medium_max {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn attendance_rate(total_sessions: usize, total_slots: usize) -> f64 {
    if total_slots == 0 {
        return 0.0;
    }
    (total_sessions as f64 * 100.0) / total_slots as f64
}

pub fn score_risk(scores: &[u8], thresholds: &RiskThresholds) -> ScoreSummary {
    if scores.is_empty() {
        return ScoreSummary {
            average_score: 0.0,
            low_score_percent: 0.0,
            risk_level: RiskLevel::NoData,
        };
    }

    let count = scores.len() as f64;
    let total: u32 = scores.iter().map(|score| u32::from(*score)).sum();
    let low = scores
        .iter()
        .filter(|score| **score <= thresholds.low_score_max)
        .count();
    let low_score_percent = (low as f64 * 100.0) / count;

    let risk_level = if low_score_percent > thresholds.observation_high_above {
        RiskLevel::High
    } else if low_score_percent > thresholds.observation_medium_above {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    ScoreSummary {
        average_score: total as f64 / count,
        low_score_percent,
        risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> RiskThresholds {
        RiskThresholds::default()
    }

    #[test]
    fn attendance_tiers_follow_boundaries() {
        let t = thresholds();
        assert_eq!(attendance_risk(0.0, &t), RiskLevel::High);
        assert_eq!(attendance_risk(39.99, &t), RiskLevel::High);
        assert_eq!(attendance_risk(40.0, &t), RiskLevel::Medium);
        assert_eq!(attendance_risk(50.0, &t), RiskLevel::Medium);
        assert_eq!(attendance_risk(50.01, &t), RiskLevel::Low);
        assert_eq!(attendance_risk(100.0, &t), RiskLevel::Low);
    }

    #[test]
    fn attendance_rate_is_exact_at_forty_percent() {
        assert_eq!(attendance_rate(26, 65), 40.0);
        assert_eq!(attendance_rate(65, 65), 100.0);
        assert_eq!(attendance_rate(0, 0), 0.0);
        assert!((attendance_rate(20, 65) - 30.769).abs() < 0.001);
    }

    #[test]
    fn mixed_extremes_are_high_risk() {
        let summary = score_risk(&[1, 1, 5, 5], &thresholds());
        assert_eq!(summary.average_score, 3.0);
        assert_eq!(summary.low_score_percent, 50.0);
        assert_eq!(summary.risk_level, RiskLevel::High);
    }

    #[test]
    fn score_tiers_follow_low_score_share() {
        let t = thresholds();
        // 1 of 4 low = 25%
        assert_eq!(score_risk(&[2, 4, 4, 4], &t).risk_level, RiskLevel::Medium);
        // 2 of 5 low = 40%, not above 40
        assert_eq!(score_risk(&[1, 2, 3, 4, 5], &t).risk_level, RiskLevel::Medium);
        // 1 of 5 low = 20%, not above 20
        assert_eq!(score_risk(&[2, 3, 3, 4, 5], &t).risk_level, RiskLevel::Low);
        assert_eq!(score_risk(&[3, 4, 5], &t).risk_level, RiskLevel::Low);
    }

    #[test]
    fn empty_scores_have_no_data() {
        let summary = score_risk(&[], &thresholds());
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.risk_level, RiskLevel::NoData);
    }
}
