//! Aggregates over prediction records

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::prediction::{normalize_student_id, PredictionRecord};
use crate::risk::RiskTier;

// ============================================================================
// SUMMARY
// ============================================================================

/// Counts and one-decimal percentages per tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub low_percent: f64,
    pub medium_percent: f64,
    pub high_percent: f64,
}

impl RiskSummary {
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let total = records.len();
        let count = |tier: RiskTier| records.iter().filter(|r| r.risk == tier).count();
        let (low, medium, high) = (count(RiskTier::Low), count(RiskTier::Medium), count(RiskTier::High));

        Self {
            total,
            low,
            medium,
            high,
            low_percent: share(low, total),
            medium_percent: share(medium, total),
            high_percent: share(high, total),
        }
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    pub fn percent(&self, tier: RiskTier) -> f64 {
        match tier {
            RiskTier::Low => self.low_percent,
            RiskTier::Medium => self.medium_percent,
            RiskTier::High => self.high_percent,
        }
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Chart-ready tier counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

impl RiskDistribution {
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let summary = RiskSummary::from_records(records);
        Self {
            labels: RiskTier::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            values: RiskTier::ALL.iter().map(|t| summary.count(*t)).collect(),
        }
    }
}

// ============================================================================
// SELECTIONS
// ============================================================================

/// Latest record per student id
pub fn latest_per_student(records: &[PredictionRecord]) -> Vec<PredictionRecord> {
    let mut sorted: Vec<&PredictionRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.created_at);

    let mut latest: HashMap<String, &PredictionRecord> = HashMap::new();
    for record in sorted {
        latest.insert(normalize_student_id(&record.student_id), record);
    }

    let mut out: Vec<PredictionRecord> = latest.into_values().cloned().collect();
    out.sort_by_key(|r| r.created_at);
    out
}

/// Students whose most recent prediction is High Risk, most likely first
pub fn latest_high_risk(records: &[PredictionRecord]) -> Vec<PredictionRecord> {
    let mut high: Vec<PredictionRecord> = latest_per_student(records)
        .into_iter()
        .filter(PredictionRecord::is_high_risk)
        .collect();
    high.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    high
}

/// All records of one student, oldest first
pub fn student_history(records: &[PredictionRecord], student_id: &str) -> Vec<PredictionRecord> {
    let target = normalize_student_id(student_id);
    let mut history: Vec<PredictionRecord> = records
        .iter()
        .filter(|r| normalize_student_id(&r.student_id) == target)
        .cloned()
        .collect();
    history.sort_by_key(|r| r.created_at);
    history
}

pub fn newest_first(mut records: Vec<PredictionRecord>) -> Vec<PredictionRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

// ============================================================================
// FILTER
// ============================================================================

/// Conjunction of optional criteria; empty filter keeps everything
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub student_ids: Option<HashSet<String>>,
    pub class_code: Option<String>,
}

impl RecordFilter {
    pub fn students<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.student_ids = Some(ids.into_iter().map(|s| normalize_student_id(s.as_ref())).collect());
        self
    }

    pub fn class_code(mut self, class_code: impl Into<String>) -> Self {
        self.class_code = Some(class_code.into());
        self
    }

    pub fn matches(&self, record: &PredictionRecord) -> bool {
        if let Some(ids) = &self.student_ids {
            if !ids.contains(&normalize_student_id(&record.student_id)) {
                return false;
            }
        }
        if let Some(class_code) = &self.class_code {
            if !record.class_code.trim().eq_ignore_ascii_case(class_code.trim()) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, records: Vec<PredictionRecord>) -> Vec<PredictionRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::prediction::StudentProfile;
    use crate::risk::assess;
    use chrono::{Duration, Utc};

    /// Record for `student_id` created `minutes` after a fixed origin
    fn record(student_id: &str, class_code: &str, probability: f64, minutes: i64) -> PredictionRecord {
        let profile = StudentProfile::new("N", student_id, "P", "2021", class_code);
        let features = FeatureVector::new(2.0, 10, 50, 3);
        let mut r = PredictionRecord::create("staff", &profile, &features, &assess(probability, &features));
        r.created_at = Utc::now() - Duration::days(1) + Duration::minutes(minutes);
        r
    }

    #[test]
    fn test_summary_percentages() {
        let records = vec![
            record("1", "A", 0.9, 0),
            record("2", "A", 0.7, 1),
            record("3", "A", 0.3, 2),
        ];
        let s = RiskSummary::from_records(&records);
        assert_eq!((s.total, s.low, s.medium, s.high), (3, 1, 1, 1));
        assert_eq!(s.low_percent, 33.3);
        assert_eq!(s.percent(RiskTier::High), 33.3);
    }

    #[test]
    fn test_empty_summary() {
        let s = RiskSummary::from_records(&[]);
        assert_eq!(s, RiskSummary::default());
        assert_eq!(s.high_percent, 0.0);
    }

    #[test]
    fn test_distribution_labels() {
        let d = RiskDistribution::from_records(&[record("1", "A", 0.3, 0), record("2", "A", 0.2, 1)]);
        assert_eq!(d.labels, vec!["Low Risk", "Medium Risk", "High Risk"]);
        assert_eq!(d.values, vec![0, 0, 2]);
    }

    #[test]
    fn test_latest_high_risk() {
        let records = vec![
            // student 1 recovered later
            record("1", "A", 0.2, 0),
            record("1.0", "A", 0.9, 5),
            // student 2 got worse
            record("2", "A", 0.9, 1),
            record("2", "A", 0.4, 6),
            record("3", "B", 0.5, 2),
        ];

        let high = latest_high_risk(&records);
        let ids: Vec<&str> = high.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_student_history_oldest_first() {
        let records = vec![
            record("7", "A", 0.5, 10),
            record("8", "A", 0.5, 0),
            record("7", "A", 0.6, 3),
        ];
        let history = student_history(&records, " 7.0 ");
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at < history[1].created_at);
        assert!(student_history(&records, "9").is_empty());
    }

    #[test]
    fn test_newest_first() {
        let sorted = newest_first(vec![record("1", "A", 0.5, 0), record("2", "A", 0.5, 9)]);
        assert_eq!(sorted[0].student_id, "2");
    }

    #[test]
    fn test_filter() {
        let records = vec![
            record("1", "IF-A", 0.3, 0),
            record("2", "IF-B", 0.3, 1),
            record("3", "IF-A", 0.9, 2),
        ];

        let advised = RecordFilter::default().students(["1", "3.0"]);
        assert_eq!(advised.apply(records.clone()).len(), 2);

        let class = RecordFilter::default().students(["1", "2"]).class_code(" if-a ");
        let out = class.apply(records.clone());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].student_id, "1");

        assert_eq!(RecordFilter::default().apply(records).len(), 3);
    }
}
