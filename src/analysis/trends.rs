//! Cross-report trend analysis for one patient.
//!
//! Consumes the persisted history of terminally processed lab reports and
//! never writes anything back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FindingStatus, TrendAssessment, TrendDirection};
use crate::store::{repository, StoreError};

/// Direction boundary: a change of exactly +/-5.0% is still stable.
const DIRECTION_THRESHOLD: f64 = 5.0;

/// One measurement of a parameter in one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub report_id: Uuid,
    pub date: DateTime<Utc>,
    pub value: String,
    pub numeric_value: Option<f64>,
    pub unit: String,
    pub status: FindingStatus,
    pub reference_range: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub measurement_count: usize,
}

/// Trend of one parameter across the report history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub parameter: String,
    pub direction: TrendDirection,
    /// Percent change over the last two numeric points, rounded to one
    /// decimal for display. Direction is decided on the unrounded value.
    pub change_percent: f64,
    pub current_value: String,
    pub previous_value: String,
    pub unit: String,
    pub current_status: FindingStatus,
    pub assessment: TrendAssessment,
    pub data_points: Vec<TrendPoint>,
    pub stats: TrendStats,
}

/// Full trend analysis result. `has_history` distinguishes "not enough
/// reports" from "enough reports, no numeric trends".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub has_history: bool,
    pub report_count: usize,
    pub trends: Vec<Trend>,
    pub summary: String,
    pub improving_count: usize,
    pub worsening_count: usize,
    pub stable_count: usize,
}

/// Analyzes parameter trends for one patient across all lab reports that
/// reached a terminal processed status.
pub fn analyze(
    conn: &Connection,
    patient_id: &Uuid,
    current_report_id: &Uuid,
) -> Result<TrendReport, StoreError> {
    let reports = repository::list_trend_reports(conn, patient_id)?;
    if reports.len() < 2 {
        return Ok(TrendReport {
            has_history: false,
            report_count: reports.len(),
            trends: Vec::new(),
            summary: "Not enough historical reports for trend analysis. Upload more reports to see trends.".to_string(),
            improving_count: 0,
            worsening_count: 0,
            stable_count: 0,
        });
    }

    // Group findings by parameter, preserving report order within a group.
    let mut order: Vec<String> = Vec::new();
    let mut history: HashMap<String, Vec<TrendPoint>> = HashMap::new();
    for report in &reports {
        for finding in repository::get_findings(conn, &report.id)? {
            let points = history.entry(finding.test_name.clone()).or_insert_with(|| {
                order.push(finding.test_name.clone());
                Vec::new()
            });
            points.push(TrendPoint {
                report_id: report.id,
                date: report.created_at,
                numeric_value: parse_numeric(&finding.value),
                value: finding.value,
                unit: finding.unit,
                status: finding.status,
                reference_range: finding.reference_range,
                is_current: report.id == *current_report_id,
            });
        }
    }

    let mut trends: Vec<Trend> = Vec::new();
    for parameter in order {
        let data_points = history.remove(&parameter).unwrap_or_default();
        let numeric: Vec<&TrendPoint> = data_points
            .iter()
            .filter(|p| p.numeric_value.is_some())
            .collect();
        if numeric.len() < 2 {
            continue;
        }

        let latest = numeric[numeric.len() - 1];
        let previous = numeric[numeric.len() - 2];
        let change = percent_change(
            previous.numeric_value.unwrap_or(0.0),
            latest.numeric_value.unwrap_or(0.0),
        );
        let direction = direction_for(change);
        let assessment = assess(latest.status, direction);

        let values: Vec<f64> = numeric.iter().filter_map(|p| p.numeric_value).collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = values.iter().sum::<f64>() / values.len() as f64;

        trends.push(Trend {
            parameter,
            direction,
            change_percent: round1(change),
            current_value: latest.value.clone(),
            previous_value: previous.value.clone(),
            unit: latest.unit.clone(),
            current_status: latest.status,
            assessment,
            stats: TrendStats {
                min: round2(min),
                max: round2(max),
                average: round2(average),
                measurement_count: values.len(),
            },
            data_points,
        });
    }

    // Most significant changes first.
    trends.sort_by(|a, b| {
        b.change_percent
            .abs()
            .partial_cmp(&a.change_percent.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let improving = trends
        .iter()
        .filter(|t| t.assessment == TrendAssessment::Improving)
        .count();
    let worsening = trends
        .iter()
        .filter(|t| t.assessment == TrendAssessment::Worsening)
        .count();
    let stable = trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Stable)
        .count();

    let mut parts = Vec::new();
    if improving > 0 {
        parts.push(format!("{improving} parameter(s) improving"));
    }
    if worsening > 0 {
        parts.push(format!("{worsening} parameter(s) need attention"));
    }
    if stable > 0 {
        parts.push(format!("{stable} parameter(s) stable"));
    }
    let summary = if parts.is_empty() {
        "No significant trends detected.".to_string()
    } else {
        parts.join(". ")
    };

    Ok(TrendReport {
        has_history: true,
        report_count: reports.len(),
        trends,
        summary,
        improving_count: improving,
        worsening_count: worsening,
        stable_count: stable,
    })
}

/// Leading numeric token of a value string. "A-B" ranges yield the first
/// number; non-numeric values yield None.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let candidate = match cleaned.strip_prefix('-') {
        // Leading minus belongs to the number itself.
        Some(_) => cleaned.as_str(),
        None => cleaned.split('-').next().unwrap_or(&cleaned),
    };
    candidate.parse().ok()
}

/// Percent change with |previous| as denominator. A zero baseline maps to
/// 0% when current is also zero, else 100%.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (current - previous) / previous.abs() * 100.0
    }
}

pub fn direction_for(change_pct: f64) -> TrendDirection {
    if change_pct > DIRECTION_THRESHOLD {
        TrendDirection::Rising
    } else if change_pct < -DIRECTION_THRESHOLD {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

fn assess(status: FindingStatus, direction: TrendDirection) -> TrendAssessment {
    use FindingStatus::*;
    use TrendDirection::*;
    match (status, direction) {
        (High, Falling) | (Low, Rising) | (Normal, Stable) => TrendAssessment::Improving,
        (High | Critical, Rising) | (Low | Critical, Falling) => TrendAssessment::Worsening,
        _ => TrendAssessment::Neutral,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, ReportRecord, ReportStatus};
    use crate::store::sqlite::open_memory_store;
    use chrono::Duration;

    fn finding(name: &str, value: &str, status: FindingStatus) -> Finding {
        Finding {
            test_name: name.to_string(),
            value: value.to_string(),
            unit: "mg/dL".to_string(),
            reference_range: "70-100".to_string(),
            status,
            category: "Metabolic".to_string(),
            confidence: 0.85,
        }
    }

    fn seeded_report(
        conn: &Connection,
        patient_id: Uuid,
        days_ago: i64,
        findings: &[Finding],
    ) -> ReportRecord {
        let mut report = ReportRecord::new(patient_id, "Lab report");
        report.status = ReportStatus::Explained;
        report.created_at = Utc::now() - Duration::days(days_ago);
        report.updated_at = report.created_at;
        repository::insert_report(conn, &report).unwrap();
        repository::replace_findings(conn, &report.id, findings).unwrap();
        report
    }

    #[test]
    fn parse_numeric_handles_ranges_and_garbage() {
        assert_eq!(parse_numeric("11.2"), Some(11.2));
        assert_eq!(parse_numeric("4.0-10.0"), Some(4.0));
        assert_eq!(parse_numeric("-3.5"), Some(-3.5));
        assert_eq!(parse_numeric("1,250"), Some(1250.0));
        assert_eq!(parse_numeric("positive"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn direction_boundary_is_exclusive_at_five_percent() {
        assert_eq!(direction_for(5.0), TrendDirection::Stable);
        assert_eq!(direction_for(5.01), TrendDirection::Rising);
        assert_eq!(direction_for(-5.0), TrendDirection::Stable);
        assert_eq!(direction_for(-5.01), TrendDirection::Falling);
    }

    #[test]
    fn zero_baseline_special_cases() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 12.0), 100.0);
        assert_eq!(percent_change(-10.0, -5.0), 50.0);
    }

    #[test]
    fn single_report_has_no_history() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        let report = seeded_report(
            &conn,
            patient_id,
            1,
            &[finding("Glucose", "95", FindingStatus::Normal)],
        );
        let result = analyze(&conn, &patient_id, &report.id).unwrap();
        assert!(!result.has_history);
        assert_eq!(result.report_count, 1);
        assert!(result.trends.is_empty());
    }

    #[test]
    fn rising_high_glucose_is_worsening() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        seeded_report(
            &conn,
            patient_id,
            30,
            &[finding("Glucose", "95", FindingStatus::Normal)],
        );
        let current = seeded_report(
            &conn,
            patient_id,
            1,
            &[finding("Glucose", "130", FindingStatus::High)],
        );

        let result = analyze(&conn, &patient_id, &current.id).unwrap();
        assert!(result.has_history);
        assert_eq!(result.trends.len(), 1);
        let trend = &result.trends[0];
        assert_eq!(trend.direction, TrendDirection::Rising);
        assert_eq!(trend.change_percent, 36.8);
        assert_eq!(trend.assessment, TrendAssessment::Worsening);
        assert_eq!(trend.stats.measurement_count, 2);
        assert!(trend.data_points.last().unwrap().is_current);
        assert_eq!(result.worsening_count, 1);
    }

    #[test]
    fn low_value_rising_is_improving() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        seeded_report(
            &conn,
            patient_id,
            30,
            &[finding("Hemoglobin", "10.0", FindingStatus::Low)],
        );
        let current = seeded_report(
            &conn,
            patient_id,
            1,
            &[finding("Hemoglobin", "11.2", FindingStatus::Low)],
        );
        let result = analyze(&conn, &patient_id, &current.id).unwrap();
        assert_eq!(result.trends[0].assessment, TrendAssessment::Improving);
        assert_eq!(result.improving_count, 1);
    }

    #[test]
    fn trends_sort_by_absolute_change() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        seeded_report(
            &conn,
            patient_id,
            30,
            &[
                finding("Glucose", "100", FindingStatus::Normal),
                finding("Creatinine", "1.0", FindingStatus::Normal),
            ],
        );
        let current = seeded_report(
            &conn,
            patient_id,
            1,
            &[
                finding("Glucose", "104", FindingStatus::Normal),
                finding("Creatinine", "1.5", FindingStatus::High),
            ],
        );
        let result = analyze(&conn, &patient_id, &current.id).unwrap();
        assert_eq!(result.trends[0].parameter, "Creatinine"); // +50%
        assert_eq!(result.trends[1].parameter, "Glucose"); // +4%
        assert_eq!(result.trends[1].direction, TrendDirection::Stable);
    }

    #[test]
    fn non_numeric_values_are_skipped() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        seeded_report(
            &conn,
            patient_id,
            30,
            &[finding("Blood Group", "B positive", FindingStatus::Normal)],
        );
        let current = seeded_report(
            &conn,
            patient_id,
            1,
            &[finding("Blood Group", "B positive", FindingStatus::Normal)],
        );
        let result = analyze(&conn, &patient_id, &current.id).unwrap();
        assert!(result.has_history);
        assert!(result.trends.is_empty());
        assert_eq!(result.summary, "No significant trends detected.");
    }

    #[test]
    fn eligible_statuses_only() {
        let conn = open_memory_store().unwrap();
        let patient_id = Uuid::new_v4();
        seeded_report(
            &conn,
            patient_id,
            30,
            &[finding("Glucose", "95", FindingStatus::Normal)],
        );
        // An errored report does not count toward history.
        let mut errored = ReportRecord::new(patient_id, "Failed upload");
        errored.status = ReportStatus::Error;
        repository::insert_report(&conn, &errored).unwrap();

        let current = seeded_report(
            &conn,
            patient_id,
            1,
            &[finding("Glucose", "97", FindingStatus::Normal)],
        );
        let result = analyze(&conn, &patient_id, &current.id).unwrap();
        assert_eq!(result.report_count, 2);
    }
}
