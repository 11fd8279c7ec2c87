//! Entity-scoped database operations for reports, findings, medications,
//! explanation versions, audit entries, and evaluation results.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::StoreError;
use crate::models::*;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub fn insert_report(conn: &Connection, report: &ReportRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO reports (
            id, patient_id, title, status, report_type, language,
            personalization_level, transcript, transcription_confidence,
            explanation_text, sections_json, citations_json,
            guardrail_flags_json, guardrail_passed, confidence_json,
            overall_confidence, trace_json, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            report.id,
            report.patient_id,
            report.title,
            report.status.as_str(),
            report.report_type.as_str(),
            report.language.as_str(),
            report.personalization_level.as_str(),
            report.transcript,
            report.transcription_confidence.map(f64::from),
            report.explanation_text,
            to_json_opt(&report.sections)?,
            to_json_opt(&report.citations)?,
            to_json_opt(&report.guardrail_flags)?,
            report.guardrail_passed,
            to_json_opt(&report.confidence)?,
            report.confidence.as_ref().map(|c| f64::from(c.overall)),
            to_json_opt(&report.reasoning_trace)?,
            report.created_at,
            report.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<ReportRecord>, StoreError> {
    let raw = conn
        .query_row(
            "SELECT id, patient_id, title, status, report_type, language,
                    personalization_level, transcript, transcription_confidence,
                    explanation_text, sections_json, citations_json,
                    guardrail_flags_json, guardrail_passed, confidence_json,
                    trace_json, created_at, updated_at
             FROM reports WHERE id = ?1",
            params![id],
            raw_report_row,
        )
        .optional()?;

    raw.map(RawReportRow::into_record).transpose()
}

/// Update every mutable field of an existing report row.
pub fn update_report(conn: &Connection, report: &ReportRecord) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE reports SET
            title = ?2, status = ?3, report_type = ?4, language = ?5,
            personalization_level = ?6, transcript = ?7,
            transcription_confidence = ?8, explanation_text = ?9,
            sections_json = ?10, citations_json = ?11,
            guardrail_flags_json = ?12, guardrail_passed = ?13,
            confidence_json = ?14, overall_confidence = ?15,
            trace_json = ?16, updated_at = ?17
         WHERE id = ?1",
        params![
            report.id,
            report.title,
            report.status.as_str(),
            report.report_type.as_str(),
            report.language.as_str(),
            report.personalization_level.as_str(),
            report.transcript,
            report.transcription_confidence.map(f64::from),
            report.explanation_text,
            to_json_opt(&report.sections)?,
            to_json_opt(&report.citations)?,
            to_json_opt(&report.guardrail_flags)?,
            report.guardrail_passed,
            to_json_opt(&report.confidence)?,
            report.confidence.as_ref().map(|c| f64::from(c.overall)),
            to_json_opt(&report.reasoning_trace)?,
            report.updated_at,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity_type: "report".into(),
            id: report.id.to_string(),
        });
    }
    Ok(())
}

/// Status-only update; bumps `updated_at`.
pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    status: &ReportStatus,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE reports SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), Utc::now()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity_type: "report".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Lab-type, terminally processed reports for one patient, ordered by
/// creation time, the input window for trend analysis.
pub fn list_trend_reports(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ReportRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, title, status, report_type, language,
                personalization_level, transcript, transcription_confidence,
                explanation_text, sections_json, citations_json,
                guardrail_flags_json, guardrail_passed, confidence_json,
                trace_json, created_at, updated_at
         FROM reports
         WHERE patient_id = ?1
           AND report_type = 'lab_report'
           AND status IN ('explained', 'verified', 'edited')
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![patient_id], raw_report_row)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(row?.into_record()?);
    }
    Ok(reports)
}

// ---------------------------------------------------------------------------
// Findings / medications, replaced wholesale per run
// ---------------------------------------------------------------------------

/// Delete and re-insert the findings of a report atomically.
pub fn replace_findings(
    conn: &Connection,
    report_id: &Uuid,
    findings: &[Finding],
) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM findings WHERE report_id = ?1", params![report_id])?;
    for (position, f) in findings.iter().enumerate() {
        tx.execute(
            "INSERT INTO findings (
                id, report_id, position, test_name, value, unit,
                reference_range, status, category, confidence
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Uuid::new_v4(),
                report_id,
                position as i64,
                f.test_name,
                f.value,
                f.unit,
                f.reference_range,
                f.status.as_str(),
                f.category,
                f64::from(f.confidence),
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn get_findings(conn: &Connection, report_id: &Uuid) -> Result<Vec<Finding>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT test_name, value, unit, reference_range, status, category, confidence
         FROM findings WHERE report_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, f64>(6)?,
        ))
    })?;

    let mut findings = Vec::new();
    for row in rows {
        let (test_name, value, unit, reference_range, status, category, confidence) = row?;
        findings.push(Finding {
            test_name,
            value,
            unit,
            reference_range,
            status: FindingStatus::from_str(&status)?,
            category,
            confidence: confidence as f32,
        });
    }
    Ok(findings)
}

/// Delete and re-insert the medications of a report atomically.
pub fn replace_medications(
    conn: &Connection,
    report_id: &Uuid,
    medications: &[Medication],
) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM medications WHERE report_id = ?1",
        params![report_id],
    )?;
    for (position, m) in medications.iter().enumerate() {
        tx.execute(
            "INSERT INTO medications (
                id, report_id, position, name, dosage, frequency, duration, instructions
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Uuid::new_v4(),
                report_id,
                position as i64,
                m.name,
                m.dosage,
                m.frequency,
                m.duration,
                m.instructions,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn get_medications(
    conn: &Connection,
    report_id: &Uuid,
) -> Result<Vec<Medication>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name, dosage, frequency, duration, instructions
         FROM medications WHERE report_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok(Medication {
            name: row.get(0)?,
            dosage: row.get(1)?,
            frequency: row.get(2)?,
            duration: row.get(3)?,
            instructions: row.get(4)?,
        })
    })?;

    let mut medications = Vec::new();
    for row in rows {
        medications.push(row?);
    }
    Ok(medications)
}

// ---------------------------------------------------------------------------
// Explanation versions
// ---------------------------------------------------------------------------

/// Next version number for a report (1 if none stored yet).
pub fn next_version_number(conn: &Connection, report_id: &Uuid) -> Result<i64, StoreError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(version) FROM explanation_versions WHERE report_id = ?1",
        params![report_id],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) + 1)
}

pub fn insert_version(conn: &Connection, version: &ExplanationVersion) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO explanation_versions (
            id, report_id, version, explanation_text, sections_json, edit_type, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            version.id,
            version.report_id,
            version.version,
            version.explanation_text,
            serde_json::to_string(&version.sections)?,
            version.edit_type,
            version.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_versions(
    conn: &Connection,
    report_id: &Uuid,
) -> Result<Vec<ExplanationVersion>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, version, explanation_text, sections_json, edit_type, created_at
         FROM explanation_versions WHERE report_id = ?1 ORDER BY version ASC",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok((
            row.get::<_, Uuid>(0)?,
            row.get::<_, Uuid>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, DateTime<Utc>>(6)?,
        ))
    })?;

    let mut versions = Vec::new();
    for row in rows {
        let (id, report_id, version, explanation_text, sections_json, edit_type, created_at) =
            row?;
        versions.push(ExplanationVersion {
            id,
            report_id,
            version,
            explanation_text,
            sections: serde_json::from_str(&sections_json)?,
            edit_type,
            created_at,
        });
    }
    Ok(versions)
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

pub fn insert_audit(conn: &Connection, entry: &AuditEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO audit_log (id, report_id, action, details_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.report_id,
            entry.action,
            serde_json::to_string(&entry.details)?,
            entry.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_audit(conn: &Connection, report_id: &Uuid) -> Result<Vec<AuditEntry>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, action, details_json, created_at
         FROM audit_log WHERE report_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok((
            row.get::<_, Uuid>(0)?,
            row.get::<_, Uuid>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, DateTime<Utc>>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, report_id, action, details_json, created_at) = row?;
        entries.push(AuditEntry {
            id,
            report_id,
            action,
            details: serde_json::from_str(&details_json)?,
            created_at,
        });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Evaluation results
// ---------------------------------------------------------------------------

pub fn insert_evaluation(
    conn: &Connection,
    record: &EvaluationRecord,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO evaluation_results (
            id, report_id, completeness, safety, citation_density,
            hallucination_risk, overall, grade, details_json, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id,
            record.report_id,
            f64::from(record.completeness),
            f64::from(record.safety),
            f64::from(record.citation_density),
            f64::from(record.hallucination_risk),
            f64::from(record.overall),
            record.grade.as_str(),
            serde_json::to_string(&record.details)?,
            record.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_evaluations(
    conn: &Connection,
    report_id: &Uuid,
) -> Result<Vec<EvaluationRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, completeness, safety, citation_density,
                hallucination_risk, overall, grade, details_json, created_at
         FROM evaluation_results WHERE report_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok((
            row.get::<_, Uuid>(0)?,
            row.get::<_, Uuid>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, f64>(5)?,
            row.get::<_, f64>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, DateTime<Utc>>(9)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (
            id,
            report_id,
            completeness,
            safety,
            citation_density,
            hallucination_risk,
            overall,
            grade,
            details_json,
            created_at,
        ) = row?;
        records.push(EvaluationRecord {
            id,
            report_id,
            completeness: completeness as f32,
            safety: safety as f32,
            citation_density: citation_density as f32,
            hallucination_risk: hallucination_risk as f32,
            overall: overall as f32,
            grade: Grade::from_str(&grade)?,
            details: serde_json::from_str(&details_json)?,
            created_at,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn to_json_opt<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, StoreError> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(StoreError::from)
}

fn from_json_opt<T: serde::de::DeserializeOwned>(
    value: Option<String>,
) -> Result<Option<T>, StoreError> {
    value
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(StoreError::from)
}

/// Raw row tuple fetched inside a rusqlite closure; enum and JSON conversion
/// happens outside so a malformed row surfaces as `StoreError`, not a panic.
struct RawReportRow {
    id: Uuid,
    patient_id: Uuid,
    title: String,
    status: String,
    report_type: String,
    language: String,
    personalization_level: String,
    transcript: Option<String>,
    transcription_confidence: Option<f64>,
    explanation_text: Option<String>,
    sections_json: Option<String>,
    citations_json: Option<String>,
    guardrail_flags_json: Option<String>,
    guardrail_passed: Option<bool>,
    confidence_json: Option<String>,
    trace_json: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn raw_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReportRow> {
    Ok(RawReportRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        report_type: row.get(4)?,
        language: row.get(5)?,
        personalization_level: row.get(6)?,
        transcript: row.get(7)?,
        transcription_confidence: row.get(8)?,
        explanation_text: row.get(9)?,
        sections_json: row.get(10)?,
        citations_json: row.get(11)?,
        guardrail_flags_json: row.get(12)?,
        guardrail_passed: row.get(13)?,
        confidence_json: row.get(14)?,
        trace_json: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

impl RawReportRow {
    fn into_record(self) -> Result<ReportRecord, StoreError> {
        Ok(ReportRecord {
            id: self.id,
            patient_id: self.patient_id,
            title: self.title,
            status: ReportStatus::from_str(&self.status)?,
            report_type: DocumentType::from_str(&self.report_type)?,
            language: Language::from_str(&self.language)?,
            personalization_level: PersonalizationLevel::from_str(
                &self.personalization_level,
            )?,
            transcript: self.transcript,
            transcription_confidence: self.transcription_confidence.map(|v| v as f32),
            explanation_text: self.explanation_text,
            sections: from_json_opt(self.sections_json)?,
            citations: from_json_opt(self.citations_json)?,
            guardrail_flags: from_json_opt(self.guardrail_flags_json)?,
            guardrail_passed: self.guardrail_passed,
            confidence: from_json_opt(self.confidence_json)?,
            reasoning_trace: from_json_opt(self.trace_json)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::open_memory_store;

    fn test_db() -> Connection {
        open_memory_store().unwrap()
    }

    fn make_report(conn: &Connection) -> ReportRecord {
        let report = ReportRecord::new(Uuid::new_v4(), "CBC panel");
        insert_report(conn, &report).unwrap();
        report
    }

    fn sample_finding(name: &str, status: FindingStatus) -> Finding {
        Finding {
            test_name: name.into(),
            value: "11.2".into(),
            unit: "g/dL".into(),
            reference_range: "12.0-17.5".into(),
            status,
            category: "Hematology".into(),
            confidence: 0.85,
        }
    }

    #[test]
    fn report_insert_and_retrieve() {
        let conn = test_db();
        let report = make_report(&conn);
        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.title, "CBC panel");
        assert_eq!(loaded.status, ReportStatus::Uploaded);
        assert!(loaded.sections.is_none());
    }

    #[test]
    fn missing_report_is_none() {
        let conn = test_db();
        assert!(get_report(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn update_missing_report_fails() {
        let conn = test_db();
        let report = ReportRecord::new(Uuid::new_v4(), "never inserted");
        assert!(matches!(
            update_report(&conn, &report),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn status_update_round_trips() {
        let conn = test_db();
        let report = make_report(&conn);
        update_status(&conn, &report.id, &ReportStatus::Processing).unwrap();
        let loaded = get_report(&conn, &report.id).unwrap().unwrap();
        assert_eq!(loaded.status, ReportStatus::Processing);
    }

    #[test]
    fn findings_are_replaced_not_appended() {
        let conn = test_db();
        let report = make_report(&conn);

        replace_findings(
            &conn,
            &report.id,
            &[
                sample_finding("Hemoglobin", FindingStatus::Low),
                sample_finding("WBC", FindingStatus::High),
            ],
        )
        .unwrap();
        assert_eq!(get_findings(&conn, &report.id).unwrap().len(), 2);

        // Re-run replaces wholesale
        replace_findings(&conn, &report.id, &[sample_finding("TSH", FindingStatus::High)])
            .unwrap();
        let findings = get_findings(&conn, &report.id).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].test_name, "TSH");
    }

    #[test]
    fn findings_preserve_order() {
        let conn = test_db();
        let report = make_report(&conn);
        replace_findings(
            &conn,
            &report.id,
            &[
                sample_finding("Zeta", FindingStatus::Normal),
                sample_finding("Alpha", FindingStatus::Normal),
            ],
        )
        .unwrap();
        let findings = get_findings(&conn, &report.id).unwrap();
        assert_eq!(findings[0].test_name, "Zeta");
        assert_eq!(findings[1].test_name, "Alpha");
    }

    #[test]
    fn medications_round_trip() {
        let conn = test_db();
        let report = make_report(&conn);
        replace_medications(
            &conn,
            &report.id,
            &[Medication {
                name: "Augmentin".into(),
                dosage: Some("625mg".into()),
                frequency: Some("1-0-1".into()),
                duration: Some("5 days".into()),
                instructions: Some("After meals".into()),
            }],
        )
        .unwrap();
        let meds = get_medications(&conn, &report.id).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].dosage.as_deref(), Some("625mg"));
    }

    #[test]
    fn version_numbering_starts_at_one() {
        let conn = test_db();
        let report = make_report(&conn);
        assert_eq!(next_version_number(&conn, &report.id).unwrap(), 1);

        insert_version(
            &conn,
            &ExplanationVersion {
                id: Uuid::new_v4(),
                report_id: report.id,
                version: 1,
                explanation_text: "original narrative".into(),
                sections: vec![],
                edit_type: "original".into(),
                created_at: Utc::now(),
            },
        )
        .unwrap();

        assert_eq!(next_version_number(&conn, &report.id).unwrap(), 2);
        let versions = list_versions(&conn, &report.id).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].edit_type, "original");
    }

    #[test]
    fn audit_entries_round_trip() {
        let conn = test_db();
        let report = make_report(&conn);
        insert_audit(
            &conn,
            &AuditEntry {
                id: Uuid::new_v4(),
                report_id: report.id,
                action: "pipeline_complete".into(),
                details: serde_json::json!({"findings": 3}),
                created_at: Utc::now(),
            },
        )
        .unwrap();
        let entries = list_audit(&conn, &report.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "pipeline_complete");
    }

    #[test]
    fn trend_report_listing_filters_type_and_status() {
        let conn = test_db();
        let patient_id = Uuid::new_v4();

        let mut eligible = ReportRecord::new(patient_id, "older labs");
        eligible.status = ReportStatus::Explained;
        insert_report(&conn, &eligible).unwrap();

        let mut wrong_type = ReportRecord::new(patient_id, "prescription");
        wrong_type.report_type = DocumentType::Prescription;
        wrong_type.status = ReportStatus::Explained;
        insert_report(&conn, &wrong_type).unwrap();

        let mut wrong_status = ReportRecord::new(patient_id, "still processing");
        wrong_status.status = ReportStatus::Processing;
        insert_report(&conn, &wrong_status).unwrap();

        let listed = list_trend_reports(&conn, &patient_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "older labs");
    }
}
