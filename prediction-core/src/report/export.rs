//! Record Exporter
//!
//! CSV export for spreadsheet analysis. The header uses the record field
//! names, which are the contract with downstream consumers.

use std::io::Write;

use crate::prediction::PredictionRecord;

pub const CSV_HEADER: &str = "id,username,student_name,student_id,program,cohort,class_code,gpa,repeat_count,attendance_percent,credits_passed,probability,risk,recommendation,created_at";

/// Quote a field when it contains a separator, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write records as CSV, returning the number of data rows written
pub fn export_csv<W: Write>(writer: &mut W, records: &[PredictionRecord]) -> std::io::Result<usize> {
    writeln!(writer, "{}", CSV_HEADER)?;

    for record in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{:.2},{},{},{}",
            record.id,
            escape(&record.username),
            escape(&record.student_name),
            escape(&record.student_id),
            escape(&record.program),
            escape(&record.cohort),
            escape(&record.class_code),
            record.gpa,
            record.repeat_count,
            record.attendance_percent,
            record.credits_passed,
            record.probability,
            record.risk.as_str(),
            escape(&record.recommendation),
            record.created_at.to_rfc3339(),
        )?;
    }

    Ok(records.len())
}

pub fn to_csv_string(records: &[PredictionRecord]) -> std::io::Result<String> {
    let mut buf = Vec::new();
    export_csv(&mut buf, records)?;
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::prediction::StudentProfile;
    use crate::risk::assess;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("Aminah, Siti"), "\"Aminah, Siti\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_rows() {
        let profile = StudentProfile::new("Aminah, Siti", "2101001", "Informatics", "2021", "IF-A");
        let features = FeatureVector::new(3.75, 100, 96, 1);
        let record = PredictionRecord::create("siti", &profile, &features, &assess(0.55, &features));

        let csv = to_csv_string(&[record.clone()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with(&format!("{},siti,\"Aminah, Siti\",2101001,", record.id)));
        assert!(lines[1].contains(",3.75,1,96,100,67.00,Medium Risk,"));
    }

    #[test]
    fn test_export_to_file() {
        let mut file = tempfile::tempfile().unwrap();
        assert_eq!(export_csv(&mut file, &[]).unwrap(), 0);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_propagates() {
        let err = export_csv(&mut ClosedPipe, &[]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
