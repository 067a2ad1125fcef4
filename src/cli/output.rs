use std::io::Write;

use clap::ValueEnum;

use crate::scores::ScoreRecord;

/// Output of `cve-ids` and `get-score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdFormat {
    Plain,
    Json,
}

/// Output of `list-scores`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Json,
    Csv,
}

/// One identifier per line, or a JSON array.
pub fn write_ids(out: &mut impl Write, ids: &[String], format: IdFormat) -> crate::Result<()> {
    match format {
        IdFormat::Json => writeln!(out, "{}", serde_json::to_string(ids)?)?,
        IdFormat::Plain => {
            for id in ids {
                writeln!(out, "{}", id)?;
            }
        }
    }
    Ok(())
}

/// A batch of records as a JSON array or a CSV table with header.
pub fn write_records(
    out: &mut impl Write,
    records: &[ScoreRecord],
    format: TableFormat,
) -> crate::Result<()> {
    match format {
        TableFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for record in records {
                writer.serialize(record)?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| crate::error::EpssError::Io(e.into_error()))?;
            out.write_all(&bytes)?;
        }
        TableFormat::Json => {
            writeln!(out, "{}", serde_json::to_string(records)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(cve: &str, epss: f64) -> ScoreRecord {
        ScoreRecord {
            cve: cve.to_string(),
            epss,
            percentile: 0.5,
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        }
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut out = Vec::new();
        write_records(&mut out, &[record("CVE-1", 0.25)], TableFormat::Csv).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "cve,epss,percentile,date\nCVE-1,0.25,0.5,2023-01-01\n"
        );
    }

    #[test]
    fn json_output_is_record_array() {
        let mut out = Vec::new();
        write_records(&mut out, &[record("CVE-1", 0.25)], TableFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["cve"], "CVE-1");
        assert_eq!(parsed[0]["date"], "2023-01-01");
    }

    #[test]
    fn ids_plain_and_json() {
        let ids = vec!["CVE-2".to_string(), "CVE-1".to_string()];

        let mut plain = Vec::new();
        write_ids(&mut plain, &ids, IdFormat::Plain).unwrap();
        assert_eq!(String::from_utf8(plain).unwrap(), "CVE-2\nCVE-1\n");

        let mut json = Vec::new();
        write_ids(&mut json, &ids, IdFormat::Json).unwrap();
        assert_eq!(String::from_utf8(json).unwrap(), "[\"CVE-2\",\"CVE-1\"]\n");
    }

    #[test]
    fn formats_are_limited_per_command() {
        assert!(IdFormat::from_str("csv", true).is_err());
        assert!(TableFormat::from_str("plain", true).is_err());
        assert_eq!(TableFormat::from_str("csv", true), Ok(TableFormat::Csv));
        assert_eq!(IdFormat::from_str("plain", true), Ok(IdFormat::Plain));
    }
}
