use std::io::{BufRead, BufReader, Read};
use std::sync::OnceLock;

use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use regex::Regex;
use serde::Deserialize;

use crate::error::EpssError;
use crate::scores::{ScoreRecord, Snapshot};

#[derive(Debug, Deserialize)]
struct UpstreamRow {
    cve: String,
    epss: f64,
    percentile: f64,
}

/// Decode a provider payload: gzip, one `#model_version:...` comment line,
/// then a `cve,epss,percentile` CSV table. Records are stamped with `date`
/// regardless of what the payload itself claims.
pub fn parse_snapshot(bytes: &[u8], date: NaiveDate) -> crate::Result<Snapshot> {
    read_snapshot(bytes, date)
}

/// Streaming form of [`parse_snapshot`]. Every gzip member is decoded, so a
/// concatenated payload yields all of its rows.
pub fn read_snapshot<R: Read>(reader: R, date: NaiveDate) -> crate::Result<Snapshot> {
    let mut body = BufReader::new(MultiGzDecoder::new(reader));

    let mut metadata = Vec::new();
    let read = body
        .read_until(b'\n', &mut metadata)
        .map_err(|e| EpssError::MalformedUpstreamResponse(format!("gzip: {}", e)))?;
    if read == 0 || metadata.last() != Some(&b'\n') {
        return Err(EpssError::MalformedUpstreamResponse(
            "payload has no CSV header".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| EpssError::MalformedUpstreamResponse(e.to_string()))?;
    for column in ["cve", "epss", "percentile"] {
        if !headers.iter().any(|h| h == column) {
            return Err(EpssError::MalformedUpstreamResponse(format!(
                "missing column '{}' in header {:?}",
                column,
                headers.iter().collect::<Vec<_>>()
            )));
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<UpstreamRow>() {
        let row = row.map_err(|e| EpssError::MalformedUpstreamResponse(e.to_string()))?;
        records.push(ScoreRecord {
            cve: row.cve,
            epss: row.epss,
            percentile: row.percentile,
            date,
        });
    }

    Ok(Snapshot::new(date, records))
}

/// Pull the first `YYYY-MM-DD` out of a redirect location.
pub fn extract_date(location: &str) -> crate::Result<NaiveDate> {
    static DATE: OnceLock<Regex> = OnceLock::new();
    let regex = DATE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

    let captured = regex
        .captures(location)
        .and_then(|c| c.get(1))
        .ok_or_else(|| {
            EpssError::MalformedUpstreamResponse(format!("no date found in {}", location))
        })?;

    NaiveDate::parse_from_str(captured.as_str(), "%Y-%m-%d").map_err(|_| {
        EpssError::MalformedUpstreamResponse(format!("invalid date in {}", location))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_provider_payload_and_stamps_requested_date() {
        let payload = gzip(
            "#model_version:v2023.03.01,score_date:2023-03-07T00:00:00+0000\n\
             cve,epss,percentile\n\
             CVE-1999-0001,0.0109,0.83\n\
             CVE-2023-0002,0.97,0.999\n",
        );

        let snapshot = parse_snapshot(&payload, date("2023-01-01")).unwrap();

        assert_eq!(snapshot.date, date("2023-01-01"));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records[0].cve, "CVE-1999-0001");
        assert_eq!(snapshot.records[0].epss, 0.0109);
        assert_eq!(snapshot.records[1].percentile, 0.999);
        assert!(snapshot.iter().all(|r| r.date == date("2023-01-01")));
    }

    #[test]
    fn rejects_non_gzip_payload() {
        let err = parse_snapshot(b"cve,epss,percentile\n", date("2023-01-01")).unwrap_err();
        assert!(matches!(err, EpssError::MalformedUpstreamResponse(_)));
    }

    #[test]
    fn rejects_missing_columns() {
        let payload = gzip("#meta\nid,score\nCVE-1,0.1\n");
        let err = parse_snapshot(&payload, date("2023-01-01")).unwrap_err();
        assert!(matches!(err, EpssError::MalformedUpstreamResponse(_)));
    }

    #[test]
    fn rejects_unparseable_scores() {
        let payload = gzip("#meta\ncve,epss,percentile\nCVE-1,high,0.5\n");
        let err = parse_snapshot(&payload, date("2023-01-01")).unwrap_err();
        assert!(matches!(err, EpssError::MalformedUpstreamResponse(_)));
    }

    #[test]
    fn reads_every_gzip_member() {
        let mut payload = gzip("#meta\ncve,epss,percentile\nCVE-1,0.1,0.2\n");
        payload.extend(gzip("CVE-2,0.3,0.4\n"));

        let snapshot = parse_snapshot(&payload, date("2023-01-01")).unwrap();

        let cves: Vec<_> = snapshot.iter().map(|r| r.cve.as_str()).collect();
        assert_eq!(cves, vec!["CVE-1", "CVE-2"]);
        assert_eq!(snapshot.records[1].epss, 0.3);
    }

    #[test]
    fn decodes_from_a_reader() {
        let payload = gzip("#meta\ncve,epss,percentile\nCVE-1,0.1,0.2\n");
        let snapshot = read_snapshot(std::io::Cursor::new(payload), date("2023-01-01")).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn rejects_payload_without_header_line() {
        let err = parse_snapshot(&gzip("#meta"), date("2023-01-01")).unwrap_err();
        assert!(matches!(err, EpssError::MalformedUpstreamResponse(_)));
    }

    #[test]
    fn extracts_date_from_redirect_location() {
        let location = "https://epss.cyentia.com/epss_scores-2024-05-17.csv.gz";
        assert_eq!(extract_date(location).unwrap(), date("2024-05-17"));
        assert!(matches!(
            extract_date("https://epss.cyentia.com/latest.csv.gz"),
            Err(EpssError::MalformedUpstreamResponse(_))
        ));
    }
}
