use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::types::{Outcome, ScanResults};

pub const CSV_HEADER: [&str; 5] = ["URL", "Status", "Status Code", "Response Time", "Message"];

/// Console summary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub found: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_outcomes(entries: &[Outcome]) -> Self {
        Self {
            total: entries.len(),
            found: entries.iter().filter(|o| o.is_hit()).count(),
            errors: entries.iter().filter(|o| o.is_error()).count(),
        }
    }
}

/// Write one CSV row per outcome, preceded by the header row.
pub fn write_csv<W: Write>(writer: W, entries: &[Outcome]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(CSV_HEADER)?;
    for e in entries {
        let code = e.code().map(|c| c.to_string()).unwrap_or_default();
        w.write_record([
            e.url(),
            e.status_str(),
            code.as_str(),
            e.elapsed_display().as_str(),
            e.message(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_results_csv(path: &Path, results: &ScanResults) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create CSV file: {}", path.display()))?;
    write_csv(file, &results.entries)
        .with_context(|| format!("failed to write CSV to {}", path.display()))
}

pub fn write_results_json(path: &Path, results: &ScanResults) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create JSON file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    Ok(())
}

/// Print totals, then every found endpoint and successful upload.
pub fn print_summary(results: &ScanResults) {
    let summary = Summary::from_outcomes(&results.entries);
    println!("\nScan Summary:");
    println!("  Targets scanned   : {}/{}", results.targets_done, results.targets_total);
    println!("  Total results     : {}", summary.total);
    println!("  Found / uploaded  : {}", summary.found);
    println!("  Errors            : {}", summary.errors);

    let hits: Vec<&Outcome> = results.entries.iter().filter(|o| o.is_hit()).collect();
    if hits.is_empty() {
        return;
    }
    let url_w = hits
        .iter()
        .map(|o| display_url(o).len())
        .max()
        .unwrap_or(3)
        .max("url".len());
    println!();
    println!("{:<url_w$}  {:<14}  {:>8}", "url", "status", "time", url_w = url_w);
    println!("{:-<url_w$}  {:-<14}  {:->8}", "", "", "", url_w = url_w);
    for o in hits {
        println!(
            "{:<url_w$}  {:<14}  {:>8}",
            display_url(o),
            o.status_str(),
            o.elapsed_display(),
            url_w = url_w
        );
    }
}

fn display_url(o: &Outcome) -> String {
    match o.path() {
        Some(path) => format!("{}{}", o.url(), path),
        None => o.url().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ProbeOutcome, ProbeStatus, Target, TaskException, UploadOutcome, UploadStatus,
    };

    fn probe(status: ProbeStatus, code: Option<u16>) -> Outcome {
        Outcome::Probe(ProbeOutcome {
            target: Target::parse("a.test").unwrap(),
            path: "/upload.php".into(),
            status,
            code,
            latency_ms: 250,
            message: "checked, twice".into(),
        })
    }

    fn upload(status: UploadStatus) -> Outcome {
        Outcome::Upload(UploadOutcome {
            url: "http://a.test/upload.php".into(),
            status,
            code: Some(200),
            latency_ms: 1000,
            message: "ok".into(),
        })
    }

    #[test]
    fn summary_counts_hits_and_error_class() {
        let entries = vec![
            probe(ProbeStatus::Found, Some(200)),
            probe(ProbeStatus::NotFound, Some(404)),
            probe(ProbeStatus::Error, None),
            upload(UploadStatus::UploadSuccess),
            upload(UploadStatus::UploadFailed),
            upload(UploadStatus::UploadError),
            Outcome::Exception(TaskException {
                url: "http://b.test".into(),
                message: "boom".into(),
            }),
        ];
        let s = Summary::from_outcomes(&entries);
        assert_eq!(
            s,
            Summary {
                total: 7,
                found: 2,
                errors: 4
            }
        );
    }

    #[test]
    fn csv_has_header_and_quotes_messages() {
        let entries = vec![
            probe(ProbeStatus::Error, None),
            upload(UploadStatus::UploadSuccess),
        ];
        let mut buf = Vec::new();
        write_csv(&mut buf, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "URL,Status,Status Code,Response Time,Message");
        assert_eq!(lines[1], "http://a.test,ERROR,,0.25s,\"checked, twice\"");
        assert_eq!(lines[2], "http://a.test/upload.php,UPLOAD_SUCCESS,200,1.00s,ok");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_export_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let results = ScanResults {
            targets_total: 1,
            targets_done: 1,
            found_count: 1,
            entries: vec![probe(ProbeStatus::Found, Some(200))],
            ..ScanResults::default()
        };
        write_results_json(&path, &results).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["entries"][0]["kind"], "probe");
        assert_eq!(v["entries"][0]["status"], "FOUND");
    }

    #[test]
    fn csv_export_to_missing_dir_errors() {
        let err = write_results_csv(Path::new("/nonexistent/dir/out.csv"), &ScanResults::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to create CSV file"));
    }
}
