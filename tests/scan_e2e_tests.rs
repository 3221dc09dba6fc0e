mod common;

use std::time::Duration;

use upload_scan_rs::paths::default_paths;
use upload_scan_rs::report::Summary;
use upload_scan_rs::scanner::scan_targets;
use upload_scan_rs::targets::normalize_targets;
use upload_scan_rs::types::{Outcome, ScanConfig, DEFAULT_USER_AGENT};

fn count(entries: &[Outcome], status: &str) -> usize {
    entries.iter().filter(|o| o.status_str() == status).count()
}

#[tokio::test]
async fn live_and_dead_host_without_upload() {
    let live = common::spawn_stub(DEFAULT_USER_AGENT).await;
    let dead = common::closed_port();
    let targets = normalize_targets([format!("{live}/"), format!("http://{dead}")]);
    let config = ScanConfig {
        concurrency: 2,
        timeout: Duration::from_secs(5),
        ..ScanConfig::default()
    };

    let res = scan_targets(&targets, &default_paths(), &config).await.unwrap();

    assert_eq!(res.entries.len(), 12);
    assert_eq!(count(&res.entries, "FOUND"), 1);
    assert_eq!(count(&res.entries, "NOT_FOUND"), 5);
    assert_eq!(count(&res.entries, "ERROR"), 6);
    assert_eq!(res.targets_done, 2);
    assert_eq!(
        Summary::from_outcomes(&res.entries),
        Summary {
            total: 12,
            found: 1,
            errors: 6
        }
    );
}

#[tokio::test]
async fn found_endpoint_receives_upload() {
    let live = common::spawn_stub(DEFAULT_USER_AGENT).await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(common::PAYLOAD_NAME);
    std::fs::write(&file, b"probe payload").unwrap();

    let targets = normalize_targets([live.to_string()]);
    let config = ScanConfig {
        concurrency: 1,
        timeout: Duration::from_secs(5),
        upload_file: Some(file),
        ..ScanConfig::default()
    };

    let res = scan_targets(&targets, &default_paths(), &config).await.unwrap();

    assert_eq!(res.entries.len(), 6 + 1);
    let found_idx = res.entries.iter().position(Outcome::is_found).unwrap();
    let upload_idx = res
        .entries
        .iter()
        .position(|o| o.status_str() == "UPLOAD_SUCCESS")
        .unwrap();
    assert!(found_idx < upload_idx);
    assert_eq!(res.entries[upload_idx].url(), format!("http://{live}/upload.php"));
}

#[tokio::test]
async fn unreadable_upload_file_does_not_abort_scan() {
    let live = common::spawn_stub(DEFAULT_USER_AGENT).await;
    let targets = normalize_targets([live.to_string(), live.to_string()]);
    let config = ScanConfig {
        timeout: Duration::from_secs(5),
        upload_file: Some("/nonexistent/payload.txt".into()),
        ..ScanConfig::default()
    };

    let res = scan_targets(&targets, &default_paths(), &config).await.unwrap();

    assert_eq!(res.entries.len(), 2 * 6 + 2);
    assert_eq!(count(&res.entries, "UPLOAD_ERROR"), 2);
    assert_eq!(count(&res.entries, "FOUND"), 2);
}
