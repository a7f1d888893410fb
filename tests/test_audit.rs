mod common;

use chrono::{Local, NaiveDate, TimeZone};
use common::TempDir;
use static_gzip_server::audit::AuditLogger;
use std::sync::Arc;

fn is_well_formed(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > 11
        && bytes[2] == b':'
        && bytes[5] == b':'
        && &line[8..11] == " - "
        && line[..8].chars().filter(|c| c.is_ascii_digit()).count() == 6
}

#[tokio::test]
async fn test_creates_directory_and_appends_line() {
    let dir = TempDir::new("audit");
    let logger = AuditLogger::new(dir.path().join("logs"));
    let at = Local.with_ymd_and_hms(2024, 3, 7, 14, 30, 5).unwrap();

    logger.record_at(at, "first").await;
    logger.record_at(at, "second").await;

    let path = dir.path().join("logs").join("2024-03-07.log");
    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents, "14:30:05 - first\n14:30:05 - second\n");
}

#[tokio::test]
async fn test_entries_land_in_file_of_their_date() {
    let dir = TempDir::new("audit-dates");
    let logger = AuditLogger::new(dir.path());

    logger
        .record_at(Local.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap(), "old year")
        .await;
    logger
        .record_at(Local.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(), "new day")
        .await;

    let day1 = logger.file_for(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    let day2 = logger.file_for(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(std::fs::read_to_string(day1).unwrap(), "23:59:59 - old year\n");
    assert_eq!(std::fs::read_to_string(day2).unwrap(), "00:00:00 - new day\n");
}

#[tokio::test]
async fn test_record_uses_todays_file() {
    let dir = TempDir::new("audit-today");
    let logger = AuditLogger::new(dir.path());

    logger.record("hello").await;

    let today = logger.file_for(Local::now().date_naive());
    let contents = std::fs::read_to_string(today).unwrap();
    assert!(contents.ends_with(" - hello\n"));
    assert!(is_well_formed(contents.trim_end()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_never_interleave() {
    let dir = TempDir::new("audit-concurrent");
    let logger = Arc::new(AuditLogger::new(dir.path().join("logs")));
    let at = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let payload = "x".repeat(4096);

    let mut tasks = Vec::new();
    for i in 0..50 {
        let logger = Arc::clone(&logger);
        let payload = payload.clone();
        tasks.push(tokio::spawn(async move {
            logger.record_at(at, &format!("writer {} {}", i, payload)).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let path = logger.file_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    let contents = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 50);
    for line in &lines {
        assert!(line.starts_with("12:00:00 - writer "), "torn line");
        assert!(line.ends_with(&payload), "torn line");
    }
    for i in 0..50 {
        let prefix = format!("12:00:00 - writer {} ", i);
        assert_eq!(lines.iter().filter(|l| l.starts_with(&prefix)).count(), 1);
    }
}

#[tokio::test]
async fn test_unwritable_directory_is_swallowed() {
    let dir = TempDir::new("audit-blocked");
    // A regular file where the log directory should be
    let blocker = dir.write("logs", "not a directory");
    let logger = AuditLogger::new(&blocker);

    logger.record("lost").await;

    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
}

#[tokio::test]
async fn test_newlines_cannot_forge_entries() {
    let dir = TempDir::new("audit-forge");
    let logger = AuditLogger::new(dir.path());
    let at = Local.with_ymd_and_hms(2024, 5, 5, 6, 16, 43).unwrap();

    logger
        .record_at(at, "POST data: a=1\n12:00:00 - Request from 6.6.6.6:1 for http://forged/")
        .await;
    logger.record_at(at, "POST data: name=abc").await;

    let path = logger.file_for(NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
    let contents = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "06:16:43 - POST data: a=1\\n12:00:00 - Request from 6.6.6.6:1 for http://forged/"
    );
    assert_eq!(lines[1], "06:16:43 - POST data: name=abc");
}
