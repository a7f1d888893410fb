use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Name of the log file holding every entry for `date`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.log", date.format("%Y-%m-%d"))
}

/// Formats one log line, newline included.
///
/// Control characters in `message` are escaped, so one entry is always
/// exactly one line.
pub fn format_line<Tz: TimeZone>(at: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {}\n", at.format("%H:%M:%S"), escape_controls(message))
}

/// Escapes CR, LF and other control characters; tabs are kept.
pub fn escape_controls(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push(c),
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    out
}

/// Append-only request log split into one file per calendar day.
///
/// All appends go through a single lock, so lines from concurrent requests
/// never interleave. The file is opened and closed around every entry.
/// Failures are reported through `tracing` and never reach the caller.
#[derive(Debug)]
pub struct AuditLogger {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that entries written on `date` land in.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(log_file_name(date))
    }

    /// Appends `message` stamped with the current local time.
    pub async fn record(&self, message: &str) {
        self.record_at(Local::now(), message).await;
    }

    /// Appends `message` stamped with `at`.
    pub async fn record_at<Tz: TimeZone>(&self, at: DateTime<Tz>, message: &str)
    where
        Tz::Offset: std::fmt::Display,
    {
        let path = self.file_for(at.date_naive());
        let line = format_line(&at, message);

        let _guard = self.lock.lock().await;
        if let Err(e) = self.append(&path, line.as_bytes()).await {
            tracing::error!(file = %path.display(), error = %e, "failed to write audit log entry");
        }
    }

    async fn append(&self, path: &Path, line: &[u8]) -> std::io::Result<()> {
        // create_dir_all succeeds if the directory already exists
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line).await?;
        file.flush().await
    }
}
