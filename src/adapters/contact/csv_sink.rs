//! CSV Contact Sink
//!
//! Appends captured contacts to a CSV file with the columns
//! `timestamp,name,email`. The header row is written only when the file is
//! created (or found empty); existing rows are never rewritten.
//!
//! Timestamps are rendered in local time as `YYYY-MM-DD HH:MM:SS`. Fields
//! containing a comma, quote, or line break are quoted with inner quotes
//! doubled.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::ports::{ContactRecord, ContactSink, SinkError, RECORD_FIELDS};

/// Default file name for captured contacts.
pub const DEFAULT_CSV_PATH: &str = "user_data.csv";

/// Append-only CSV store for captured contacts.
#[derive(Debug)]
pub struct CsvContactSink {
    path: PathBuf,
    /// Serializes appends from concurrent sessions in this process.
    write_lock: Mutex<()>,
}

impl CsvContactSink {
    /// Create a sink writing to `path`. The file is created on first append.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn needs_header(&self) -> Result<bool, SinkError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Renders one CSV row, terminated by a newline.
pub fn format_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut row = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record_row(record: &ContactRecord) -> String {
    let timestamp = record.timestamp.to_local_record_string();
    format_row([timestamp.as_str(), record.name.as_str(), record.email.as_str()])
}

#[async_trait]
impl ContactSink for CsvContactSink {
    async fn append(&self, record: ContactRecord) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().await;

        let mut payload = String::new();
        if self.needs_header().await? {
            payload.push_str(&format_row(RECORD_FIELDS));
        }
        payload.push_str(&record_row(&record));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "contact record appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use chrono::{Local, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn local_timestamp() -> Timestamp {
        let local = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        Timestamp::from_datetime(local.with_timezone(&chrono::Utc))
    }

    mod quoting {
        use super::*;

        #[test]
        fn plain_fields_are_unquoted() {
            assert_eq!(format_row(["a", "b c", "d@e.f"]), "a,b c,d@e.f\n");
        }

        #[test]
        fn commas_quotes_and_newlines_are_quoted() {
            assert_eq!(
                format_row(["Doe, Jane", "say \"hi\"", "two\nlines"]),
                "\"Doe, Jane\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
            );
        }
    }

    #[tokio::test]
    async fn first_append_writes_header() {
        let dir = TempDir::new().unwrap();
        let sink = CsvContactSink::new(dir.path().join("user_data.csv"));

        sink.append(ContactRecord::at(local_timestamp(), "Jane Doe", "jane@x.com"))
            .await
            .unwrap();

        let contents = fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(
            contents,
            "timestamp,name,email\n2024-05-01 09:30:00,Jane Doe,jane@x.com\n"
        );
    }

    #[tokio::test]
    async fn later_appends_do_not_repeat_header() {
        let dir = TempDir::new().unwrap();
        let sink = CsvContactSink::new(dir.path().join("user_data.csv"));

        sink.append(ContactRecord::new("Jane", "jane@x.com")).await.unwrap();
        sink.append(ContactRecord::new("Bob", "bob@x.com")).await.unwrap();

        let contents = fs::read_to_string(sink.path()).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,name,email");
        assert!(lines[1].ends_with(",Jane,jane@x.com"));
        assert!(lines[2].ends_with(",Bob,bob@x.com"));
    }

    #[tokio::test]
    async fn existing_file_is_appended_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_data.csv");
        fs::write(&path, "timestamp,name,email\n2020-01-01 00:00:00,Old,old@x.com\n")
            .await
            .unwrap();
        let sink = CsvContactSink::new(&path);

        sink.append(ContactRecord::new("New", "new@x.com")).await.unwrap();

        let contents = fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("timestamp,name,email\n2020-01-01 00:00:00,Old,old@x.com\n"));
        assert_eq!(contents.matches("timestamp,name,email").count(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_produce_whole_rows() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CsvContactSink::new(dir.path().join("user_data.csv")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    sink.append(ContactRecord::new(format!("user{}", i), format!("u{}@x.com", i)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contents = fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 9);
        assert_eq!(contents.matches("timestamp,name,email").count(), 1);
    }

    #[tokio::test]
    async fn unwritable_path_is_reported() {
        let dir = TempDir::new().unwrap();
        let sink = CsvContactSink::new(dir.path().join("missing").join("user_data.csv"));

        let err = sink
            .append(ContactRecord::new("Jane", "jane@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Io(_)));
    }
}
