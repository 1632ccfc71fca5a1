//! Append-only CSV file sink

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;

use super::{LeadRecord, LeadSink};
use crate::error::{Error, Result};

pub struct CsvLeadSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvLeadSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

/// Header goes in only when the file is new or empty.
fn append_row(path: &Path, row: &[String]) -> Result<()> {
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(LeadRecord::HEADER)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

impl LeadSink for CsvLeadSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append<'a>(&'a self, record: &'a LeadRecord) -> BoxFuture<'a, Result<()>> {
        async move {
            let _guard = self.write_lock.lock().await;
            let path = self.path.clone();
            let row = record.to_row();
            tokio::task::spawn_blocking(move || append_row(&path, &row))
                .await
                .map_err(|e| Error::SinkError(format!("CSV writer task failed: {}", e)))?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::{Contact, Session, Tariff};
    use chrono::Utc;

    fn record(id: i64, email: &str) -> LeadRecord {
        let contact = Contact::new(id).with_username("user");
        let mut session = Session::new(contact.id);
        session.email = Some(email.to_string());
        LeadRecord::from_session(&contact, &session, Tariff::FifteenDays, Utc::now())
    }

    #[tokio::test]
    async fn writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.csv");
        let sink = CsvLeadSink::new(&path);

        sink.append(&record(1, "one@mail.ru")).await.unwrap();
        sink.append(&record(2, "two@mail.ru")).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), LeadRecord::HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "1");
        assert_eq!(&rows[1][8], "two@mail.ru");
        assert_eq!(&rows[1][7], "15 дней (1990 ₽)");
    }

    #[tokio::test]
    async fn keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.csv");

        CsvLeadSink::new(&path)
            .append(&record(1, "a@b.c"))
            .await
            .unwrap();
        CsvLeadSink::new(&path)
            .append(&record(2, "d@e.f"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("user_id").count(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let sink = CsvLeadSink::new("/nonexistent/dir/leads.csv");
        let result = sink.append(&record(1, "a@b.c")).await;
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
