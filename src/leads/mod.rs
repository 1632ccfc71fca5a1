//! Lead persistence
//!
//! A [`LeadRecorder`] hands finished leads to a [`LeadSink`] and applies the
//! [`PersistencePolicy`]: whether a failed write is reported to the caller or only
//! logged. Either way the user's completed funnel run is never rolled back.

pub mod csv_sink;
pub mod mysql_sink;
pub mod record;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::health;

pub use csv_sink::CsvLeadSink;
pub use mysql_sink::{MySqlLeadSink, MySqlSettings};
pub use record::LeadRecord;

/// Append-only destination for leads. Idempotency is not required.
pub trait LeadSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn append<'a>(&'a self, record: &'a LeadRecord) -> BoxFuture<'a, Result<()>>;
}

/// Which sink `run` builds from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSinkKind {
    #[default]
    Csv,
    Mysql,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Log and swallow sink failures; the user still sees the success message.
    #[default]
    BestEffort,
    /// Return sink failures to the caller.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted,
    Dropped { reason: String },
}

pub struct LeadRecorder {
    sink: Arc<dyn LeadSink>,
    policy: PersistencePolicy,
}

impl LeadRecorder {
    pub fn new(sink: Arc<dyn LeadSink>, policy: PersistencePolicy) -> Self {
        Self { sink, policy }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    pub async fn record(&self, record: &LeadRecord) -> Result<PersistOutcome> {
        match self.sink.append(record).await {
            Ok(()) => {
                health::record_lead("persisted");
                info!(
                    user_id = %record.user_id,
                    tariff = %record.tariff,
                    sink = self.sink.name(),
                    "Lead recorded"
                );
                Ok(PersistOutcome::Persisted)
            }
            Err(err) => match self.policy {
                PersistencePolicy::BestEffort => {
                    health::record_lead("dropped");
                    warn!(
                        user_id = %record.user_id,
                        sink = self.sink.name(),
                        "Failed to record lead, continuing: {}",
                        err
                    );
                    Ok(PersistOutcome::Dropped {
                        reason: err.to_string(),
                    })
                }
                PersistencePolicy::Strict => {
                    health::record_lead("failed");
                    Err(err)
                }
            },
        }
    }
}

/// Keeps leads in process memory.
#[derive(Debug, Default)]
pub struct MemoryLeadSink {
    records: Mutex<Vec<LeadRecord>>,
}

impl MemoryLeadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LeadRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LeadSink for MemoryLeadSink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn append<'a>(&'a self, record: &'a LeadRecord) -> BoxFuture<'a, Result<()>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        futures::future::ready(Ok(())).boxed()
    }
}

/// Persistence disabled; leads only reach the log.
#[derive(Debug, Default)]
pub struct NullLeadSink;

impl LeadSink for NullLeadSink {
    fn name(&self) -> &'static str {
        "none"
    }

    fn append<'a>(&'a self, record: &'a LeadRecord) -> BoxFuture<'a, Result<()>> {
        info!(user_id = %record.user_id, "Lead not persisted (no sink configured)");
        futures::future::ready(Ok(())).boxed()
    }
}

/// Builds the configured sink. MySQL connects (and creates its table) up front.
pub async fn open_sink(
    kind: LeadSinkKind,
    csv_path: &Path,
    mysql: &MySqlSettings,
    bot_name: &str,
) -> Result<Arc<dyn LeadSink>> {
    Ok(match kind {
        LeadSinkKind::Csv => Arc::new(CsvLeadSink::new(csv_path)),
        LeadSinkKind::Mysql => Arc::new(MySqlLeadSink::connect(mysql, bot_name).await?),
        LeadSinkKind::None => Arc::new(NullLeadSink),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::funnel::{Contact, Session, Tariff};
    use chrono::Utc;

    struct FailingSink;

    impl LeadSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn append<'a>(&'a self, _record: &'a LeadRecord) -> BoxFuture<'a, Result<()>> {
            futures::future::ready(Err(Error::SinkError("spreadsheet unreachable".into()))).boxed()
        }
    }

    fn sample() -> LeadRecord {
        let contact = Contact::new(77);
        let mut session = Session::new(contact.id);
        session.email = Some("lead@mail.ru".to_string());
        LeadRecord::from_session(&contact, &session, Tariff::OneMonth, Utc::now())
    }

    #[tokio::test]
    async fn memory_sink_keeps_records() {
        let sink = Arc::new(MemoryLeadSink::new());
        let recorder = LeadRecorder::new(sink.clone(), PersistencePolicy::BestEffort);

        let outcome = recorder.record(&sample()).await.unwrap();

        assert_eq!(outcome, PersistOutcome::Persisted);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].email.as_deref(), Some("lead@mail.ru"));
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        let recorder = LeadRecorder::new(Arc::new(FailingSink), PersistencePolicy::BestEffort);

        let outcome = recorder.record(&sample()).await.unwrap();

        match outcome {
            PersistOutcome::Dropped { reason } => assert!(reason.contains("unreachable")),
            other => panic!("expected Dropped, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn strict_policy_surfaces_failures() {
        let recorder = LeadRecorder::new(Arc::new(FailingSink), PersistencePolicy::Strict);

        let result = recorder.record(&sample()).await;

        assert!(matches!(result, Err(Error::SinkError(_))));
    }

    #[tokio::test]
    async fn null_sink_accepts_everything() {
        let recorder = LeadRecorder::new(Arc::new(NullLeadSink), PersistencePolicy::Strict);
        assert_eq!(recorder.sink_name(), "none");
        assert_eq!(
            recorder.record(&sample()).await.unwrap(),
            PersistOutcome::Persisted
        );
    }

    #[test]
    fn policy_and_kind_deserialize_from_snake_case() {
        let policy: PersistencePolicy = serde_yaml::from_str("strict").unwrap();
        assert_eq!(policy, PersistencePolicy::Strict);
        let kind: LeadSinkKind = serde_yaml::from_str("mysql").unwrap();
        assert_eq!(kind, LeadSinkKind::Mysql);
        assert_eq!(PersistencePolicy::default(), PersistencePolicy::BestEffort);
    }

    #[tokio::test]
    async fn open_sink_builds_configured_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.csv");
        let settings = MySqlSettings::default();

        let csv = open_sink(LeadSinkKind::Csv, &path, &settings, "bot").await.unwrap();
        assert_eq!(csv.name(), "csv");

        let none = open_sink(LeadSinkKind::None, &path, &settings, "bot").await.unwrap();
        assert_eq!(none.name(), "none");
    }

    #[test]
    fn memory_sink_future_is_ready_immediately() {
        let sink = MemoryLeadSink::new();
        let record = sample();
        tokio_test::block_on(sink.append(&record)).unwrap();
        assert_eq!(sink.records(), vec![record]);
    }
}
