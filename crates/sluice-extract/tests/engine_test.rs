//! End-to-end engine tests over an in-memory source
//!
//! The fixture is a 19-row release table with three candidate check
//! columns: an integer id, a version string, and a release timestamp.
//! Row 9 holds the checkpoint values used throughout
//! (id 9 / version "8.10" / 2008-10-18), so each scenario extracts
//! exactly rows 10..=19.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use sluice_extract::prelude::*;

fn ts(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").unwrap()
}

fn release(id: i64, name: &str, version: &str, date: &str) -> Row {
    Row::new(
        vec![
            "id".into(),
            "name".into(),
            "version".into(),
            "release_date".into(),
        ],
        vec![
            Value::Int(id),
            Value::Text(name.into()),
            Value::Text(version.into()),
            Value::Timestamp(ts(date)),
        ],
    )
}

fn releases() -> Vec<Row> {
    vec![
        release(1, "Warty Warthog", "4.10", "2004-10-20 00:00:00.000"),
        release(2, "Hoary Hedgehog", "5.04", "2005-04-08 00:00:00.000"),
        release(3, "Breezy Badger", "5.10", "2005-10-13 00:00:00.000"),
        release(4, "Dapper Drake", "6.06", "2006-06-01 00:00:00.000"),
        release(5, "Edgy Eft", "6.10", "2006-10-26 00:00:00.000"),
        release(6, "Feisty Fawn", "7.04", "2007-04-19 00:00:00.000"),
        release(7, "Gutsy Gibbon", "7.10", "2007-10-18 00:00:00.000"),
        release(8, "Hardy Heron", "8.04", "2008-04-24 00:00:00.000"),
        release(9, "Intrepid Ibex", "8.10", "2008-10-18 00:00:00.000"),
        release(10, "Jaunty Jackalope", "9.04", "2009-04-23 00:00:00.000"),
        release(11, "Karmic Koala", "9.10", "2009-10-29 00:00:00.000"),
        release(12, "Lucid Lynx", "10.04", "2010-04-29 00:00:00.000"),
        release(13, "Maverick Meerkat", "10.10", "2010-10-10 00:00:00.000"),
        release(14, "Natty Narwhal", "11.04", "2011-04-28 00:00:00.000"),
        release(15, "Oneiric Ocelot", "11.10", "2011-10-10 00:00:00.000"),
        release(16, "Precise Pangolin", "12.04", "2012-04-26 00:00:00.000"),
        release(17, "Quantal Quetzal", "12.10", "2012-10-18 00:00:00.000"),
        release(18, "Raring Ringtail", "13.04", "2013-04-25 00:00:00.000"),
        release(19, "Saucy Salamander", "13.10", "2013-10-17 00:00:00.000"),
    ]
}

struct VecStream(VecDeque<Row>);

impl RowStream for VecStream {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<Row>>> + Send + '_>> {
        let item = self.0.pop_front();
        Box::pin(async move { Ok(item) })
    }
}

/// In-memory source honoring the engine's comparison semantics
struct MemorySource {
    rows: Vec<Row>,
}

impl MemorySource {
    fn new(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self { rows })
    }

    fn check_of(&self, row: &Row, column: &str, kind: ValueKind) -> CheckValue {
        row.get_by_name(column)
            .expect("fixture column")
            .clone()
            .into_check(kind)
            .expect("fixture value")
    }
}

#[async_trait]
impl ExtractSource for MemorySource {
    async fn check_bounds(
        &self,
        column: &str,
        kind: ValueKind,
        lower: Option<&CheckValue>,
    ) -> Result<Option<CheckBounds>> {
        let mut bounds: Option<CheckBounds> = None;
        for row in &self.rows {
            let check = self.check_of(row, column, kind);
            if let Some(lower) = lower {
                if check.compare(lower)? != Ordering::Greater {
                    continue;
                }
            }
            bounds = Some(match bounds.take() {
                None => CheckBounds {
                    low: check.clone(),
                    high: check,
                },
                Some(mut b) => {
                    if check.compare(&b.low)? == Ordering::Less {
                        b.low = check.clone();
                    }
                    if check.compare(&b.high)? == Ordering::Greater {
                        b.high = check;
                    }
                    b
                }
            });
        }
        Ok(bounds)
    }

    async fn open_partition(
        &self,
        column: &str,
        kind: ValueKind,
        range: &PartitionRange,
    ) -> Result<Box<dyn RowStream>> {
        let mut selected = VecDeque::new();
        for row in &self.rows {
            let check = self.check_of(row, column, kind);
            if range.contains(&check)? {
                selected.push_back(row.clone());
            }
        }
        Ok(Box::new(VecStream(selected)))
    }
}

#[derive(Default)]
struct CollectingSink {
    rows: Mutex<Vec<Row>>,
}

impl CollectingSink {
    fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .rows
            .lock()
            .iter()
            .map(|r| match r.get_by_name("id").unwrap() {
                Value::Int(id) => *id,
                other => panic!("unexpected id cell {other:?}"),
            })
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl RowSink for CollectingSink {
    async fn write(&self, row: &Row) -> Result<()> {
        self.rows.lock().push(row.clone());
        Ok(())
    }
}

/// Sink that rejects one specific row, failing the worker that owns it
struct PoisonedSink {
    inner: CollectingSink,
    poison_id: i64,
}

#[async_trait]
impl RowSink for PoisonedSink {
    async fn write(&self, row: &Row) -> Result<()> {
        if row.get_by_name("id") == Some(&Value::Int(self.poison_id)) {
            return Err(Error::sink(format!("write rejected for id {}", self.poison_id)));
        }
        self.inner.write(row).await
    }
}

fn seeded_config(check_column: &str, last_value: &str) -> JobConfig {
    let config = JobConfig::default();
    config.set_value(CHECK_COLUMN_KEY, check_column);
    config.set_value(LAST_VALUE_KEY, last_value);
    config
}

fn engine_over(
    sink: Arc<dyn RowSink>,
    config: JobConfig,
) -> ExtractEngine {
    ExtractEngine::new(
        MemorySource::new(releases()),
        sink,
        Arc::new(ConfigCheckpointStore::new(config)),
    )
}

#[tokio::test]
async fn test_integer_column_extracts_rows_beyond_checkpoint() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("id", "9");
    let engine = engine_over(sink.clone(), config.clone());

    let outcome = engine
        .extract("id", ValueKind::Integer, Some("9"), 3)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.rows_extracted, 10);
    assert_eq!(outcome.new_last_value.as_deref(), Some("19"));
    assert_eq!(sink.ids(), (10..=19).collect::<Vec<_>>());
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("19")
    );
}

#[tokio::test]
async fn test_version_column_lexical_maximum() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("version", "8.10");
    let engine = engine_over(sink.clone(), config.clone());

    let outcome = engine
        .extract("version", ValueKind::Lexical, Some("8.10"), 3)
        .await
        .unwrap();

    assert_eq!(outcome.rows_extracted, 10);
    assert_eq!(outcome.new_last_value.as_deref(), Some("13.10"));
    assert_eq!(sink.ids(), (10..=19).collect::<Vec<_>>());
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("13.10")
    );
}

#[tokio::test]
async fn test_timestamp_column_round_trips_exactly() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("release_date", "2008-10-18 00:00:00.0");
    let engine = engine_over(sink.clone(), config.clone());

    let outcome = engine
        .extract(
            "release_date",
            ValueKind::Timestamp,
            Some("2008-10-18 00:00:00.0"),
            4,
        )
        .await
        .unwrap();

    assert_eq!(outcome.rows_extracted, 10);
    assert_eq!(
        outcome.new_last_value.as_deref(),
        Some("2013-10-17 00:00:00.0")
    );
    assert_eq!(sink.ids(), (10..=19).collect::<Vec<_>>());
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("2013-10-17 00:00:00.0")
    );
}

#[tokio::test]
async fn test_no_checkpoint_means_full_extraction() {
    let sink = Arc::new(CollectingSink::default());
    let engine = engine_over(sink.clone(), JobConfig::default());

    let outcome = engine
        .extract("id", ValueKind::Integer, None, 4)
        .await
        .unwrap();

    assert_eq!(outcome.rows_extracted, 19);
    assert_eq!(outcome.new_last_value.as_deref(), Some("19"));
    assert_eq!(sink.ids(), (1..=19).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rerun_at_head_is_empty_delta() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("id", "19");
    let engine = engine_over(sink.clone(), config.clone());

    let outcome = engine
        .extract("id", ValueKind::Integer, Some("19"), 3)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::EmptyDelta);
    assert_eq!(outcome.rows_extracted, 0);
    assert!(outcome.new_last_value.is_none());
    assert!(sink.rows.lock().is_empty());
    // checkpoint untouched
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("19")
    );
}

#[tokio::test]
async fn test_successful_run_then_empty_delta() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("id", "9");
    let engine = engine_over(sink.clone(), config.clone());

    let first = engine.run_incremental(ValueKind::Integer, 3).await.unwrap();
    assert_eq!(first.new_last_value.as_deref(), Some("19"));

    let second = engine.run_incremental(ValueKind::Integer, 3).await.unwrap();
    assert_eq!(second.status, RunStatus::EmptyDelta);
    assert_eq!(second.rows_extracted, 0);
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("19")
    );
}

#[tokio::test]
async fn test_failed_partition_leaves_checkpoint_untouched() {
    // id 17 lands in a later partition; its worker fails while
    // earlier partitions succeed and their rows stay written.
    let sink = Arc::new(PoisonedSink {
        inner: CollectingSink::default(),
        poison_id: 17,
    });
    let config = seeded_config("id", "9");
    let engine = engine_over(sink.clone(), config.clone());

    let err = engine
        .extract("id", ValueKind::Integer, Some("9"), 3)
        .await
        .unwrap_err();

    match err {
        Error::PartialFailure { failed, total, .. } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 3);
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }

    // rows from succeeded partitions remain on the destination
    assert!(!sink.inner.rows.lock().is_empty());
    // but the stored checkpoint did not move
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("9")
    );
}

/// Source whose partition cursors cannot be opened at all
struct UnreachableSource;

#[async_trait]
impl ExtractSource for UnreachableSource {
    async fn check_bounds(
        &self,
        _column: &str,
        _kind: ValueKind,
        _lower: Option<&CheckValue>,
    ) -> Result<Option<CheckBounds>> {
        Ok(Some(CheckBounds {
            low: CheckValue::Integer(10),
            high: CheckValue::Integer(19),
        }))
    }

    async fn open_partition(
        &self,
        _column: &str,
        _kind: ValueKind,
        _range: &PartitionRange,
    ) -> Result<Box<dyn RowStream>> {
        Err(Error::source_unavailable("connection refused"))
    }
}

#[tokio::test]
async fn test_source_outage_during_extraction_is_retriable() {
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("id", "9");
    let engine = ExtractEngine::new(
        Arc::new(UnreachableSource),
        sink.clone(),
        Arc::new(ConfigCheckpointStore::new(config.clone())),
    );

    let err = engine
        .extract("id", ValueKind::Integer, Some("9"), 2)
        .await
        .unwrap_err();

    match &err {
        Error::PartialFailure { failed, total, .. } => {
            assert_eq!(*failed, 2);
            assert_eq!(*total, 2);
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
    // every partition failed on a transient outage, so the run keeps
    // the retryable classification
    assert!(err.is_retriable());
    assert!(sink.rows.lock().is_empty());
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("9")
    );
}

struct BlockedStream;

impl RowStream for BlockedStream {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<Row>>> + Send + '_>> {
        Box::pin(std::future::pending::<Result<Option<Row>>>())
    }
}

/// Source whose cursors block forever, signalling each open
struct StalledSource {
    opened: tokio::sync::mpsc::UnboundedSender<()>,
}

#[async_trait]
impl ExtractSource for StalledSource {
    async fn check_bounds(
        &self,
        _column: &str,
        _kind: ValueKind,
        _lower: Option<&CheckValue>,
    ) -> Result<Option<CheckBounds>> {
        Ok(Some(CheckBounds {
            low: CheckValue::Integer(10),
            high: CheckValue::Integer(19),
        }))
    }

    async fn open_partition(
        &self,
        _column: &str,
        _kind: ValueKind,
        _range: &PartitionRange,
    ) -> Result<Box<dyn RowStream>> {
        let _ = self.opened.send(());
        Ok(Box::new(BlockedStream))
    }
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_run_without_commit() {
    let (tx, mut opened) = tokio::sync::mpsc::unbounded_channel();
    let sink = Arc::new(CollectingSink::default());
    let config = seeded_config("id", "9");
    let engine = Arc::new(ExtractEngine::new(
        Arc::new(StalledSource { opened: tx }),
        sink.clone(),
        Arc::new(ConfigCheckpointStore::new(config.clone())),
    ));

    let running = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.extract("id", ValueKind::Integer, Some("9"), 2).await })
    };

    // wait until both partition cursors are open and blocked
    opened.recv().await.unwrap();
    opened.recv().await.unwrap();
    engine.shutdown();

    let err = running.await.unwrap().unwrap_err();
    match err {
        Error::PartialFailure {
            failed,
            total,
            reasons,
            ..
        } => {
            assert_eq!(failed, 2);
            assert_eq!(total, 2);
            assert!(reasons.iter().all(|r| r.contains("cancelled")));
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
    assert!(sink.rows.lock().is_empty());
    // cancellation never advances the stored checkpoint
    assert_eq!(
        config.get_string_input(LAST_VALUE_KEY).as_deref(),
        Some("9")
    );
}

#[tokio::test]
async fn test_malformed_checkpoint_aborts_before_extraction() {
    let sink = Arc::new(CollectingSink::default());
    let engine = engine_over(sink.clone(), JobConfig::default());

    let err = engine
        .extract("id", ValueKind::Integer, Some("nine"), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedValue { .. }));
    assert!(sink.rows.lock().is_empty());
}

#[tokio::test]
async fn test_extraction_never_returns_rows_at_or_below_checkpoint() {
    for (column, kind, last) in [
        ("id", ValueKind::Integer, "15"),
        ("version", ValueKind::Lexical, "11.10"),
        ("release_date", ValueKind::Timestamp, "2011-10-10 00:00:00.0"),
    ] {
        let sink = Arc::new(CollectingSink::default());
        let engine = engine_over(sink.clone(), JobConfig::default());

        let outcome = engine
            .extract(column, kind, Some(last), 2)
            .await
            .unwrap();

        assert_eq!(outcome.rows_extracted, 4, "column {column}");
        assert_eq!(sink.ids(), vec![16, 17, 18, 19], "column {column}");
    }
}
