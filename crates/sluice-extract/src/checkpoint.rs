//! Job checkpoint persistence
//!
//! The persisted `(check_column, last_value)` pair lives outside the
//! core: it is read immutably at run start and written exactly once at
//! run end, only after the run is confirmed fully successful. The
//! commit is a single atomic operation — no partial pair may ever be
//! observed.

use async_trait::async_trait;

use crate::config::{JobConfig, CHECK_COLUMN_KEY, LAST_VALUE_KEY};
use crate::error::{Error, Result};
use crate::value::{CheckValue, ValueKind};

/// The recorded extraction position
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// The check column the checkpoint tracks
    pub check_column: String,
    /// Last recorded value; `None` means "full extraction", not
    /// "empty range"
    pub last_value: Option<CheckValue>,
}

/// Durable storage for the job checkpoint
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the checkpoint as recorded by the previous run
    async fn load(&self, kind: ValueKind) -> Result<Checkpoint>;

    /// Atomically record the pair for the next run
    async fn commit(&self, check_column: &str, value: &CheckValue) -> Result<()>;
}

/// Checkpoint store backed by the job-configuration model
///
/// Reads and writes the `incrementalRead.checkColumn` /
/// `incrementalRead.lastValue` inputs. Both fields are written under
/// one configuration lock, so the pair is updated atomically.
#[derive(Debug, Clone)]
pub struct ConfigCheckpointStore {
    config: JobConfig,
}

impl ConfigCheckpointStore {
    /// Create a store over a shared job configuration
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    /// Access the underlying configuration
    pub fn config(&self) -> &JobConfig {
        &self.config
    }
}

#[async_trait]
impl CheckpointStore for ConfigCheckpointStore {
    async fn load(&self, kind: ValueKind) -> Result<Checkpoint> {
        let check_column = self
            .config
            .get_string_input(CHECK_COLUMN_KEY)
            .ok_or_else(|| Error::config(format!("missing {CHECK_COLUMN_KEY}")))?;
        let last_value = match self.config.get_string_input(LAST_VALUE_KEY) {
            Some(text) => Some(CheckValue::parse(kind, &text)?),
            None => None,
        };
        Ok(Checkpoint {
            check_column,
            last_value,
        })
    }

    async fn commit(&self, check_column: &str, value: &CheckValue) -> Result<()> {
        self.config
            .set_pair(check_column, &value.to_string());
        Ok(())
    }
}
