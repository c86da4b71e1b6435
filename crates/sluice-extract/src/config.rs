//! Job configuration model
//!
//! Free-form string inputs keyed by dotted names, shared between the
//! engine and its orchestration layer. Values survive round-trips
//! through [`CheckValue`](crate::value::CheckValue) parse/format.
//!
//! There is no process-wide state: each run receives its own
//! [`JobConfig`] handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Input key naming the check column
pub const CHECK_COLUMN_KEY: &str = "incrementalRead.checkColumn";
/// Input key holding the last recorded check-column value
pub const LAST_VALUE_KEY: &str = "incrementalRead.lastValue";

/// Shared, mutable job configuration
///
/// Clones share the same underlying inputs; updates made through one
/// handle are visible through all of them.
#[derive(Debug, Clone, Default)]
pub struct JobConfig {
    inputs: Arc<Mutex<HashMap<String, String>>>,
}

impl JobConfig {
    /// Create a configuration from existing inputs
    pub fn from_inputs(inputs: HashMap<String, String>) -> Self {
        Self {
            inputs: Arc::new(Mutex::new(inputs)),
        }
    }

    /// Get a string input by key
    pub fn get_string_input(&self, key: &str) -> Option<String> {
        self.inputs.lock().get(key).cloned()
    }

    /// Set a string input
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inputs.lock().insert(key.into(), value.into());
    }

    /// Set the checkpoint pair under one lock acquisition
    ///
    /// Used by the config-backed checkpoint store so the
    /// `(checkColumn, lastValue)` pair is never observable half
    /// written.
    pub(crate) fn set_pair(&self, check_column: &str, last_value: &str) {
        let mut inputs = self.inputs.lock();
        inputs.insert(CHECK_COLUMN_KEY.to_owned(), check_column.to_owned());
        inputs.insert(LAST_VALUE_KEY.to_owned(), last_value.to_owned());
    }

    /// Snapshot the inputs, e.g. for persistence or logging
    pub fn snapshot(&self) -> JobConfigSnapshot {
        JobConfigSnapshot {
            inputs: self.inputs.lock().clone(),
        }
    }
}

/// Serializable point-in-time copy of a [`JobConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfigSnapshot {
    /// Input key/value pairs
    pub inputs: HashMap<String, String>,
}

impl From<JobConfigSnapshot> for JobConfig {
    fn from(snapshot: JobConfigSnapshot) -> Self {
        Self::from_inputs(snapshot.inputs)
    }
}
