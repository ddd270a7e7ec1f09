//! File-backed answer history with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::HistoryEntry;
use crate::traits::HistoryProvider;

/// All graded answers known to a deployment, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// When the snapshot was last written.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

impl HistorySnapshot {
    /// Save the snapshot as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize history")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read history from {}", path.display()))?;
        let snapshot: HistorySnapshot =
            serde_json::from_str(&content).context("failed to parse history JSON")?;
        Ok(snapshot)
    }

    /// Load a snapshot, treating a missing file as an empty history.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_json(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Add a newly graded answer. Existing entries are never modified.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.updated_at = Some(Utc::now());
        self.entries.push(entry);
    }

    /// Entries for one student, in stored order.
    pub fn for_student(&self, student_id: &str) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.record.student_id() == student_id)
            .cloned()
            .collect()
    }
}

impl HistoryProvider for HistorySnapshot {
    fn answers_for(&self, student_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self.for_student(student_id))
    }
}
