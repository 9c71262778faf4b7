//! In-process history of successful predictions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::WellInput;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub input: WellInput,
    #[serde(rename = "predicted_NPV")]
    pub predicted_npv: f64,
}

/// Bounded, shared prediction log. Oldest entries are evicted first.
#[derive(Clone)]
pub struct PredictionHistory {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
    limit: usize,
}

impl PredictionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(limit))),
            limit: limit.max(1),
        }
    }

    pub async fn record(&self, input: WellInput, predicted_npv: f64) {
        let mut entries = self.entries.write().await;
        entries.push_back(HistoryEntry {
            timestamp: Utc::now(),
            input,
            predicted_npv,
        });
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    /// Most recent first.
    pub async fn recent(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
