// Debug logging module for asynchronous decision logging
//
// Fire-and-forget async writes so a match never waits on disk. Each decision
// becomes one JSONL line holding everything needed to replay it: the world,
// the intents units were following, the decision seed and the number of
// iterations the search completed.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::action::JointAction;
use crate::candidate::CandidateAction;
use crate::types::Side;
use crate::world::World;

/// A single logged decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub tick: u32,
    pub side: Side,
    pub decision_seed: u64,
    pub iterations: u64,
    pub best_mean: Option<f64>,
    /// Intents the side's units were following before the decision
    pub intents: Vec<CandidateAction>,
    pub chosen: JointAction,
    pub world: World,
    pub timestamp: String,
}

impl DecisionLogEntry {
    pub fn new(
        world: &World,
        side: Side,
        decision_seed: u64,
        iterations: u64,
        best_mean: Option<f64>,
        intents: Vec<CandidateAction>,
        chosen: JointAction,
    ) -> Self {
        DecisionLogEntry {
            tick: world.tick(),
            side,
            decision_seed,
            iterations,
            best_mean,
            intents,
            chosen,
            world: world.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Shared debug logger state
/// Uses Arc<Mutex<File>> to allow concurrent async writes from multiple tasks
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
    runtime: Option<Handle>,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                    runtime: Handle::try_current().ok(),
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
            runtime: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a decision without waiting for the write to finish.
    /// Works from blocking threads too, as long as the logger was created inside a runtime.
    pub fn log_decision(&self, entry: DecisionLogEntry) {
        if !self.enabled {
            return;
        }
        let Some(runtime) = self.runtime.clone() else {
            return;
        };

        let logger = self.clone();
        runtime.spawn(async move {
            logger.write_entry(&entry).await;
        });
    }

    /// Appends one entry and flushes
    pub async fn write_entry(&self, entry: &DecisionLogEntry) {
        let mut file_guard = self.file.lock().await;

        if let Some(file) = file_guard.as_mut() {
            match serde_json::to_string(entry) {
                Ok(json_line) => {
                    let line_with_newline = format!("{}\n", json_line);
                    if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                        error!("Failed to write debug log entry: {}", e);
                    } else if let Err(e) = file.flush().await {
                        error!("Failed to flush debug log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize debug log entry: {}", e);
                }
            }
        }
    }
}
