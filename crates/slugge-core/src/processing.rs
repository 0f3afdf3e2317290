//! Processing stages and the status snapshot returned to pollers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A step of the simulated processing pipeline.
///
/// `Idle` is only ever reported for projects that have never been started;
/// a run walks `Queued → … → Complete` in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Queued,
    #[serde(rename = "Normalizing transcripts")]
    NormalizingTranscripts,
    #[serde(rename = "Chunking & embedding")]
    ChunkingAndEmbedding,
    #[serde(rename = "Generating themes")]
    GeneratingThemes,
    Finalizing,
    Complete,
}

impl Stage {
    /// Stages that advance progress, in run order.
    pub const WORKING: [Stage; 4] = [
        Stage::NormalizingTranscripts,
        Stage::ChunkingAndEmbedding,
        Stage::GeneratingThemes,
        Stage::Finalizing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Queued => "Queued",
            Self::NormalizingTranscripts => "Normalizing transcripts",
            Self::ChunkingAndEmbedding => "Chunking & embedding",
            Self::GeneratingThemes => "Generating themes",
            Self::Finalizing => "Finalizing",
            Self::Complete => "Complete",
        }
    }

    /// Progress (in whole percent) a stage must reach before the next one begins.
    pub fn target_percent(self) -> u32 {
        match self {
            Self::Idle | Self::Queued => 0,
            Self::NormalizingTranscripts => 35,
            Self::ChunkingAndEmbedding => 70,
            Self::GeneratingThemes => 90,
            Self::Finalizing | Self::Complete => 100,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Complete
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Polling snapshot: `{"progress": 0.35, "stage": "...", "events": [...]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub progress: f64,
    pub stage: Stage,
    #[serde(default)]
    pub events: Vec<String>,
}

impl ProcessingStatus {
    /// Snapshot reported for projects with no run in this process.
    pub fn idle() -> Self {
        Self {
            progress: 0.0,
            stage: Stage::Idle,
            events: Vec::new(),
        }
    }

    /// Snapshot at the moment a run is (re)started.
    pub fn queued() -> Self {
        Self {
            progress: 0.0,
            stage: Stage::Queued,
            events: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// Human-readable progress line appended after every step.
pub fn progress_event(stage: Stage, percent: u32) -> String {
    format!("{}… {}%", stage.label(), percent)
}
