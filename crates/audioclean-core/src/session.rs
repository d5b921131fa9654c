//! Per-file status and the session holding the last batch's output

use crate::archive::ArchiveBundle;
use audioclean_enhance::Waveform;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Pipeline stage a file is in (or failed in)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Decoding,
    Enhancing,
    Encoding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Decoding => write!(f, "decode"),
            Stage::Enhancing => write!(f, "enhance"),
            Stage::Encoding => write!(f, "encode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Decoding,
    Enhancing,
    Encoding,
    Done,
    Failed { stage: Stage, reason: String },
}

impl From<Stage> for FileState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Decoding => FileState::Decoding,
            Stage::Enhancing => FileState::Enhancing,
            Stage::Encoding => FileState::Encoding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: FileState,
}

/// One successfully enhanced file
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// Name as uploaded
    pub name: String,
    /// Name inside the archive
    pub entry_name: String,
    /// Enhanced audio at the original rate, for preview
    pub waveform: Waveform,
    pub sample_rate: u32,
    /// WAV bytes
    pub encoded: Vec<u8>,
}

/// Everything a completed batch produced
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One status per upload, in upload order
    pub statuses: Vec<FileStatus>,
    /// Done files only, in upload order
    pub results: Vec<EnhancementResult>,
    pub archive: ArchiveBundle,
}

impl BatchOutput {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileStatus> {
        self.statuses
            .iter()
            .filter(|s| matches!(s.state, FileState::Failed { .. }))
    }
}

/// Identity of the batch currently being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTicket {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// Holds the last batch's results and archive for redisplay and download
#[derive(Debug, Default)]
pub struct BatchSession {
    current: Option<BatchOutput>,
    running: Option<BatchTicket>,
}

impl BatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new batch. Discards the previous output.
    pub fn start(&mut self) -> BatchTicket {
        let ticket = BatchTicket {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        self.current = None;
        self.running = Some(ticket);
        ticket
    }

    /// Store the output of the batch started by `ticket`
    pub(crate) fn complete(&mut self, output: BatchOutput) -> &BatchOutput {
        self.running = None;
        self.current.insert(output)
    }

    /// Abandon the running batch without output
    pub(crate) fn abort(&mut self) {
        self.running = None;
    }

    pub fn current(&self) -> Option<&BatchOutput> {
        self.current.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.running = None;
    }

    /// The whole archive
    pub fn download_all(&self) -> Option<&ArchiveBundle> {
        self.current.as_ref().map(|o| &o.archive)
    }

    /// A single file's encoded output, by uploaded name or entry name.
    ///
    /// Returns `(entry_name, wav_bytes)`.
    pub fn download_one(&self, name: &str) -> Option<(&str, &[u8])> {
        self.current
            .as_ref()?
            .results
            .iter()
            .find(|r| r.name == name || r.entry_name == name)
            .map(|r| (r.entry_name.as_str(), r.encoded.as_slice()))
    }
}
