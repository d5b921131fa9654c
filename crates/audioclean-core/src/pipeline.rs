//! Batch orchestration: decode, enhance, encode every upload, then archive

use crate::archive::{plan_entry_names, ArchiveBuilder};
use crate::config::{DuplicatePolicy, SampleFormat};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{CleanError, DecodeError, EncodeError, FileError, Result};
use crate::session::{
    BatchOutput, BatchSession, BatchTicket, EnhancementResult, FileState, FileStatus, Stage,
};
use crate::upload::UploadedFile;
use crate::Config;

use audioclean_enhance::{EnhanceError, LoadedModel, ModelHandle};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub archive_name: String,
    pub sample_format: SampleFormat,
    pub on_duplicate: DuplicatePolicy,
    /// Scratch root (system temp if not set)
    pub temp_dir: Option<PathBuf>,
    pub keep_temp: bool,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            archive_name: config.output.archive_name.clone(),
            sample_format: config.output.sample_format,
            on_duplicate: config.batch.on_duplicate,
            temp_dir: config.temp.directory.clone(),
            keep_temp: !config.temp.cleanup,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Files finished (either way) out of the batch total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Batch progress events
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { batch_id: Uuid, total: usize },
    LoadingModel,
    Stage { index: usize, name: String, stage: Stage },
    FileDone { index: usize, name: String, entry_name: String },
    FileFailed { index: usize, name: String, stage: Stage, reason: String },
    Progress(Progress),
    Complete { batch_id: Uuid, succeeded: usize, failed: usize, duration: Duration },
}

/// Runs batches against a shared model
pub struct Pipeline {
    config: PipelineConfig,
    model: Arc<ModelHandle>,
    progress_tx: mpsc::Sender<BatchEvent>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        model: Arc<ModelHandle>,
        progress_tx: mpsc::Sender<BatchEvent>,
    ) -> Self {
        Self {
            config,
            model,
            progress_tx,
        }
    }

    /// Run one batch over `files`, in order.
    ///
    /// Per-file failures are recorded in the output; model load and archive
    /// failures abort the batch and leave the session without output.
    pub async fn run<'s>(
        &self,
        session: &'s mut BatchSession,
        files: Vec<UploadedFile>,
    ) -> Result<&'s BatchOutput> {
        let ticket = session.start();

        match self.execute(ticket, files).await {
            Ok(output) => Ok(session.complete(output)),
            Err(e) => {
                warn!("Batch {} aborted: {}", ticket.batch_id, e);
                session.abort();
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        ticket: BatchTicket,
        files: Vec<UploadedFile>,
    ) -> Result<BatchOutput> {
        let start_time = Instant::now();
        let total = files.len();

        info!("Starting batch {} ({} files)", ticket.batch_id, total);

        // Fail fast on duplicate names before doing any work
        let entry_names = plan_entry_names(&files, self.config.on_duplicate)?;

        let scratch = self.scratch_dir()?;
        debug!("Scratch directory: {}", scratch.path().display());

        self.emit(BatchEvent::Started {
            batch_id: ticket.batch_id,
            total,
        })
        .await;

        let mut statuses: Vec<FileStatus> = files
            .iter()
            .map(|f| FileStatus {
                name: f.name().to_string(),
                state: FileState::Pending,
            })
            .collect();
        let mut results = Vec::new();

        if !files.is_empty() {
            self.emit(BatchEvent::LoadingModel).await;
            let model = self.model.acquire().await?;
            let decoder = Arc::new(Decoder::new(model.sample_rate()));
            let encoder = Encoder::new(self.config.sample_format);

            for (index, (file, entry_name)) in files.into_iter().zip(entry_names).enumerate() {
                let name = file.name().to_string();

                match self
                    .process_file(
                        index,
                        &mut statuses[index],
                        file,
                        entry_name,
                        &decoder,
                        &model,
                        encoder,
                        scratch.path(),
                    )
                    .await
                {
                    Ok(result) => {
                        info!("{} -> {}", result.name, result.entry_name);
                        self.emit(BatchEvent::FileDone {
                            index,
                            name: name.clone(),
                            entry_name: result.entry_name.clone(),
                        })
                        .await;
                        statuses[index].state = FileState::Done;
                        results.push(result);
                    }
                    Err(e) => {
                        let stage = e.stage();
                        warn!("{} failed at {}: {}", name, stage, e);
                        self.emit(BatchEvent::FileFailed {
                            index,
                            name: name.clone(),
                            stage,
                            reason: e.to_string(),
                        })
                        .await;
                        statuses[index].state = FileState::Failed {
                            stage,
                            reason: e.to_string(),
                        };
                    }
                }

                self.emit(BatchEvent::Progress(Progress {
                    completed: index + 1,
                    total,
                }))
                .await;
            }
        }

        let builder = ArchiveBuilder::new(self.config.archive_name.clone());
        let (results, archive) = tokio::task::spawn_blocking(move || {
            let archive = builder.build(&results);
            (results, archive)
        })
        .await
        .map_err(|e| CleanError::Pipeline(format!("archive task failed: {}", e)))?;
        let archive = archive?;

        let duration = start_time.elapsed();
        let failed = total - results.len();
        info!(
            "Batch {} complete: {} succeeded, {} failed ({:.1}s)",
            ticket.batch_id,
            results.len(),
            failed,
            duration.as_secs_f32()
        );

        self.emit(BatchEvent::Complete {
            batch_id: ticket.batch_id,
            succeeded: results.len(),
            failed,
            duration,
        })
        .await;

        // Cleanup scratch directory (unless keep_temp is set)
        if self.config.keep_temp {
            let kept = scratch.keep();
            info!("Scratch files kept at: {}", kept.display());
        } else {
            drop(scratch);
        }

        Ok(BatchOutput {
            batch_id: ticket.batch_id,
            started_at: ticket.started_at,
            finished_at: Utc::now(),
            statuses,
            results,
            archive,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_file(
        &self,
        index: usize,
        status: &mut FileStatus,
        file: UploadedFile,
        entry_name: String,
        decoder: &Arc<Decoder>,
        model: &LoadedModel,
        encoder: Encoder,
        scratch: &Path,
    ) -> std::result::Result<EnhancementResult, FileError> {
        let name = file.name().to_string();

        // 1. Decode
        self.stage(index, status, Stage::Decoding).await;
        let decoder = Arc::clone(decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&file))
            .await
            .map_err(|e| {
                FileError::Decode(DecodeError::Malformed {
                    file: name.clone(),
                    format: "audio",
                    reason: panic_reason(e),
                })
            })??;
        let source = decoded.source;

        // 2. Enhance
        self.stage(index, status, Stage::Enhancing).await;
        let loaded = model.clone();
        let waveform = decoded.waveform;
        let enhanced = tokio::task::spawn_blocking(move || loaded.enhance(&waveform))
            .await
            .map_err(|e| FileError::ModelFailure {
                file: name.clone(),
                reason: panic_reason(e),
            })?
            .map_err(|e| match e {
                EnhanceError::InvalidAudio(reason) => FileError::InvalidAudio {
                    file: name.clone(),
                    reason,
                },
                EnhanceError::Inference(reason) => FileError::ModelFailure {
                    file: name.clone(),
                    reason,
                },
            })?;

        // 3. Encode
        self.stage(index, status, Stage::Encoding).await;
        let encode_err = |source: EncodeError| FileError::Encode {
            file: name.clone(),
            source,
        };
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&enhanced, &source))
            .await
            .map_err(|e| encode_err(EncodeError::Internal(panic_reason(e))))?
            .map_err(encode_err)?;

        let output_path = scratch.join(&entry_name);
        tokio::fs::write(&output_path, &encoded.bytes)
            .await
            .map_err(|e| encode_err(e.into()))?;
        debug!("Wrote {}", output_path.display());

        Ok(EnhancementResult {
            name,
            entry_name,
            sample_rate: encoded.waveform.sample_rate(),
            waveform: encoded.waveform,
            encoded: encoded.bytes,
        })
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("audioclean-");
            builder
        };

        let dir = match &self.config.temp_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn stage(&self, index: usize, status: &mut FileStatus, stage: Stage) {
        debug!("{}: {}", status.name, stage);
        status.state = stage.into();
        self.emit(BatchEvent::Stage {
            index,
            name: status.name.clone(),
            stage,
        })
        .await;
    }

    async fn emit(&self, event: BatchEvent) {
        let _ = self.progress_tx.send(event).await;
    }
}

fn panic_reason(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .map(|msg| format!("panicked: {}", msg))
            .unwrap_or_else(|| "panicked".to_string())
    } else {
        e.to_string()
    }
}
