use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::debug;

use crate::args::EnhanceOptions;
use audioclean_core::{
    config::Config, BatchEvent, BatchOutput, BatchSession, FileState, FileStatus, ModelHandle,
    Pipeline, PipelineConfig, UploadedFile,
};

#[derive(Serialize)]
struct Summary<'a> {
    batch_id: String,
    started_at: String,
    finished_at: String,
    archive: &'a Path,
    entries: &'a [String],
    files: &'a [FileStatus],
}

pub async fn run(files: &[PathBuf], options: &EnhanceOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    apply_overrides(&mut config, options);
    config.validate()?;

    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());

    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let upload = UploadedFile::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        debug!("{}: {} bytes, format {:?}", upload.name(), upload.bytes().len(), upload.format());
        uploads.push(upload);
    }

    let model = Arc::new(ModelHandle::new(config.model.clone()));
    let pipeline_config = PipelineConfig::from(&config);

    let (tx, mut rx) = mpsc::channel(32);

    let pb = if options.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(uploads.len() as u64)
    };
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let progress_handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Started { total, .. } => {
                    pb.set_length(total as u64);
                    pb.set_message("Starting...");
                }
                BatchEvent::LoadingModel => pb.set_message("Loading model..."),
                BatchEvent::Stage { name, stage, .. } => {
                    pb.set_message(format!("{}: {}", truncate(&name, 40), stage));
                }
                BatchEvent::FileDone { name, entry_name, .. } => {
                    pb.println(format!("  ok   {} -> {}", name, entry_name));
                }
                BatchEvent::FileFailed { name, stage, reason, .. } => {
                    pb.println(format!("  FAIL {} ({}): {}", name, stage, reason));
                }
                BatchEvent::Progress(progress) => pb.set_position(progress.completed as u64),
                BatchEvent::Complete { succeeded, failed, duration, .. } => {
                    pb.finish_with_message(format!(
                        "{} cleaned, {} failed ({:.1}s)",
                        succeeded,
                        failed,
                        duration.as_secs_f32()
                    ));
                }
            }
        }
    });

    let mut session = BatchSession::new();
    let result = {
        let pipeline = Pipeline::new(pipeline_config, model, tx);
        pipeline.run(&mut session, uploads).await.map(|_| ())
    };

    // Sender is gone once the pipeline drops, so the handler drains and exits
    progress_handle.await?;
    result?;

    let output = session
        .current()
        .context("Batch finished without output")?;

    fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let archive = session
        .download_all()
        .context("Batch finished without an archive")?;
    let archive_path = output_dir.join(archive.name());
    fs::write(&archive_path, archive.bytes())
        .await
        .with_context(|| format!("Failed to write {}", archive_path.display()))?;

    if options.split {
        for entry in archive.entries() {
            if let Some((entry_name, bytes)) = session.download_one(entry) {
                let path = output_dir.join(entry_name);
                fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
    }

    if options.json {
        let summary = Summary {
            batch_id: output.batch_id.to_string(),
            started_at: output.started_at.to_rfc3339(),
            finished_at: output.finished_at.to_rfc3339(),
            archive: &archive_path,
            entries: archive.entries(),
            files: &output.statuses,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(output, &archive_path);
    }

    if output.succeeded() == 0 && !output.statuses.is_empty() {
        bail!("No file could be cleaned");
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, options: &EnhanceOptions) {
    if let Some(strength) = options.strength {
        config.model.strength = strength;
    }
    if let Some(ref weights) = options.weights {
        config.model.weights = Some(weights.clone());
    }
    if let Some(policy) = options.on_duplicate {
        config.batch.on_duplicate = policy.into();
    }
    if options.keep_temp {
        config.temp.cleanup = false;
    }
}

fn print_summary(output: &BatchOutput, archive_path: &Path) {
    println!("\n=== Batch Complete ===");
    println!("Batch:     {}", output.batch_id);
    println!("Succeeded: {}", output.succeeded());
    println!("Failed:    {}", output.failed().count());

    let failed: Vec<_> = output.failed().collect();
    if !failed.is_empty() {
        println!("\nFailed files:");
        for status in failed {
            if let FileState::Failed { stage, reason } = &status.state {
                println!("  {} ({}): {}", status.name, stage, reason);
            }
        }
    }

    println!("\nArchive: {}", archive_path.display());
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::OnDuplicate;
    use audioclean_core::config::DuplicatePolicy;

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let options = EnhanceOptions {
            strength: Some(0.25),
            on_duplicate: Some(OnDuplicate::Fail),
            keep_temp: true,
            ..EnhanceOptions::default()
        };

        apply_overrides(&mut config, &options);

        assert_eq!(config.model.strength, 0.25);
        assert_eq!(config.batch.on_duplicate, DuplicatePolicy::Fail);
        assert!(!config.temp.cleanup);
        assert!(config.model.weights.is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.wav", 40), "short.wav");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
