//! Zip bundling of enhanced outputs

use crate::config::DuplicatePolicy;
use crate::error::ArchiveError;
use crate::session::EnhancementResult;
use crate::upload::{sanitize_filename, UploadedFile};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Every archive entry is the original name with this prefix
pub const ENTRY_PREFIX: &str = "enhanced_";

/// Compressed bundle of all enhanced outputs of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBundle {
    name: String,
    bytes: Vec<u8>,
    entries: Vec<String>,
}

impl ArchiveBundle {
    /// Download file name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Entry names in archive order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Assign an archive entry name to every upload, in upload order
pub fn plan_entry_names(
    files: &[UploadedFile],
    policy: DuplicatePolicy,
) -> Result<Vec<String>, ArchiveError> {
    let mut used = HashSet::new();
    let mut names = Vec::with_capacity(files.len());

    for file in files {
        let base = format!("{}{}", ENTRY_PREFIX, sanitize_filename(file.name()));

        let name = if used.contains(&base) {
            match policy {
                DuplicatePolicy::Fail => return Err(ArchiveError::DuplicateEntry(base)),
                DuplicatePolicy::Rename => {
                    let renamed = (2..)
                        .map(|n| numbered(&base, n))
                        .find(|candidate| !used.contains(candidate))
                        .unwrap_or_else(|| base.clone());
                    debug!("Renamed duplicate entry {} to {}", base, renamed);
                    renamed
                }
            }
        } else {
            base
        };

        used.insert(name.clone());
        names.push(name);
    }

    Ok(names)
}

/// `enhanced_a.wav` -> `enhanced_a (n).wav`
fn numbered(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}

/// Builds the zip bundle for a batch
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    archive_name: String,
}

impl ArchiveBuilder {
    pub fn new(archive_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
        }
    }

    /// One deflated entry per result, in the given order.
    ///
    /// Timestamps and permissions are fixed so identical inputs produce
    /// identical bytes.
    pub fn build(&self, results: &[EnhancementResult]) -> Result<ArchiveBundle, ArchiveError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = Vec::with_capacity(results.len());

        for result in results {
            writer.start_file(result.entry_name.as_str(), options)?;
            writer.write_all(&result.encoded)?;
            entries.push(result.entry_name.clone());
        }

        let bytes = writer.finish()?.into_inner();
        info!(
            "Built {} with {} entries ({} bytes)",
            self.archive_name,
            entries.len(),
            bytes.len()
        );

        Ok(ArchiveBundle {
            name: self.archive_name.clone(),
            bytes,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioclean_enhance::Waveform;
    use std::io::Read;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile::new(name, Vec::new())
    }

    fn result(name: &str, payload: &[u8]) -> EnhancementResult {
        EnhancementResult {
            name: name.to_string(),
            entry_name: format!("{}{}", ENTRY_PREFIX, name),
            waveform: Waveform::new(vec![vec![0.0; 4]], 8000).unwrap(),
            sample_rate: 8000,
            encoded: payload.to_vec(),
        }
    }

    #[test]
    fn test_entry_names_prefixed() {
        let names = plan_entry_names(
            &[upload("a.wav"), upload("b.mp3")],
            DuplicatePolicy::Rename,
        )
        .unwrap();
        assert_eq!(names, vec!["enhanced_a.wav", "enhanced_b.mp3"]);
    }

    #[test]
    fn test_duplicates_renamed() {
        let names = plan_entry_names(
            &[
                upload("a.wav"),
                upload("dir/a.wav"),
                upload("a (2).wav"),
                upload("a.wav"),
                upload("noext"),
                upload("noext"),
            ],
            DuplicatePolicy::Rename,
        )
        .unwrap();

        assert_eq!(
            names,
            vec![
                "enhanced_a.wav",
                "enhanced_a (2).wav",
                // Literal name collides with the rename above
                "enhanced_a (2) (2).wav",
                "enhanced_a (3).wav",
                "enhanced_noext",
                "enhanced_noext (2)",
            ]
        );
    }

    #[test]
    fn test_duplicates_fail() {
        let err = plan_entry_names(&[upload("a.wav"), upload("a.wav")], DuplicatePolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateEntry(ref n) if n == "enhanced_a.wav"));
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bundle = ArchiveBuilder::new("enhanced_audio.zip").build(&[]).unwrap();
        assert!(bundle.is_empty());

        let archive = zip::ZipArchive::new(Cursor::new(bundle.bytes())).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_entries_in_order_with_content() {
        let results = vec![result("b.wav", b"second"), result("a.wav", b"first")];
        let bundle = ArchiveBuilder::new("out.zip").build(&results).unwrap();
        assert_eq!(bundle.entries(), ["enhanced_b.wav", "enhanced_a.wav"]);

        let mut archive = zip::ZipArchive::new(Cursor::new(bundle.bytes())).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "enhanced_b.wav");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"second");
    }

    #[test]
    fn test_deterministic_bytes() {
        let results = vec![result("a.wav", &[7u8; 1024]), result("b.wav", &[9u8; 512])];
        let builder = ArchiveBuilder::new("out.zip");

        assert_eq!(builder.build(&results).unwrap(), builder.build(&results).unwrap());
    }
}
