//! Error types for audioclean-core

use crate::session::Stage;
use audioclean_enhance::ModelInitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanError>;

/// Batch-fatal errors. Anything here aborts the whole run.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Model initialization failed: {0}")]
    ModelInit(#[from] ModelInitError),

    #[error("Archive assembly failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Per-file errors. Recorded against the file; the batch continues.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{file}: invalid audio: {reason}")]
    InvalidAudio { file: String, reason: String },

    #[error("{file}: model failure: {reason}")]
    ModelFailure { file: String, reason: String },

    #[error("{file}: encode failed: {source}")]
    Encode {
        file: String,
        #[source]
        source: EncodeError,
    },
}

impl FileError {
    /// Pipeline stage the error was raised in
    pub fn stage(&self) -> Stage {
        match self {
            FileError::Decode(_) => Stage::Decoding,
            FileError::InvalidAudio { .. } | FileError::ModelFailure { .. } => Stage::Enhancing,
            FileError::Encode { .. } => Stage::Encoding,
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{file}: unsupported audio format")]
    UnsupportedFormat { file: String },

    #[error("{file}: malformed {format} data: {reason}")]
    Malformed {
        file: String,
        format: &'static str,
        reason: String,
    },

    #[error("{file}: no audio track found")]
    NoAudioTrack { file: String },

    #[error("{file}: resampling failed: {reason}")]
    Resample { file: String, reason: String },
}

impl DecodeError {
    /// Name of the offending file
    pub fn file(&self) -> &str {
        match self {
            DecodeError::UnsupportedFormat { file }
            | DecodeError::Malformed { file, .. }
            | DecodeError::NoAudioTrack { file }
            | DecodeError::Resample { file, .. } => file,
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Waveform is empty")]
    EmptyBuffer,

    #[error("Waveform has {found} channels, source had {expected}")]
    ChannelMismatch { expected: u16, found: u16 },

    #[error("Resampling back to {rate}Hz failed: {reason}")]
    Resample { rate: u32, reason: String },

    #[error("WAV serialization failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("Encoder fault: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
