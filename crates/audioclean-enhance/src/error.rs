//! Error types for the enhancement bridge

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaveformError {
    #[error("Waveform has no channels")]
    NoChannels,

    #[error("Channel {channel} has {found} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },

    #[error("Interleaved buffer of {len} samples does not divide into {channels} channels")]
    Interleave { len: usize, channels: u16 },

    #[error("Sample rate must be positive")]
    ZeroSampleRate,
}

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Model inference failed: {0}")]
    Inference(String),
}

#[derive(Error, Debug)]
pub enum ModelInitError {
    #[error("Model weights not found: {}", .0.display())]
    WeightsNotFound(PathBuf),

    #[error("Model weights in {} could not be parsed", .0.display())]
    InvalidWeights(PathBuf),

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Model loader failed: {0}")]
    Loader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
