//! audioclean-core: batch decode, noise suppression, re-encode and archive pipeline

pub mod archive;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod resample;
pub mod session;
pub mod upload;

pub use archive::ArchiveBundle;
pub use config::Config;
pub use error::{CleanError, FileError, Result};
pub use pipeline::{BatchEvent, Pipeline, PipelineConfig, Progress};
pub use session::{BatchOutput, BatchSession, FileState, FileStatus};
pub use upload::UploadedFile;

pub use audioclean_enhance::{ModelConfig, ModelHandle, Waveform};
