use audioclean_core::config::DuplicatePolicy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audioclean")]
#[command(author, version, about = "Batch noise suppression with zip export")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Audio files to clean (shorthand for `enhance <FILES>...`)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub options: EnhanceOptions,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Denoise a batch of files and bundle the results into a zip archive
    Enhance {
        /// Input audio files (WAV, MP3, FLAC, Ogg Vorbis)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        options: EnhanceOptions,
    },

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct EnhanceOptions {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suppression strength in [0, 1]
    #[arg(short, long)]
    pub strength: Option<f32>,

    /// Custom RNNoise weights file
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// How to handle two inputs with the same name
    #[arg(long, value_enum)]
    pub on_duplicate: Option<OnDuplicate>,

    /// Also write each enhanced file next to the archive
    #[arg(long)]
    pub split: bool,

    /// Keep the scratch directory (for debugging)
    #[arg(long)]
    pub keep_temp: bool,

    /// Print the batch result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDuplicate {
    /// Number repeated names: "a.wav", "a (2).wav"
    Rename,
    /// Refuse the batch
    Fail,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(value: OnDuplicate) -> Self {
        match value {
            OnDuplicate::Rename => DuplicatePolicy::Rename,
            OnDuplicate::Fail => DuplicatePolicy::Fail,
        }
    }
}
