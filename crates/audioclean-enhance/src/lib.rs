//! Noise-suppression model bridge for audioclean
//!
//! This crate wraps the denoising model behind a stable signature:
//! - [`Waveform`]: planar PCM buffer passed between pipeline stages
//! - [`Enhancer`]: waveform in, waveform of identical shape out
//! - [`ModelHandle`]: lazily loaded, shared model with serialized inference
//! - [`Rnnoise`]: RNNoise implementation via nnnoiseless

mod error;
mod rnnoise;
mod waveform;

pub use error::{EnhanceError, ModelInitError, WaveformError};
pub use rnnoise::{Rnnoise, RNNOISE_SAMPLE_RATE};
pub use waveform::Waveform;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A noise-suppression model.
///
/// Implementations must return a waveform with the same channel count and
/// frame count as the input.
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &'static str;

    /// The only sample rate `enhance` accepts
    fn sample_rate(&self) -> u32;

    fn enhance(&self, input: &Waveform) -> Result<Waveform, EnhanceError>;
}

/// Model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Blend between original (0.0) and fully denoised (1.0)
    pub strength: f32,
    /// Custom RNNoise weights (built-in weights if not set)
    pub weights: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strength: 1.0,
            weights: None,
        }
    }
}

type Loader = dyn Fn() -> Result<Arc<dyn Enhancer>, ModelInitError> + Send + Sync;

/// Shared model resource.
///
/// Constructed once and injected into every batch run. The model itself is
/// loaded on the first [`ModelHandle::acquire`] and kept until the handle is
/// dropped. A failed load leaves the handle empty so a later call retries.
pub struct ModelHandle {
    loader: Arc<Loader>,
    loaded: OnceCell<LoadedModel>,
}

impl ModelHandle {
    /// RNNoise with the given settings
    pub fn new(config: ModelConfig) -> Self {
        Self::with_loader(move || {
            let model = match &config.weights {
                Some(path) => Rnnoise::from_weights(path, config.strength)?,
                None => Rnnoise::new(config.strength)?,
            };
            Ok(Arc::new(model) as Arc<dyn Enhancer>)
        })
    }

    /// Custom model constructor
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Enhancer>, ModelInitError> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            loaded: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Get the loaded model, loading it on first use
    pub async fn acquire(&self) -> Result<LoadedModel, ModelInitError> {
        let loaded = self
            .loaded
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let enhancer = tokio::task::spawn_blocking(move || (*loader)())
                    .await
                    .map_err(|e| ModelInitError::Loader(e.to_string()))??;

                info!("Loaded {} model ({}Hz)", enhancer.name(), enhancer.sample_rate());
                Ok::<_, ModelInitError>(LoadedModel {
                    enhancer,
                    gate: Arc::new(Mutex::new(())),
                })
            })
            .await?;

        Ok(loaded.clone())
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// A loaded model. Clones share the model and its inference gate.
#[derive(Clone)]
pub struct LoadedModel {
    enhancer: Arc<dyn Enhancer>,
    gate: Arc<Mutex<()>>,
}

impl LoadedModel {
    pub fn name(&self) -> &'static str {
        self.enhancer.name()
    }

    pub fn sample_rate(&self) -> u32 {
        self.enhancer.sample_rate()
    }

    /// Run inference. Concurrent callers are serialized.
    pub fn enhance(&self, input: &Waveform) -> Result<Waveform, EnhanceError> {
        if input.is_empty() {
            return Err(EnhanceError::InvalidAudio("waveform has zero length".to_string()));
        }

        // The gate guards no data, so a poisoned lock is still usable
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());

        debug!(
            "Enhancing with {}: {} frames @ {}Hz",
            self.name(),
            input.frames(),
            input.sample_rate()
        );

        let output = self.enhancer.enhance(input)?;
        if output.channel_count() != input.channel_count() || output.frames() != input.frames() {
            return Err(EnhanceError::Inference(format!(
                "{} changed the waveform shape ({}x{} -> {}x{})",
                self.name(),
                input.channel_count(),
                input.frames(),
                output.channel_count(),
                output.frames()
            )));
        }

        Ok(output)
    }
}
