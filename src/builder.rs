//! Builder for configuring and constructing a `StreamOrchestrator`.

use crate::{Result, StreamOrchestrator};
use morphstream_core::{MorphParams, StreamConfig};
use morphstream_neural::{BackendFactory, InferenceWorker};
use std::sync::Arc;

/// Validates the configuration, starts the inference worker (backend
/// construction, shape check and warm-up happen before `build` returns),
/// and pre-fills the output latency.
///
/// # Example
///
/// ```ignore
/// use morphstream::prelude::*;
///
/// let params = Arc::new(MorphParams::new());
/// let stream = StreamOrchestrator::builder()
///     .config(StreamConfig::load("morph.toml")?)
///     .params(params.clone())
///     .backend(my_onnx_factory())
///     .build()?;
/// ```
#[derive(Default)]
pub struct StreamOrchestratorBuilder {
    config: StreamConfig,
    params: Option<Arc<MorphParams>>,
    backend_factory: Option<BackendFactory>,
}

impl StreamOrchestratorBuilder {
    /// Default: [`StreamConfig::default`]
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing control block. Default: a fresh [`MorphParams`].
    pub fn params(mut self, params: Arc<MorphParams>) -> Self {
        self.params = Some(params);
        self
    }

    /// Required.
    pub fn backend(mut self, factory: BackendFactory) -> Self {
        self.backend_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<StreamOrchestrator> {
        let backend_factory = self.backend_factory.ok_or_else(|| {
            morphstream_core::Error::InvalidConfig(
                "No inference backend configured. Use .backend() to set one.".to_string(),
            )
        })?;
        self.config.validate()?;

        let worker = InferenceWorker::start(&self.config, backend_factory)?;
        let params = self.params.unwrap_or_default();

        tracing::info!(
            "Morph stream ready (window: {}, reported latency: {} samples)",
            self.config.window_len(),
            self.config.reported_latency()
        );
        Ok(StreamOrchestrator::new(self.config, params, worker))
    }
}
