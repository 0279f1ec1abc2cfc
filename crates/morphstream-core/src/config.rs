//! Stream configuration: window shapes, ring sizing, latency reservation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Window and buffer sizing for one morph stream.
///
/// Every buffer the stream uses is allocated from these values once, when the
/// stream is built. Defaults match a 16k-sample model window at 44.1/48 kHz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// New samples consumed per inference cycle.
    pub input_samples: usize,
    /// Previously seen samples re-supplied each cycle as model context.
    pub cache_samples: usize,
    /// Crossfade length at the head of each worker output.
    pub overlap_samples: usize,
    /// Leading worker output samples discarded as warm-up artifact.
    pub drop_head_samples: usize,
    /// Capacity of each ring buffer. Must be a power of two.
    pub ring_capacity: usize,
    /// Silence pre-filled into the output ring at stream start.
    pub output_delay_samples: usize,
    /// Subtracted from `output_delay_samples` when reporting latency.
    pub latency_bias_samples: usize,
    /// Largest host block the stream accepts.
    pub max_block_size: usize,
    /// Zeroed inference calls run before the stream goes live.
    pub warmup_iterations: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            input_samples: 8192,
            cache_samples: 8192,
            overlap_samples: 1024,
            drop_head_samples: 3072,
            ring_capacity: 65536,
            output_delay_samples: 16384 + 8192,
            latency_bias_samples: 4096,
            max_block_size: 4096,
            warmup_iterations: 3,
        }
    }
}

impl StreamConfig {
    /// Samples per inference window (`input + cache`).
    #[inline]
    pub fn window_len(&self) -> usize {
        self.input_samples + self.cache_samples
    }

    /// Latency declared to the host.
    #[inline]
    pub fn reported_latency(&self) -> usize {
        self.output_delay_samples
            .saturating_sub(self.latency_bias_samples)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_samples == 0 || self.overlap_samples == 0 || self.max_block_size == 0 {
            return Err(Error::InvalidConfig(
                "input_samples, overlap_samples and max_block_size must be non-zero".into(),
            ));
        }
        if !self.ring_capacity.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "ring_capacity {} is not a power of two",
                self.ring_capacity
            )));
        }

        let spliced = self.drop_head_samples + self.overlap_samples + self.input_samples;
        if spliced > self.window_len() {
            return Err(Error::InvalidConfig(format!(
                "drop_head ({}) + overlap ({}) + input ({}) exceeds window length {}",
                self.drop_head_samples,
                self.overlap_samples,
                self.input_samples,
                self.window_len()
            )));
        }
        if self.overlap_samples > self.output_delay_samples {
            return Err(Error::InvalidConfig(format!(
                "overlap_samples {} exceeds output_delay_samples {}",
                self.overlap_samples, self.output_delay_samples
            )));
        }
        if self.latency_bias_samples > self.output_delay_samples {
            return Err(Error::InvalidConfig(format!(
                "latency_bias_samples {} exceeds output_delay_samples {}",
                self.latency_bias_samples, self.output_delay_samples
            )));
        }

        let input_need = self.window_len() + self.max_block_size;
        let output_need = self.output_delay_samples + self.input_samples + self.max_block_size;
        let need = input_need.max(output_need);
        if self.ring_capacity < need {
            return Err(Error::InvalidConfig(format!(
                "ring_capacity {} too small (need at least {})",
                self.ring_capacity, need
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
