//! Decoding configuration.

use crate::error::{MimoError, Result};
use crate::vocab::SpecialTokens;
use serde::{Deserialize, Serialize};

/// Configuration for beam search generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of slots tracked per instance.
    pub beam_size: usize,
    /// Number of hypotheses returned per instance.
    pub n_best: usize,
    /// Special token ids used by the decoders.
    #[serde(default)]
    pub special_tokens: SpecialTokens,
}

impl GenerationConfig {
    /// Create a config with default special tokens.
    pub fn new(beam_size: usize, n_best: usize) -> Self {
        Self {
            beam_size,
            n_best,
            special_tokens: SpecialTokens::default(),
        }
    }

    /// Use different special token ids.
    pub fn with_special_tokens(mut self, special_tokens: SpecialTokens) -> Self {
        self.special_tokens = special_tokens;
        self
    }

    /// Check the config can drive a decode.
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(MimoError::InvalidConfig("beam_size must be at least 1".to_string()));
        }
        if self.n_best == 0 {
            return Err(MimoError::InvalidConfig("n_best must be at least 1".to_string()));
        }
        if self.n_best > self.beam_size {
            return Err(MimoError::InvalidConfig(format!(
                "n_best ({}) cannot exceed beam_size ({})",
                self.n_best, self.beam_size
            )));
        }
        Ok(())
    }

    /// Load from JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(5, 1)
    }
}
