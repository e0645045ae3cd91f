//! High-level relation generator.

use anyhow::{Context, Result};
use candle_core::Device;
use mimo_core::{
    generation::{DecodeResults, GenerationConfig, GenerationModel},
    model::{batch_tensors, MimoModel},
    vocab::{SpecialTokens, Vocabulary},
};
use std::path::PathBuf;

/// Builder for creating a [`Generator`].
#[derive(Debug, Default)]
pub struct GeneratorBuilder {
    config: Option<GenerationConfig>,
    config_file: Option<PathBuf>,
    beam_size: Option<usize>,
    n_best: Option<usize>,
    special_tokens: Option<SpecialTokens>,
}

impl GeneratorBuilder {
    /// Create a new generator builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit config.
    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the base config from a JSON file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set beam width.
    pub fn beam_size(mut self, size: usize) -> Self {
        self.beam_size = Some(size);
        self
    }

    /// Set number of hypotheses returned per instance.
    pub fn n_best(mut self, n: usize) -> Self {
        self.n_best = Some(n);
        self
    }

    /// Set special token ids.
    pub fn special_tokens(mut self, special_tokens: SpecialTokens) -> Self {
        self.special_tokens = Some(special_tokens);
        self
    }

    /// Build the generator around a model.
    ///
    /// Explicit setters override values from [`config_file`](Self::config_file),
    /// which overrides [`config`](Self::config).
    pub fn build(self, model: MimoModel) -> Result<Generator> {
        let mut config = match &self.config_file {
            Some(path) => GenerationConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => self.config.unwrap_or_default(),
        };
        if let Some(beam_size) = self.beam_size {
            config.beam_size = beam_size;
        }
        if let Some(n_best) = self.n_best {
            config.n_best = n_best;
        }
        if let Some(special_tokens) = self.special_tokens {
            config.special_tokens = special_tokens;
        }

        tracing::info!(
            beam_size = config.beam_size,
            n_best = config.n_best,
            targets = model.decoders().len(),
            "generator ready"
        );
        let inner = GenerationModel::new(model, config)?;
        Ok(Generator { inner })
    }
}

/// Generates every relation target for batches of encoded sources.
#[derive(Debug)]
pub struct Generator {
    inner: GenerationModel,
}

impl Generator {
    /// Create a new generator builder.
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::new()
    }

    /// Generation config.
    pub fn config(&self) -> &GenerationConfig {
        self.inner.config()
    }

    /// Underlying decoding driver.
    pub fn generation_model(&self) -> &GenerationModel {
        &self.inner
    }

    fn device(&self) -> &Device {
        self.inner.model().device()
    }

    /// Decode a batch of encoded sources (each wrapped with BOS/EOS).
    pub fn generate(&self, sources: &[Vec<u32>]) -> Result<DecodeResults> {
        self.run(sources, None)
    }

    /// Decode with a forced first token per source.
    pub fn generate_with_inits(&self, sources: &[Vec<u32>], inits: &[u32]) -> Result<DecodeResults> {
        self.run(sources, Some(inits))
    }

    fn run(&self, sources: &[Vec<u32>], inits: Option<&[u32]>) -> Result<DecodeResults> {
        let pad = self.config().special_tokens.pad;
        let (src_seq, src_pos) = batch_tensors(sources, pad, self.device())?;
        Ok(self.inner.translate_batch(&src_seq, &src_pos, inits)?)
    }
}

/// One target's best hypotheses rendered as words.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTarget {
    /// Target name.
    pub target: String,
    /// Per instance, per hypothesis: words up to (not including) EOS, and score.
    pub instances: Vec<Vec<(Vec<String>, f32)>>,
}

/// Map decoded ids back to words, dropping EOS and anything after it.
pub fn render(results: &DecodeResults, vocab: &Vocabulary) -> Vec<RenderedTarget> {
    let eos = vocab.specials().eos;
    results
        .iter()
        .map(|(target, outcome)| RenderedTarget {
            target: target.to_string(),
            instances: outcome
                .hypotheses
                .iter()
                .map(|hyps| {
                    hyps.iter()
                        .map(|hyp| {
                            let end = hyp.tokens.iter().position(|&t| t == eos).unwrap_or(hyp.tokens.len());
                            let words = vocab
                                .decode(&hyp.tokens[..end])
                                .into_iter()
                                .map(String::from)
                                .collect();
                            (words, hyp.score)
                        })
                        .collect()
                })
                .collect(),
        })
        .collect()
}
