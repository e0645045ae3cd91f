//! Shared encoder with one decoder per relation target.

use super::{Encoder, TargetDecoder, TargetDecoders};
use candle_core::Device;

/// A multi-decoder sequence-to-sequence model.
pub struct MimoModel {
    encoder: Box<dyn Encoder>,
    decoders: TargetDecoders,
    device: Device,
}

impl MimoModel {
    /// Create a model from its parts.
    pub fn new(encoder: Box<dyn Encoder>, decoders: TargetDecoders, device: Device) -> Self {
        Self {
            encoder,
            decoders,
            device,
        }
    }

    /// Add or replace a target decoder.
    pub fn add_target(&mut self, name: impl Into<String>, decoder: TargetDecoder) {
        self.decoders.insert(name, decoder);
    }

    /// Shared encoder.
    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    /// Target decoders.
    pub fn decoders(&self) -> &TargetDecoders {
        &self.decoders
    }

    /// Device for computation.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl std::fmt::Debug for MimoModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimoModel")
            .field("targets", &self.decoders.names().collect::<Vec<_>>())
            .field("device", &self.device)
            .finish()
    }
}
